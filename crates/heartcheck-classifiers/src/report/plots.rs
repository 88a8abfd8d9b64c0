use plotly::common::{ColorScale, ColorScalePalette};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, HeatMap, Plot};

use crate::metrics::ConfusionMatrix;

/// Heatmap of a binary confusion matrix: true class on the y axis, predicted
/// class on the x axis, darker cells for larger counts.
pub fn plot_confusion_matrix(confusion: &ConfusionMatrix, title: &str) -> Plot {
    let labels = vec!["0".to_string(), "1".to_string()];
    let trace = HeatMap::new(labels.clone(), labels, confusion.as_rows())
        .color_scale(ColorScale::Palette(ColorScalePalette::Blues))
        .reverse_scale(true)
        .name("Confusion matrix");

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Predicted label"))
        .y_axis(Axis::new().title("True label"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Bar chart of the fitted coefficients, one bar per matrix column.
pub fn plot_coefficients(feature_names: &[String], coefficients: &[f64], title: &str) -> Plot {
    let trace = Bar::new(feature_names.to_vec(), coefficients.to_vec()).name("Coefficient");

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Feature"))
        .y_axis(Axis::new().title("Weight"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}
