use std::fs;
use std::path::Path;

use chrono::Local;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const STYLE: &str = "
body { font-family: sans-serif; margin: 2em auto; max-width: 60em; color: #222; }
header { border-bottom: 2px solid #08519c; margin-bottom: 1em; }
section { margin-bottom: 2em; }
table { border-collapse: collapse; }
td, th { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th { background-color: #deebf7; }
.warning { color: #a63603; }
.code-container { background-color: #f5f5f5; padding: 10px; border-radius: 5px; overflow-x: auto; font-family: monospace; white-space: pre-wrap; }
";

/// A titled block of HTML fragments and plots.
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        let div_id = format!("plot-{}-{}", slug(&self.title), self.content.len());
        self.content.push(PreEscaped(plot.to_inline_html(Some(&div_id))));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    div { (block) }
                }
            }
        }
    }
}

/// Standalone HTML page made of `ReportSection`s.
pub struct Report {
    software: String,
    version: String,
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(software: &str, version: &str, title: &str) -> Self {
        Self {
            software: software.to_string(),
            version: version.to_string(),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_JS) {}
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    header {
                        h1 { (self.title) }
                        p { (self.software) " v" (self.version) " | generated " (Local::now().format("%Y-%m-%d %H:%M:%S").to_string()) }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render().into_string())
    }
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_in_order_and_escapes_text() {
        let mut report = Report::new("heartcheck", "0.1.0", "Test <Report>");
        let mut first = ReportSection::new("First");
        first.add_content(html! { p { "a & b" } });
        report.add_section(first);
        report.add_section(ReportSection::new("Second"));

        let page = report.render().into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Test &lt;Report&gt;"));
        assert!(page.contains("a &amp; b"));
        let first_at = page.find("<h2>First</h2>").unwrap();
        let second_at = page.find("<h2>Second</h2>").unwrap();
        assert!(first_at < second_at);
    }

    #[test]
    fn saves_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("report.html");
        Report::new("heartcheck", "0.1.0", "t").save_to_file(&path).unwrap();
        assert!(path.exists());
    }
}
