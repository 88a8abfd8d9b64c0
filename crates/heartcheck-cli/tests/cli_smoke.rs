//! Smoke tests for the compiled `heartcheck` binary.
//!
//! Every run points `HEARTCHECK_CONFIG` at a scratch config whose data source
//! is a local CSV, so no test touches the network.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const HEADER: &str = "age,anaemia,creatinine_phosphokinase,diabetes,ejection_fraction,high_blood_pressure,platelets,serum_creatinine,serum_sodium,sex,smoking,time,DEATH_EVENT";

fn cmd() -> Command {
    Command::cargo_bin("heartcheck").unwrap()
}

/// Deterministic heart-failure-shaped rows; deaths cluster at low ejection
/// fraction and short follow-up time, with a few flipped labels.
fn write_records(dir: &Path, n_rows: usize) -> String {
    let mut body = String::from(HEADER);
    body.push('\n');
    for i in 0..n_rows {
        let age = 40 + (i * 7) % 55;
        let ejection_fraction = 15 + (i * 13) % 60;
        let time = 5 + (i * 29) % 280;
        let serum_creatinine = 0.6 + ((i * 3) % 30) as f64 / 10.0;
        let mut death = ejection_fraction < 35 || time < 60;
        if i % 11 == 0 {
            death = !death;
        }
        body.push_str(&format!(
            "{},{},{},{},{},{},{},{:.1},{},{},{},{},{}\n",
            age,
            i % 2,
            100 + (i * 37) % 3000,
            (i / 2) % 2,
            ejection_fraction,
            (i / 3) % 2,
            150000 + (i * 1231) % 300000,
            serum_creatinine,
            125 + i % 20,
            (i / 5) % 2,
            (i / 7) % 2,
            time,
            u8::from(death)
        ));
    }
    let path = dir.join("records.csv");
    fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

fn write_config(dir: &Path, data_url: &str) -> std::path::PathBuf {
    let config = serde_json::json!({
        "data_url": data_url,
        "seed": 11,
        "output_dir": dir.join("outputs"),
        "runs_dir": dir.join("runs"),
    });
    let path = dir.join("train.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn help_lists_hyperparameters() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--C"))
        .stdout(predicate::str::contains("--max_iter"))
        .stdout(predicate::str::contains("HEARTCHECK_CONFIG"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("heartcheck"));
}

#[test]
fn zero_c_is_rejected_by_the_parser() {
    cmd()
        .args(["--C", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--C"));
}

#[test]
fn non_integer_max_iter_is_rejected() {
    cmd().args(["--max_iter", "ten"]).assert().failure();
}

#[test]
fn trains_and_writes_one_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_records(dir.path(), 299);
    let config = write_config(dir.path(), &data);

    cmd()
        .env("HEARTCHECK_CONFIG", &config)
        .args(["--C", "1.0", "--max_iter", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Accuracy\""))
        .stdout(predicate::str::contains("\"n_test\": 60"))
        .stdout(predicate::str::contains("\"n_train\": 239"));

    let outputs: Vec<_> = fs::read_dir(dir.path().join("outputs")).unwrap().collect();
    assert_eq!(outputs.len(), 1);
    assert!(dir.path().join("outputs").join("model.json").exists());

    let runs: Vec<_> = fs::read_dir(dir.path().join("runs")).unwrap().collect();
    assert_eq!(runs.len(), 1);
    let run_dir = runs[0].as_ref().unwrap().path();
    assert!(run_dir.join("metrics.json").exists());
    assert!(run_dir.join("report.html").exists());
}

#[test]
fn missing_label_exits_non_zero_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("no_label.csv");
    fs::write(&data, "age,time\n50,10\n60,20\n70,30\n").unwrap();
    let config = write_config(dir.path(), &data.to_string_lossy());

    cmd()
        .env("HEARTCHECK_CONFIG", &config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("DEATH_EVENT"));

    assert!(!dir.path().join("outputs").exists());
}

#[test]
fn unreadable_config_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .env("HEARTCHECK_CONFIG", dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}
