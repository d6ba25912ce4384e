//! End-to-end tests for the `flashpost` binary.

mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

use common::fixtures::DeckDir;

fn flashpost() -> Command {
    let mut cmd = Command::cargo_bin("flashpost").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("RUST_LOG", "off")
        .env_remove("FLASHPOST_FORMAT")
        .env_remove("PORT");
    cmd
}

fn parse_json(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(text.trim()).unwrap_or_else(|_| panic!("Failed to parse JSON:\n{text}"))
}

#[test]
fn test_version_human() {
    flashpost()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("flashpost "))
        .stdout(predicate::str::contains("target:"));
}

#[test]
fn test_version_json() {
    let output = flashpost().args(["version", "--format=json"]).output().unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_robot_quick_start() {
    let output = flashpost().arg("--robot").output().unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    assert_eq!(json["tool"], "flashpost");
    assert!(json.get("export").is_some());
    assert!(json.get("output_modes").is_some());
}

#[test]
fn test_check_ready_deck() {
    let deck = DeckDir::yaml();
    let output = flashpost()
        .args(["--robot", "--config"])
        .arg(deck.fast_settings())
        .arg("check")
        .arg(deck.deck_path())
        .args(["--type", "pdf"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    assert_eq!(json["ready"], true);
    assert_eq!(json["issues"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_check_empty_deck_fails() {
    let deck = DeckDir::yaml();
    let path = deck.path().join("empty.json");
    fs::write(&path, r#"{"slides": []}"#).unwrap();

    let output = flashpost()
        .args(["--robot", "--config"])
        .arg(deck.fast_settings())
        .arg("check")
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = parse_json(&output.stdout);
    assert_eq!(json["ready"], false);
    assert!(
        json["issues"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i == "No slides to export")
    );
}

#[test]
fn test_export_writes_file() {
    let deck = DeckDir::yaml();
    let out = deck.path().join("out");

    let output = flashpost()
        .args(["--robot", "--config"])
        .arg(deck.fast_settings())
        .arg("export")
        .arg(deck.deck_path())
        .args(["--slide", "2", "--type", "jpeg", "--scale", "1", "--out"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = parse_json(&output.stdout);
    assert_eq!(json["ok"], true);
    assert_eq!(json["slide"], 2);
    assert_eq!(json["format"], "jpeg");
    let filename = json["filename"].as_str().unwrap();
    assert!(filename.starts_with("flashpost_slide_2_"));
    assert!(filename.ends_with(".jpg"));

    let img = image::open(out.join(filename)).unwrap();
    assert_eq!((img.width(), img.height()), (200, 200));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"event\""));
}

#[test]
fn test_export_all_pdf() {
    let deck = DeckDir::yaml();
    let out = deck.path().join("pdfs");

    flashpost()
        .arg("--config")
        .arg(deck.fast_settings())
        .arg("export-all")
        .arg(deck.deck_path())
        .args(["-t", "pdf", "--scale", "1", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(".pdf"));

    let pdfs = fs::read_dir(&out)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|x| x == "pdf")
        })
        .count();
    assert_eq!(pdfs, 3);
}

#[test]
fn test_missing_deck_exits_1() {
    flashpost()
        .args(["export", "/nonexistent/deck.yaml", "--config"])
        .arg(DeckDir::yaml().fast_settings())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Deck file not found"));
}

#[test]
fn test_slide_out_of_range() {
    let deck = DeckDir::yaml();
    let output = flashpost()
        .args(["--robot", "--config"])
        .arg(deck.fast_settings())
        .arg("export")
        .arg(deck.deck_path())
        .args(["--slide", "9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = parse_json(&output.stderr);
    assert_eq!(json["error"], true);
    assert_eq!(json["recoverable"], true);
    assert!(json["message"].as_str().unwrap().contains("Invalid slide 9"));
}

#[test]
fn test_missing_settings_file() {
    let deck = DeckDir::yaml();
    flashpost()
        .args(["check", "--config", "/nonexistent/flashpost.toml"])
        .arg(deck.deck_path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Settings file not found"));
}

#[test]
fn test_completions() {
    flashpost()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flashpost"));
}

#[test]
fn test_no_color_accepts_conventional_values() {
    for value in ["1", "true", "yes", "", "0"] {
        flashpost()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success();
    }
}

#[test]
fn test_export_without_type_uses_png() {
    let deck = DeckDir::yaml();
    let out = deck.path().join("default");
    flashpost()
        .arg("--config")
        .arg(deck.fast_settings())
        .arg("export")
        .arg(deck.deck_path())
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let files: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(files.len(), 1);
    let name = files[0].as_ref().unwrap().file_name();
    assert!(name.to_string_lossy().ends_with(".png"));
}
