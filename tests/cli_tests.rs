//! CLI integration tests
//!
//! These tests run the built binary against the fixture schemas.

#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn xsdc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xsdc"))
}

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_basic() {
    let output = Command::new(xsdc_bin())
        .args(["inspect", &fixture("library.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("xsdc v"), "should show version");
    assert!(stdout.contains("http://example.com/library"), "should show namespace");
    assert!(stdout.contains("Global Elements: 1"), "should show element count");
    assert!(stdout.contains("Global Types: 1"), "should show type count");
}

#[test]
fn test_cli_inspect_json_output() {
    let output = Command::new(xsdc_bin())
        .args(["inspect", "--json", "--imports", &fixture("library.xsd")])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "inspect --json should succeed");
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("output should be valid JSON");

    assert_eq!(json["targetNamespace"], "http://example.com/library");
    assert_eq!(json["elementFormDefault"], "qualified");
    assert_eq!(json["statistics"]["globalElements"], 1);
    assert_eq!(json["imports"][0]["namespace"], "http://example.com/common");
    assert_eq!(json["imports"][0]["resolved"], true);
}

#[test]
fn test_cli_inspect_type() {
    let output = Command::new(xsdc_bin())
        .args(["inspect", "-t", "bookType", &fixture("library.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("(complex)"));
    assert!(stdout.contains("Content: sequence(id, title, isbn)"));
    assert!(stdout.contains("Attribute: lang"));
}

#[test]
fn test_cli_inspect_element_json() {
    let output = Command::new(xsdc_bin())
        .args(["inspect", "--json", "-e", "library", &fixture("library.xsd")])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["localName"], "library");
    assert_eq!(json["namespace"], "http://example.com/library");
    assert_eq!(json["nillable"], false);
}

#[test]
fn test_cli_inspect_unknown_element() {
    let output = Command::new(xsdc_bin())
        .args(["inspect", "-e", "nothing", &fixture("library.xsd")])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Element 'nothing' not found"));
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_cli_check_valid() {
    let output = Command::new(xsdc_bin())
        .args(["check", &fixture("library.xsd"), &fixture("common.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("library.xsd"));
    assert!(stdout.contains("common.xsd"));
}

#[test]
fn test_cli_check_reports_failure() {
    let output = Command::new(xsdc_bin())
        .args(["check", &fixture("common.xsd"), &fixture("broken.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stdout.contains("missing"));
    assert!(stderr.contains("1 of 2 schemas failed"));
}
