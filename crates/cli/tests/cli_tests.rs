//! Runs the `xmlconf` binary against the vacuumd fixtures

use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn xsd_fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../xsd/tests/fixtures")
        .join(name)
}

fn xmlconf() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_xmlconf"));
    command
        .env_remove("XMLCONF_CONFIG")
        .env_remove("XMLCONF_SCHEMA_DIR")
        .env_remove("RUST_LOG");
    command
}

fn ad_hoc(command: &mut Command) -> &mut Command {
    command
        .arg("--schema")
        .arg(xsd_fixture("vacuumd-configuration.xsd"))
        .args(["--root", "VacuumdConfiguration"])
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "xmlconf failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn run_with_stdin(command: &mut Command, input: &str) -> Output {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_to_json_ad_hoc_kind() {
    let output = ad_hoc(xmlconf().arg("to-json"))
        .args(["--value-name", "statement=sql"])
        .arg(xsd_fixture("vacuumd-configuration.xml"))
        .output()
        .unwrap();

    let json: Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(json["period"], 86400000);
    assert_eq!(
        json["statement"][1]["sql"],
        "DELETE FROM ipInterface WHERE ipInterface.isManaged = 'D';"
    );
    assert!(json["statement"][1].get("__VALUE__").is_none());
}

#[test]
fn test_round_trip_through_stdin() {
    let output = ad_hoc(xmlconf().arg("to-json"))
        .arg("--pretty")
        .arg(xsd_fixture("vacuumd-configuration.xml"))
        .output()
        .unwrap();
    let json = stdout(&output);
    assert!(json.starts_with("{\n"), "{json}");

    let output = run_with_stdin(ad_hoc(xmlconf().arg("to-xml")), &json);
    let xml = stdout(&output);
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
    assert!(xml.contains(r#"<VacuumdConfiguration xmlns="http://xmlns.opennms.org/xsd/config/vacuumd" period="86400000">"#), "{xml}");
}

#[test]
fn test_kind_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("settings.toml");
    std::fs::write(
        &settings,
        r#"
[[kinds]]
name = "vacuumd"
schema = "vacuumd-configuration.xsd"
root_element = "VacuumdConfiguration"
"#,
    )
    .unwrap();
    let schema_dir = xsd_fixture("");

    let output = xmlconf()
        .arg("inspect")
        .args(["--kind", "vacuumd"])
        .arg("--config")
        .arg(&settings)
        .arg("--schema-dir")
        .arg(&schema_dir)
        .output()
        .unwrap();
    let text = stdout(&output);
    assert!(text.starts_with("namespace: http://xmlns.opennms.org/xsd/config/vacuumd\n"), "{text}");
    assert!(text.contains("org.opennms.xmlns.xsd.config.vacuumd.Statement [text: string]"), "{text}");

    let output = xmlconf()
        .args(["inspect", "--kind", "poller"])
        .env("XMLCONF_CONFIG", &settings)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown kind 'poller'"));
}

#[test]
fn test_conversion_error_exits_with_failure() {
    let output = run_with_stdin(
        ad_hoc(xmlconf().arg("to-json")),
        "<poller-configuration/>",
    );
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to convert XML to JSON"), "{stderr}");
    assert!(stderr.contains("poller-configuration"), "{stderr}");
}

#[test]
fn test_kind_selection_is_required() {
    let output = xmlconf().args(["to-json"]).output().unwrap();
    assert!(!output.status.success());
}
