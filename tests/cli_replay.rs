use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_signspeak"));
    command.env("RUST_LOG", "off");
    command
}

fn fixture_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn stdout_events(stdout: Vec<u8>) -> Vec<Value> {
    String::from_utf8(stdout)
        .expect("stdout UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("replay event JSON"))
        .collect()
}

#[test]
fn replay_confirms_hello_then_i() {
    let output = cli()
        .args(["replay", "--input", &fixture_file("hello_i.lines")])
        .output()
        .expect("failed to run signspeak replay");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let events = stdout_events(output.stdout);
    assert_eq!(events.len(), 2, "events: {events:?}");
    assert_eq!(events[0]["gesture_label"], "HELLO");
    assert_eq!(events[0]["sentence_text"], "Hello, I am Yash.");
    assert_eq!(events[0]["line"], 6);
    assert_eq!(events[0]["epoch"], 1);
    assert_eq!(events[1]["gesture_label"], "I");
    assert_eq!(events[1]["epoch"], 2);

    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    let summary: Value = serde_json::from_str(stderr.trim()).expect("summary JSON");
    assert_eq!(summary["lines"], 13);
    assert_eq!(summary["accepted"], 12);
    assert_eq!(summary["rejected"], 1);
    assert_eq!(summary["confirmations"], 2);
}

#[test]
fn replay_detects_expectation_mismatch() {
    let output = cli()
        .args([
            "replay",
            "--input",
            &fixture_file("hello_i.lines"),
            "--expect",
            "HELLO,WE",
        ])
        .output()
        .expect("failed to run mismatch replay");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("\"expected\""),
        "expected diff JSON in stderr, got {stderr}"
    );
}

#[test]
fn replay_uses_configured_language() {
    let output = cli()
        .args([
            "--config",
            &fixture_file("hindi.json"),
            "replay",
            "--input",
            &fixture_file("hello_i.lines"),
            "--expect",
            "HELLO,I",
        ])
        .output()
        .expect("failed to run replay with config");
    assert!(output.status.success());

    let events = stdout_events(output.stdout);
    assert_eq!(events[0]["language"], "hi");
    assert_eq!(events[0]["sentence_text"], "नमस्ते, मैं यश हूँ।");
    // No Hindi sentence for I: the raw label is spoken
    assert_eq!(events[1]["sentence_text"], "I");
}

#[test]
fn check_config_prints_effective_config() {
    let output = cli()
        .args(["--config", &fixture_file("hindi.json"), "check-config"])
        .output()
        .expect("failed to run check-config");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    assert_eq!(json["dispatch"]["default_language"], "hi");
    assert_eq!(json["stabilizer"]["stability_threshold"], 3);
    assert_eq!(json["ingest"]["flex_channels"], 5);
}
