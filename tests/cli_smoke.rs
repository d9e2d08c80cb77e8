//! Smoke tests for the smsview binary.

use std::process::Command;

const FIXTURE_PATH: &str = "tests/fixtures/dashboard.json";

fn smsview(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_smsview"))
        .arg(FIXTURE_PATH)
        .arg("--log-stderr")
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("SMSVIEW_PAGE_SIZE")
        .env_remove("SMSVIEW_CONFIG")
        .output()
        .expect("binary runs")
}

#[test]
fn version_flag_prints_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_smsview"))
        .arg("--version")
        .output()
        .expect("binary runs");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn lists_conversations_without_identity() {
    let output = smsview(&[]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Orange"), "pinned sender first: {stdout}");
    assert!(lines[1].contains("MTN"));
}

#[test]
fn prints_requested_pages_of_a_thread() {
    let output = smsview(&["--identity", "MTN", "--page-size", "2", "--pages", "1"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let thread: Vec<&str> = stdout.lines().filter(|l| l.contains("mtn-")).collect();
    assert_eq!(thread.len(), 4);
    assert!(thread[0].contains("mtn-7"));
    assert!(stdout.contains("more messages available"));
}

#[test]
fn zero_page_size_from_env_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_smsview"))
        .arg(FIXTURE_PATH)
        .arg("--log-stderr")
        .env("SMSVIEW_PAGE_SIZE", "0")
        .env_remove("SMSVIEW_CONFIG")
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
}

#[test]
fn missing_fixture_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_smsview"))
        .arg("tests/fixtures/does-not-exist.json")
        .arg("--log-stderr")
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
}

#[test]
fn wave_channel_alias_lists_push_packages() {
    let output = smsview(&["--channel", "wave"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("com.wave.business"), "{stdout}");
}
