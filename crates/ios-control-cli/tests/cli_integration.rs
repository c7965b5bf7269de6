use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

const UDID: &str = "00008110-001A0C123456789A";

fn ios_control() -> Command {
    let mut cmd = Command::cargo_bin("ios-control").unwrap();
    cmd.env_remove("IOS_CONTROL_UDID")
        .env_remove("IOS_CONTROL_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn tool(script: &str, name: &str) -> Value {
    json!({ "program": "sh", "args": ["-c", script, name] })
}

fn write_config(dir: &Path, tools: Value) -> std::path::PathBuf {
    let path = dir.join("config.json");
    let config = json!({ "tools": tools, "poll_interval_ms": 10, "wait_timeout_secs": 1 });
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

/// Tools that all point at a binary that does not exist.
fn missing_tools_config(dir: &Path) -> std::path::PathBuf {
    let missing = json!({ "program": "/nonexistent/ios-control-test-tool" });
    write_config(
        dir,
        json!({
            "device_list": missing,
            "device_info": missing,
            "installer": missing,
            "diagnostics": missing,
            "screenshot": missing,
            "automation": missing,
            "fallback_automation": missing,
        }),
    )
}

/// One fake device. The primary automation backend only answers hierarchy
/// dumps; the fallback records its arguments to `fallback.log` and succeeds.
fn fake_device_config(dir: &Path) -> std::path::PathBuf {
    let screen = dir.join("screen.json");
    std::fs::write(
        &screen,
        r#"{"children": [
            {"label": "Log In", "frame": {"x": 20, "y": 600, "width": 335, "height": 50}}
        ]}"#,
    )
    .unwrap();
    let log = dir.join("fallback.log");

    write_config(
        dir,
        json!({
            "device_list": tool(&format!("echo {}", UDID), "idevice_id"),
            "device_info": tool(
                "case \"$4\" in DeviceName) echo 'Test iPhone';; ProductVersion) echo 17.0;; \
                 *) echo 'ProductType: iPhone15,4';; esac",
                "ideviceinfo",
            ),
            "installer": tool("exit 0", "ideviceinstaller"),
            "diagnostics": tool("exit 0", "idevicediagnostics"),
            "screenshot": tool("exit 0", "idevicescreenshot"),
            "automation": tool(
                &format!("if [ \"$1\" = ui ]; then cat '{}'; else exit 1; fi", screen.display()),
                "pymobiledevice3",
            ),
            "fallback_automation": tool(&format!("echo \"$@\" >> '{}'", log.display()), "tidevice"),
        }),
    )
}

fn fallback_log(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("fallback.log")).unwrap_or_default()
}

#[test]
fn test_help_exits_zero() {
    ios_control()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ios-control"));
}

#[test]
fn test_unknown_subcommand_fails() {
    ios_control()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    ios_control()
        .args(["--config", dir.path().join("absent.json").to_str().unwrap(), "devices"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn test_devices_without_tools_reports_none() {
    let dir = TempDir::new().unwrap();
    let config = missing_tools_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "devices"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No iOS devices found"));
}

#[test]
fn test_tap_without_device_fails() {
    let dir = TempDir::new().unwrap();
    let config = missing_tools_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "tap", "100", "200"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No iOS device found"));
}

#[cfg(unix)]
#[test]
fn test_devices_lists_fake_device() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 device(s):"))
        .stdout(predicate::str::contains("Test iPhone"))
        .stdout(predicate::str::contains(UDID));
}

#[cfg(unix)]
#[test]
fn test_devices_json() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    let assert = ios_control()
        .args(["--config", config.to_str().unwrap(), "--format", "json", "devices"])
        .assert()
        .success();

    let devices: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(devices[0]["udid"], UDID);
    assert_eq!(devices[0]["ios_version"], "17.0");
}

#[cfg(unix)]
#[test]
fn test_tap_falls_back_and_logs_action() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "tap", "100", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tapped at (100, 200)"))
        .stderr(predicate::str::is_match(r"\|tap\|\(100, 200\)\|\d+ms\|").unwrap());

    assert!(fallback_log(dir.path()).contains(&format!("--udid {} tap 100 200", UDID)));
}

#[cfg(unix)]
#[test]
fn test_empty_udid_env_uses_first_device() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .env("IOS_CONTROL_UDID", "")
        .args(["--config", config.to_str().unwrap(), "home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pressed home button"));

    assert!(fallback_log(dir.path()).contains(&format!("--udid {} home", UDID)));
}

#[cfg(unix)]
#[test]
fn test_quiet_suppresses_action_log() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "--quiet", "home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pressed home button"))
        .stderr(predicate::str::contains("|home|").not());
}

#[cfg(unix)]
#[test]
fn test_tap_text_taps_element_center() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "tap-text", "log in"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tapped element with text 'log in' (partial match)"));

    assert!(fallback_log(dir.path()).contains(&format!("--udid {} tap 187 625", UDID)));
}

#[cfg(unix)]
#[test]
fn test_tap_text_exact_miss_fails() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "tap-text", "log in", "--exact"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Element with text 'log in' not found"));
}

#[cfg(unix)]
#[test]
fn test_wait_for_times_out() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "wait-for", "Sign Up", "--timeout", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("did not appear"));
}

#[cfg(unix)]
#[test]
fn test_screen_size_and_json_action() {
    let dir = TempDir::new().unwrap();
    let config = fake_device_config(dir.path());
    ios_control()
        .args(["--config", config.to_str().unwrap(), "screen-size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("390x844"));

    let assert = ios_control()
        .args(["--config", config.to_str().unwrap(), "--format", "json", "swipe", "1", "2", "3", "4"])
        .assert()
        .success();
    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["action"], "swipe");
    assert_eq!(report["message"], "Swiped from (1, 2) to (3, 4) in 0.5s");
}
