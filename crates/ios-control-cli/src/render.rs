//! Human-readable rendering of command results.

use std::collections::BTreeMap;

use ios_control_core::parse::AppInfo;
use ios_control_core::DeviceRecord;

pub fn devices(devices: &[DeviceRecord]) -> String {
    let mut out = format!("Found {} device(s):\n", devices.len());
    for (i, device) in devices.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, device.name));
        out.push_str(&format!("     UDID: {}\n", device.udid));
        out.push_str(&format!("     iOS Version: {}\n", device.ios_version));
    }
    out
}

pub fn device_info(info: &BTreeMap<String, String>) -> String {
    let mut out = String::from("Device Information:\n");
    out.push_str(&"-".repeat(30));
    out.push('\n');
    for (key, value) in info {
        out.push_str(&format!("{}: {}\n", key, value));
    }
    out
}

pub fn apps(apps: &[AppInfo]) -> String {
    let mut out = format!("Found {} installed apps:\n", apps.len());
    for app in apps {
        out.push_str(&format!("  • {} ({})\n", app.name, app.bundle_id));
    }
    out
}

/// `0.5` → `0.5s`, `1.0` → `1.0s`.
pub fn seconds(duration: f64) -> String {
    format!("{:?}s", duration)
}

pub fn match_kind(exact: bool) -> &'static str {
    if exact {
        "exact"
    } else {
        "partial"
    }
}
