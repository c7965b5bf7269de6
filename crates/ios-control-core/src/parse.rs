//! Parsers for the text output of the libimobiledevice tools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator between bundle id and display name in installer listings.
const APP_LINE_DELIMITER: &str = " - ";

/// An installed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub bundle_id: String,
    pub name: String,
}

/// Splits device-discovery output into UDIDs, dropping blank lines.
pub fn parse_udid_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a `key: value` dump. Lines without a colon are ignored, the split
/// happens at the first colon, and later duplicates overwrite earlier ones.
pub fn parse_device_info(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Parses installer listings of the form `<bundle-id> - <app name>`.
pub fn parse_app_list(output: &str) -> Vec<AppInfo> {
    output
        .lines()
        .filter_map(|line| line.split_once(APP_LINE_DELIMITER))
        .map(|(bundle_id, name)| AppInfo {
            bundle_id: bundle_id.trim().to_string(),
            name: name.trim().to_string(),
        })
        .collect()
}
