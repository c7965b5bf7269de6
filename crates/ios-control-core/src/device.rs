//! The device facade.
//!
//! [`IosDevice`] is an explicit session handle: it holds the requested UDID,
//! the connection flag and the cached [`DeviceRecord`], and routes every
//! operation through its [`CommandRunner`]. Connecting only means "resolved
//! against the discovery list"; the wrapped tools open their own connections
//! per invocation.
//!
//! # Example
//!
//! ```no_run
//! use ios_control_core::device::IosDevice;
//!
//! # fn example() -> ios_control_core::Result<()> {
//! let mut device = IosDevice::new(None);
//! let session = device.session()?; // disconnects when dropped
//! session.tap(100, 200)?;
//! session.tap_by_text("Settings", false)?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{ChainError, ChainOutput, FallbackChain, Gesture};
use crate::config::{ControlConfig, ToolCommand, ToolsConfig};
use crate::error::{ControlError, Result};
use crate::hierarchy::{self, HierarchyDump};
use crate::parse::{self, AppInfo};
use crate::runner::{CommandRunner, RunError, SystemRunner};
use crate::screen::{screen_size_for, DEFAULT_SCREEN_SIZE};

/// Name recorded for a device whose metadata could not be read.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";
/// Version recorded for a device whose metadata could not be read.
pub const UNKNOWN_IOS_VERSION: &str = "Unknown";

/// The start and end of the edge swipe used as a back gesture.
const BACK_GESTURE: (i32, i32, i32, i32) = (10, 300, 200, 300);
const BACK_GESTURE_DURATION: f64 = 0.3;

/// A discovered device. A snapshot taken at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub udid: String,
    pub name: String,
    pub ios_version: String,
}

impl DeviceRecord {
    fn placeholder(udid: String) -> Self {
        Self {
            udid,
            name: UNKNOWN_DEVICE_NAME.to_string(),
            ios_version: UNKNOWN_IOS_VERSION.to_string(),
        }
    }
}

/// Lists attached devices with their name and iOS version.
///
/// Never fails: a missing or failing discovery tool yields an empty list, and
/// a device whose metadata cannot be read is reported with placeholder
/// values instead of being dropped.
pub fn list_devices<R: CommandRunner + ?Sized>(runner: &R, tools: &ToolsConfig) -> Vec<DeviceRecord> {
    let output = match runner.run(&tools.device_list.invocation(Vec::<String>::new())) {
        Ok(stdout) => stdout,
        Err(e) => {
            debug!(error = %e, "device discovery unavailable");
            return Vec::new();
        }
    };

    parse::parse_udid_list(&output)
        .into_iter()
        .map(|udid| {
            let lookup = |key: &str| {
                runner
                    .run(&tools.device_info.invocation(["-u", udid.as_str(), "-k", key]))
                    .map(|value| value.trim().to_string())
            };
            let metadata = lookup("DeviceName")
                .and_then(|name| lookup("ProductVersion").map(|ios_version| (name, ios_version)));
            match metadata {
                Ok((name, ios_version)) => DeviceRecord { udid, name, ios_version },
                Err(e) => {
                    debug!(udid = %udid, error = %e, "metadata lookup failed");
                    DeviceRecord::placeholder(udid)
                }
            }
        })
        .collect()
}

/// A session with one iOS device.
pub struct IosDevice<R: CommandRunner = SystemRunner> {
    udid: Option<String>,
    record: Option<DeviceRecord>,
    connected: bool,
    runner: R,
    config: ControlConfig,
}

impl IosDevice<SystemRunner> {
    /// Creates a session for `udid` (or the first attached device), using
    /// real processes and the configuration in `~/.ios-control/config.json`.
    pub fn new(udid: Option<String>) -> Self {
        Self::with_runner(udid, SystemRunner, ControlConfig::load())
    }

    /// Lists attached devices using real processes and the default tools.
    pub fn list_devices() -> Vec<DeviceRecord> {
        list_devices(&SystemRunner, &ControlConfig::load().tools)
    }
}

impl<R: CommandRunner> IosDevice<R> {
    /// An empty `udid` counts as "not requested".
    pub fn with_runner(udid: Option<String>, runner: R, config: ControlConfig) -> Self {
        Self {
            udid: udid.filter(|u| !u.is_empty()),
            record: None,
            connected: false,
            runner,
            config,
        }
    }

    pub fn udid(&self) -> Option<&str> {
        self.udid.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The record cached by [`Self::connect`].
    pub fn device_record(&self) -> Option<&DeviceRecord> {
        self.record.as_ref()
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolves the target device against the discovery list.
    ///
    /// Picks the requested UDID, or the first discovered device when none was
    /// requested.
    ///
    /// # Errors
    ///
    /// - [`ControlError::DeviceNotFound`] if no devices are attached, or the
    ///   requested UDID is not among them
    pub fn connect(&mut self) -> Result<()> {
        let devices = list_devices(&self.runner, &self.config.tools);
        if devices.is_empty() {
            return Err(ControlError::DeviceNotFound("No iOS devices found".to_string()));
        }

        let record = match &self.udid {
            Some(udid) => devices
                .into_iter()
                .find(|d| &d.udid == udid)
                .ok_or_else(|| ControlError::DeviceNotFound(format!("Device with UDID {} not found", udid)))?,
            None => devices.into_iter().next().ok_or_else(|| {
                ControlError::DeviceNotFound("No iOS devices found".to_string())
            })?,
        };

        info!(udid = %record.udid, name = %record.name, "connected");
        self.udid = Some(record.udid.clone());
        self.record = Some(record);
        self.connected = true;
        Ok(())
    }

    /// Clears the connection flag and cached record. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.connected {
            info!(udid = ?self.udid, "disconnected");
        }
        self.connected = false;
        self.record = None;
    }

    /// Connects and returns a guard that disconnects when dropped.
    pub fn session(&mut self) -> Result<DeviceSession<'_, R>> {
        self.connect()?;
        Ok(DeviceSession { device: self })
    }

    fn require_udid(&self) -> Result<&str> {
        if !self.connected {
            return Err(ControlError::not_connected());
        }
        self.udid.as_deref().ok_or_else(ControlError::not_connected)
    }

    /// Runs a device-bound tool: non-zero exit is a connection error, a
    /// missing binary is unsupported.
    fn run_tool<I, S>(&self, tool: &ToolCommand, args: I, action: &str) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner
            .run(&tool.invocation(args))
            .map_err(|e| match e {
                RunError::NotFound { program } => {
                    ControlError::UnsupportedOperation(format!("{} not installed", program))
                }
                other => ControlError::Connection(format!("Failed to {}: {}", action, other)),
            })
    }

    fn run_gesture(&self, gesture: Gesture, action: String) -> Result<String> {
        let udid = self.require_udid()?;
        let chain = FallbackChain::for_gesture(&self.config.tools, udid, &gesture);
        chain
            .run(&self.runner)
            .map(|out| out.stdout)
            .map_err(|e| match e {
                ChainError::PrimaryMissing { program } => ControlError::UnsupportedOperation(format!(
                    "{} is not available for UI automation",
                    program
                )),
                ChainError::Exhausted { message } => {
                    ControlError::Connection(format!("Failed to {}: {}", action, message))
                }
            })
    }

    /// Full `key: value` dump from the device-info tool.
    pub fn get_device_info(&self) -> Result<BTreeMap<String, String>> {
        let udid = self.require_udid()?;
        let output = self.run_tool(&self.config.tools.device_info, ["-u", udid], "get device info")?;
        Ok(parse::parse_device_info(&output))
    }

    /// Installs the `.ipa` at `path`.
    pub fn install_app(&self, path: &str) -> Result<()> {
        let udid = self.require_udid()?;
        self.run_tool(&self.config.tools.installer, ["-u", udid, "-i", path], "install app")?;
        Ok(())
    }

    pub fn uninstall_app(&self, bundle_id: &str) -> Result<()> {
        let udid = self.require_udid()?;
        self.run_tool(&self.config.tools.installer, ["-u", udid, "-U", bundle_id], "uninstall app")?;
        Ok(())
    }

    /// Installed apps, from lines of the form `<bundle-id> - <name>`.
    pub fn list_apps(&self) -> Result<Vec<AppInfo>> {
        let udid = self.require_udid()?;
        let output = self.run_tool(&self.config.tools.installer, ["-u", udid, "-l"], "list apps")?;
        Ok(parse::parse_app_list(&output))
    }

    pub fn reboot(&self) -> Result<()> {
        let udid = self.require_udid()?;
        self.run_tool(&self.config.tools.diagnostics, ["-u", udid, "restart"], "reboot device")?;
        Ok(())
    }

    /// Saves a screenshot to `path` and returns the path.
    pub fn screenshot(&self, path: &str) -> Result<String> {
        let udid = self.require_udid()?;
        self.run_tool(&self.config.tools.screenshot, ["-u", udid, path], "take screenshot")?;
        Ok(path.to_string())
    }

    pub fn tap(&self, x: i32, y: i32) -> Result<()> {
        self.run_gesture(Gesture::Tap { x, y }, format!("tap at ({}, {})", x, y))?;
        Ok(())
    }

    /// Swipes between two points; `duration` is in seconds and is only
    /// honored by the primary backend.
    pub fn swipe(&self, start_x: i32, start_y: i32, end_x: i32, end_y: i32, duration: f64) -> Result<()> {
        let gesture = Gesture::Swipe { start_x, start_y, end_x, end_y, duration };
        self.run_gesture(gesture, "swipe".to_string())?;
        Ok(())
    }

    /// Types into the focused text field.
    pub fn input_text(&self, text: &str) -> Result<()> {
        self.run_gesture(Gesture::InputText { text: text.to_string() }, "input text".to_string())?;
        Ok(())
    }

    /// Long press; primary backend only.
    pub fn long_press(&self, x: i32, y: i32, duration: f64) -> Result<()> {
        self.run_gesture(
            Gesture::LongPress { x, y, duration },
            format!("long press at ({}, {})", x, y),
        )?;
        Ok(())
    }

    pub fn home_button(&self) -> Result<()> {
        self.run_gesture(Gesture::Home, "press home button".to_string())?;
        Ok(())
    }

    /// Back navigation as a swipe in from the left edge.
    pub fn back_button(&self) -> Result<()> {
        self.require_udid()?;
        let (start_x, start_y, end_x, end_y) = BACK_GESTURE;
        self.swipe(start_x, start_y, end_x, end_y, BACK_GESTURE_DURATION)
            .map_err(|e| ControlError::Connection(format!("Failed to perform back gesture: {}", e.message())))
    }

    /// Fetches the current UI hierarchy.
    ///
    /// The primary backend's JSON is parsed; when it fails, the fallback
    /// backend's text dump is returned as [`HierarchyDump::Raw`].
    ///
    /// # Errors
    ///
    /// - [`ControlError::UnsupportedOperation`] if the primary tool is missing
    ///   or both backends fail
    /// - [`ControlError::Connection`] if the primary emits invalid JSON
    pub fn hierarchy(&self) -> Result<HierarchyDump> {
        let udid = self.require_udid()?;
        let chain = FallbackChain::for_gesture(&self.config.tools, udid, &Gesture::DumpHierarchy);
        match chain.run(&self.runner) {
            Ok(ChainOutput { attempt: 0, stdout }) => serde_json::from_str(&stdout)
                .map(HierarchyDump::Json)
                .map_err(|e| ControlError::Connection(format!("Invalid UI hierarchy JSON: {}", e))),
            Ok(ChainOutput { stdout, .. }) => Ok(HierarchyDump::Raw(stdout)),
            Err(ChainError::PrimaryMissing { .. }) => Err(ControlError::UnsupportedOperation(
                "UI automation tools not available".to_string(),
            )),
            Err(ChainError::Exhausted { .. }) => Err(ControlError::UnsupportedOperation(
                "Cannot get UI hierarchy".to_string(),
            )),
        }
    }

    /// Center of the first on-screen element whose text matches, if any.
    pub fn find_element_by_text(&self, text: &str, exact_match: bool) -> Result<Option<(i32, i32)>> {
        let dump = self.hierarchy()?;
        Ok(hierarchy::find_element_by_text(&dump.root(), text, exact_match))
    }

    /// Taps the center of the first element whose text matches.
    pub fn tap_by_text(&self, text: &str, exact_match: bool) -> Result<()> {
        self.require_udid()?;
        self.find_and_tap(text, exact_match).map_err(|e| {
            ControlError::Connection(format!("Failed to tap by text '{}': {}", text, e.message()))
        })
    }

    fn find_and_tap(&self, text: &str, exact_match: bool) -> Result<()> {
        let (x, y) = self
            .find_element_by_text(text, exact_match)?
            .ok_or_else(|| ControlError::Connection(format!("Element with text '{}' not found", text)))?;
        debug!(text, x, y, "resolved element");
        self.tap(x, y)
    }

    /// Polls the hierarchy until an element with matching text appears.
    ///
    /// Returns `Ok(false)` once `timeout` elapses. Errors while polling are
    /// treated as "not found yet".
    pub fn wait_for_element_by_text(&self, text: &str, timeout: Duration, exact_match: bool) -> Result<bool> {
        self.require_udid()?;
        let start = Instant::now();

        while start.elapsed() < timeout {
            match self.find_element_by_text(text, exact_match) {
                Ok(Some(_)) => return Ok(true),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "hierarchy poll failed"),
            }
            thread::sleep(self.config.poll_interval());
        }
        Ok(false)
    }

    /// Screen size in points, from the device's `ProductType`.
    ///
    /// Unknown models and failed lookups fall back to the default size.
    pub fn get_screen_size(&self) -> Result<(u32, u32)> {
        self.require_udid()?;
        match self.get_device_info() {
            Ok(info) => Ok(screen_size_for(info.get("ProductType").map(String::as_str).unwrap_or(""))),
            Err(e) => {
                debug!(error = %e, "screen size lookup failed");
                Ok(DEFAULT_SCREEN_SIZE)
            }
        }
    }
}

impl<R: CommandRunner> fmt::Display for IosDevice<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let udid = self.udid.as_deref().unwrap_or("None");
        match &self.record {
            Some(record) => write!(f, "IosDevice(udid={}, name={})", udid, record.name),
            None => write!(f, "IosDevice(udid={}, connected={})", udid, self.connected),
        }
    }
}

/// A connected [`IosDevice`] that disconnects when dropped, including on
/// early returns and panics.
pub struct DeviceSession<'a, R: CommandRunner> {
    device: &'a mut IosDevice<R>,
}

impl<R: CommandRunner> Deref for DeviceSession<'_, R> {
    type Target = IosDevice<R>;

    fn deref(&self) -> &Self::Target {
        self.device
    }
}

impl<R: CommandRunner> DerefMut for DeviceSession<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.device
    }
}

impl<R: CommandRunner> Drop for DeviceSession<'_, R> {
    fn drop(&mut self) {
        self.device.disconnect();
    }
}
