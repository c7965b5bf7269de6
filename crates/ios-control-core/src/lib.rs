//! # ios-control-core
//!
//! Core library for controlling physical iOS devices from the command line.
//!
//! This crate does not speak any device protocol itself. It drives existing
//! tools and parses what they print:
//!
//! - **libimobiledevice** (`idevice_id`, `ideviceinfo`, `ideviceinstaller`,
//!   `idevicediagnostics`, `idevicescreenshot`) for discovery, info, apps,
//!   reboot and screenshots
//! - **pymobiledevice3** (`python3 -m pymobiledevice3 developer dvt`) as the
//!   primary UI automation backend
//! - **tidevice** as the fallback UI automation backend
//!
//! ## Modules
//!
//! - [`device`] - The [`IosDevice`] session handle and every device operation
//! - [`hierarchy`] - UI hierarchy model and text-to-coordinate search
//! - [`backend`] - Automation argument shapes and the primary→fallback chain
//! - [`runner`] - Process boundary ([`CommandRunner`], [`SystemRunner`])
//! - [`config`] - Tool locations and tunables
//! - [`parse`] - Parsers for tool output
//! - [`screen`] - Screen sizes for known models
//!
//! ## Example
//!
//! ```no_run
//! use ios_control_core::device::IosDevice;
//!
//! for device in IosDevice::list_devices() {
//!     println!("{} ({}) iOS {}", device.name, device.udid, device.ios_version);
//! }
//!
//! # fn example() -> ios_control_core::Result<()> {
//! let mut device = IosDevice::new(None);
//! let session = device.session()?;
//! let info = session.get_device_info()?;
//! println!("{:?}", info.get("ProductType"));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod hierarchy;
pub mod parse;
pub mod runner;
pub mod screen;

pub use device::{DeviceRecord, DeviceSession, IosDevice};
pub use error::{ControlError, Result};
pub use runner::{CommandRunner, SystemRunner};
