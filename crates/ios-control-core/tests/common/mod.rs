//! Shared test helpers for ios-control-core integration tests.
//!
//! [`ScriptedRunner`] stands in for the host: each rule matches a program and
//! a set of arguments and replays a canned outcome. Every invocation is
//! recorded so tests can assert on exactly what would have been spawned.

#![allow(dead_code)]

use std::cell::RefCell;

use ios_control_core::config::ControlConfig;
use ios_control_core::runner::{CommandOutput, CommandRunner, Invocation, RunError};
use ios_control_core::IosDevice;

pub const UDID_A: &str = "00008110-001A0C123456789A";
pub const UDID_B: &str = "00008030-000E5C8A3A02802E";

/// Outcome replayed for a matching invocation.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Fail(i32, String),
    Missing,
}

struct Rule {
    program: String,
    needles: Vec<String>,
    reply: Reply,
}

/// A [`CommandRunner`] driven by rules. The first matching rule wins; an
/// invocation no rule matches behaves like a missing binary.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for `program` whose arguments contain every one of `needles`.
    pub fn on(mut self, program: &str, needles: &[&str], reply: Reply) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            needles: needles.iter().map(|s| s.to_string()).collect(),
            reply,
        });
        self
    }

    /// Discovery of one device with full metadata.
    pub fn with_device(self, udid: &str, name: &str, version: &str) -> Self {
        self.on("idevice_id", &["-l"], Reply::Ok(format!("{}\n", udid)))
            .on("ideviceinfo", &[udid, "DeviceName"], Reply::Ok(format!("{}\n", name)))
            .on("ideviceinfo", &[udid, "ProductVersion"], Reply::Ok(format!("{}\n", version)))
    }

    /// Appends `other`'s rules after this runner's rules.
    pub fn then(mut self, other: ScriptedRunner) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Invocations of `program` whose arguments contain `needle`.
    pub fn calls_with(&self, program: &str, needle: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.program == program && inv.args.iter().any(|a| a == needle))
            .cloned()
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        self.calls.borrow_mut().push(invocation.clone());

        let rule = self.rules.iter().find(|rule| {
            rule.program == invocation.program
                && rule.needles.iter().all(|n| invocation.args.iter().any(|a| a == n))
        });

        match rule.map(|r| r.reply.clone()) {
            Some(Reply::Ok(stdout)) => Ok(CommandOutput::success(stdout)),
            Some(Reply::Fail(code, stderr)) => Ok(CommandOutput::failure(code, stderr)),
            Some(Reply::Missing) | None => Err(RunError::NotFound {
                program: invocation.program.clone(),
            }),
        }
    }
}

/// Config with a near-zero poll interval so wait tests stay fast.
pub fn fast_config() -> ControlConfig {
    ControlConfig {
        poll_interval_ms: 10,
        ..ControlConfig::default()
    }
}

/// A device already connected to [`UDID_A`]. Discovery rules take priority
/// over the rules in `runner`.
pub fn connected_device(runner: ScriptedRunner) -> IosDevice<ScriptedRunner> {
    let runner = ScriptedRunner::new()
        .with_device(UDID_A, "Test iPhone", "17.0")
        .then(runner);
    let mut device = IosDevice::with_runner(None, runner, fast_config());
    device.connect().expect("scripted discovery should connect");
    device
}
