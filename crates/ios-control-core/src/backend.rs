//! UI automation backends and the ordered fallback between them.
//!
//! Two automation tools are supported. The primary one (pymobiledevice3's
//! `developer dvt` commands by default) takes the operation name first:
//! `tap --udid U 10 20`. The fallback one (tidevice) takes the device first:
//! `--udid U tap 10 20`. A [`FallbackChain`] holds the resulting invocations
//! and tries them in order until one exits successfully.

use thiserror::Error;
use tracing::warn;

use crate::config::ToolsConfig;
use crate::runner::{CommandRunner, Invocation, RunError};

/// An operation understood by the automation backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Tap { x: i32, y: i32 },
    Swipe { start_x: i32, start_y: i32, end_x: i32, end_y: i32, duration: f64 },
    InputText { text: String },
    LongPress { x: i32, y: i32, duration: f64 },
    Home,
    DumpHierarchy,
}

/// Seconds formatted the way the backends expect (`0.5`, `1.0`).
fn seconds(duration: f64) -> String {
    format!("{:?}", duration)
}

impl Gesture {
    /// Operation name as passed to the backends.
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Tap { .. } => "tap",
            Gesture::Swipe { .. } => "swipe",
            Gesture::InputText { .. } => "input",
            Gesture::LongPress { .. } => "longpress",
            Gesture::Home => "home",
            Gesture::DumpHierarchy => "ui",
        }
    }

    /// Arguments for the primary backend: operation, `--udid U`, operands.
    pub fn primary_args(&self, udid: &str) -> Vec<String> {
        let mut args = vec![self.name().to_string(), "--udid".to_string(), udid.to_string()];
        match self {
            Gesture::Tap { x, y } => {
                args.extend([x.to_string(), y.to_string()]);
            }
            Gesture::Swipe { start_x, start_y, end_x, end_y, duration } => {
                args.extend([
                    start_x.to_string(),
                    start_y.to_string(),
                    end_x.to_string(),
                    end_y.to_string(),
                    "--duration".to_string(),
                    seconds(*duration),
                ]);
            }
            Gesture::InputText { text } => args.push(text.clone()),
            Gesture::LongPress { x, y, duration } => {
                args.extend([x.to_string(), y.to_string(), "--duration".to_string(), seconds(*duration)]);
            }
            Gesture::Home => {}
            Gesture::DumpHierarchy => args.extend(["--format".to_string(), "json".to_string()]),
        }
        args
    }

    /// Arguments for the fallback backend: `--udid U`, operation, operands.
    ///
    /// Returns `None` for operations the fallback backend has no equivalent
    /// for (long press). The fallback swipe has no duration parameter.
    pub fn fallback_args(&self, udid: &str) -> Option<Vec<String>> {
        let mut args = vec!["--udid".to_string(), udid.to_string()];
        match self {
            Gesture::Tap { x, y } => args.extend(["tap".to_string(), x.to_string(), y.to_string()]),
            Gesture::Swipe { start_x, start_y, end_x, end_y, .. } => args.extend([
                "swipe".to_string(),
                start_x.to_string(),
                start_y.to_string(),
                end_x.to_string(),
                end_y.to_string(),
            ]),
            Gesture::InputText { text } => args.extend(["input".to_string(), text.clone()]),
            Gesture::LongPress { .. } => return None,
            Gesture::Home => args.push("home".to_string()),
            Gesture::DumpHierarchy => args.push("dump-hierarchy".to_string()),
        }
        Some(args)
    }
}

/// Why a [`FallbackChain`] produced no result.
#[derive(Error, Debug)]
pub enum ChainError {
    /// The first backend's binary is not installed; nothing else was tried.
    #[error("{program} not found")]
    PrimaryMissing { program: String },

    /// Every attempt ran and failed. Carries the first attempt's failure.
    #[error("{message}")]
    Exhausted { message: String },
}

/// A successful attempt within a chain.
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// Position of the attempt that succeeded (0 is the primary).
    pub attempt: usize,
    pub stdout: String,
}

/// Invocations tried in order until one succeeds.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    attempts: Vec<Invocation>,
}

impl FallbackChain {
    pub fn new(attempts: Vec<Invocation>) -> Self {
        Self { attempts }
    }

    /// Chain for `gesture` on device `udid`: primary, then fallback when the
    /// operation has one.
    pub fn for_gesture(tools: &ToolsConfig, udid: &str, gesture: &Gesture) -> Self {
        let mut attempts = vec![tools.automation.invocation(gesture.primary_args(udid))];
        if let Some(args) = gesture.fallback_args(udid) {
            attempts.push(tools.fallback_automation.invocation(args));
        }
        Self::new(attempts)
    }

    pub fn attempts(&self) -> &[Invocation] {
        &self.attempts
    }

    /// Runs the attempts in order, returning the first success.
    pub fn run<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<ChainOutput, ChainError> {
        let mut first_failure: Option<String> = None;

        for (attempt, invocation) in self.attempts.iter().enumerate() {
            match runner.run(invocation) {
                Ok(stdout) => return Ok(ChainOutput { attempt, stdout }),
                Err(RunError::NotFound { program }) if attempt == 0 => {
                    return Err(ChainError::PrimaryMissing { program });
                }
                Err(e) => {
                    if attempt + 1 < self.attempts.len() {
                        warn!(command = %invocation, error = %e, "automation backend failed, trying fallback");
                    }
                    if first_failure.is_none() {
                        first_failure = Some(e.to_string());
                    }
                }
            }
        }

        Err(ChainError::Exhausted {
            message: first_failure.unwrap_or_else(|| "no automation backend configured".to_string()),
        })
    }
}
