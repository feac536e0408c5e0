//! Validation mode: check every input, print the aggregate and persist it.

pub mod structure;

pub use structure::MsgValidator;

use crate::error::Result;
use crate::ui::console::{ascii_escape, sanitize, write_or_fallback, Console};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Failed,
}

/// Structural assessment of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub streams: usize,
    pub storages: usize,
    pub attachments: usize,
    pub recipients: usize,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            status: ValidationStatus::Passed,
            errors: Vec::new(),
            warnings: Vec::new(),
            streams: 0,
            storages: 0,
            attachments: 0,
            recipients: 0,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let mut result = Self::passed();
        result.fail(error);
        result
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ValidationStatus::Failed;
        self.errors.push(error.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn is_passed(&self) -> bool {
        self.status == ValidationStatus::Passed
    }
}

/// Checks one input. Problems are reported as a failing result, never as an error.
pub trait Validator {
    fn validate(&self, path: &Path) -> ValidationResult;
}

/// Blocks until the operator has seen the results.
pub trait AcknowledgmentGate {
    fn acknowledge(&mut self, console: &mut dyn Console);
}

/// Prompts on the console and waits for a line on stdin.
#[derive(Debug, Default)]
pub struct StdinGate;

impl AcknowledgmentGate for StdinGate {
    fn acknowledge(&mut self, console: &mut dyn Console) {
        write_or_fallback(console, "Press enter to exit...", || {
            "Press enter to exit...".to_string()
        });
        wait_for_enter(&mut io::stdout(), &mut io::stdin().lock());
    }
}

/// Flushes the prompt, then blocks until a line or end of input arrives.
fn wait_for_enter<W: Write, R: BufRead>(prompt: &mut W, input: &mut R) {
    if let Err(e) = prompt.flush() {
        tracing::warn!(error = %e, "Failed to flush acknowledgment prompt");
    }

    let mut line = String::new();
    if let Err(e) = input.read_line(&mut line) {
        tracing::warn!(error = %e, "Failed to read acknowledgment");
    }
}

pub type ValidationReport = BTreeMap<String, ValidationResult>;

pub struct ValidationReporter<'a, V: ?Sized, G: ?Sized> {
    validator: &'a V,
    gate: &'a mut G,
    report_dir: &'a Path,
}

impl<'a, V, G> ValidationReporter<'a, V, G>
where
    V: Validator + ?Sized,
    G: AcknowledgmentGate + ?Sized,
{
    pub fn new(validator: &'a V, gate: &'a mut G, report_dir: &'a Path) -> Self {
        Self {
            validator,
            gate,
            report_dir,
        }
    }

    pub fn run(&mut self, items: &[PathBuf], console: &mut dyn Console) -> Result<PathBuf> {
        self.run_at(items, chrono::Utc::now().timestamp(), console)
    }

    /// Validates `items` and writes `validation <timestamp>.json` into the report directory.
    pub fn run_at(
        &mut self,
        items: &[PathBuf],
        timestamp: i64,
        console: &mut dyn Console,
    ) -> Result<PathBuf> {
        let mut report = ValidationReport::new();
        for item in items {
            let result = self.validator.validate(item);
            tracing::debug!(file = %item.display(), passed = result.is_passed(), "Validated");
            report.insert(item.to_string_lossy().into_owned(), result);
        }

        let pretty = serde_json::to_string_pretty(&report)?;
        write_or_fallback(console, "Validation Results:", || "Validation Results:".to_string());
        write_or_fallback(console, &pretty, || ascii_escape(&pretty));

        let filename = format!("validation {}.json", timestamp);
        let report_path = self.report_dir.join(&filename);
        fs::write(&report_path, serde_json::to_string(&report)?)?;
        tracing::info!(report = %report_path.display(), entries = report.len(), "Wrote validation report");

        let saved = format!("These results have been saved to {}", filename);
        write_or_fallback(console, &saved, || {
            format!("These results have been saved to {}", sanitize(&filename))
        });

        self.gate.acknowledge(console);
        Ok(report_path)
    }
}
