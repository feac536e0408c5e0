pub mod target;

pub use target::{DestinationRequest, OutputTarget};

use crate::config::{ExtractionMode, RunConfiguration};
use crate::engine::{ExtractionEngine, MessageHandle};
use crate::error::{error_chain, Result};
use crate::ui::{ascii_escape, sanitize, write_or_fallback, Console};
use std::path::{Path, PathBuf};

/// Result of processing one input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Saved(PathBuf),
    Printed,
    Failed(String),
}

/// Sequential extraction loop over a batch of `.msg` files.
///
/// A failing item is reported on the console and never stops the batch.
pub struct BatchDriver<'a, E, C: ?Sized> {
    engine: &'a E,
    config: &'a RunConfiguration,
    console: &'a mut C,
}

impl<'a, E, C> BatchDriver<'a, E, C>
where
    E: ExtractionEngine,
    C: Console + ?Sized,
{
    pub fn new(engine: &'a E, config: &'a RunConfiguration, console: &'a mut C) -> Self {
        Self {
            engine,
            config,
            console,
        }
    }

    pub fn run(&mut self, items: &[PathBuf]) {
        tracing::debug!(items = items.len(), mode = ?self.config.mode, "Starting batch");

        for item in items {
            if self.config.progress {
                self.report_progress(item);
            }

            let outcome = self.process_item(item);
            self.report_outcome(item, outcome);
        }
    }

    fn process_item(&mut self, item: &Path) -> ItemOutcome {
        match self.extract(item) {
            Ok(outcome) => outcome,
            Err(e) => ItemOutcome::Failed(error_chain(&e)),
        }
    }

    // The handle is dropped when this returns, on success and on error alike.
    fn extract(&mut self, item: &Path) -> Result<ItemOutcome> {
        let mut handle = self.engine.open(item, &self.config.parser)?;

        match self.config.mode {
            ExtractionMode::PrintBody => {
                self.console.write_line(handle.primary_text())?;
                Ok(ItemOutcome::Printed)
            }
            ExtractionMode::Save => {
                let location = handle.save(&self.config.save)?;
                Ok(ItemOutcome::Saved(location))
            }
        }
    }

    fn report_progress(&mut self, item: &Path) {
        write_or_fallback(
            &mut *self.console,
            &format!("Saving file \"{}\"...", item.display()),
            || {
                format!(
                    "Saving file {} (failed to print without escaping)...",
                    sanitize(item)
                )
            },
        );
    }

    fn report_outcome(&mut self, item: &Path, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Saved(location) => {
                tracing::info!(item = %item.display(), location = %location.display(), "Saved message");
            }
            ItemOutcome::Printed => {
                tracing::debug!(item = %item.display(), "Printed message body");
            }
            ItemOutcome::Failed(diagnostic) => {
                tracing::debug!(item = %item.display(), "Message failed");
                write_or_fallback(
                    &mut *self.console,
                    &format!("Error with file \"{}\": {}", item.display(), diagnostic),
                    || {
                        format!(
                            "Error with file {}: {}",
                            sanitize(item),
                            ascii_escape(&diagnostic)
                        )
                    },
                );
            }
        }
    }
}
