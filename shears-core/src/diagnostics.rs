//! Diagnostics context
//!
//! Carries the verbose flag and the set of warnings already issued, so a
//! warning repeated for every node of a large input is printed once.

use std::collections::HashSet;
use std::fmt::Display;

use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Diagnostics {
    verbose: bool,
    warned: HashSet<String>,
}

impl Diagnostics {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            warned: HashSet::new(),
        }
    }

    /// Log a detail that only matters when debugging a run
    pub fn trace(&self, message: impl Display) {
        if self.verbose {
            debug!("{}", message);
        }
    }

    /// Emit `message` as a warning unless it was already emitted
    ///
    /// Returns whether the warning was emitted.
    pub fn warn_once(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.warned.contains(&message) {
            return false;
        }
        warn!("{}", message);
        self.warned.insert(message);
        true
    }

    /// Number of distinct warnings emitted so far
    pub fn warning_count(&self) -> usize {
        self.warned.len()
    }
}
