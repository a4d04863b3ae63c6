//! Extra info payload
//!
//! Side-channel configuration carried as a trailing `// EXTRA_INFO:` comment
//! on the glue script. One invocation may emit it (whole-program
//! minification writes its name table) for a later paired invocation to read.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Comment prefix introducing the JSON payload
pub const MARKER: &str = "// EXTRA_INFO:";

/// Configuration shared by the passes of one run. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraInfo {
    /// Import/export renames, old name to new name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, String>,
    /// Extra `[jsName, binaryName]` export pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<(String, String)>,
    /// Global name to minified name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub globals: BTreeMap<String, String>,
    /// Graph node names the external trimmer found unused
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unused: BTreeSet<String>,
}

impl ExtraInfo {
    /// Parse a bare JSON payload
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text.trim()).context("Malformed extra info payload")
    }

    /// Find the last marker in `source` and parse its payload
    ///
    /// Returns `Ok(None)` when there is no marker at all.
    pub fn from_source(source: &str) -> Result<Option<Self>> {
        let Some(start) = source.rfind(MARKER) else {
            return Ok(None);
        };
        let payload = &source[start + MARKER.len()..];
        let payload = payload.lines().next().unwrap_or_default();
        Self::from_json(payload).map(Some)
    }

    /// Render as a marker line (without a trailing newline)
    pub fn to_marker(&self) -> Result<String> {
        let payload = serde_json::to_string(self).context("Failed to serialize extra info")?;
        Ok(format!("{}{}", MARKER, payload))
    }
}
