//! Pass registry and sequential pipeline
//!
//! Passes run in the order given, each mutating the AST in place. A failing
//! pass aborts the run; nothing is partially printed.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;

use crate::dce::{eliminate_dead_code, DceMode};
use crate::minify::{minify_globals, minify_locals};
use crate::reachability::{apply_dce_graph_removals, emit_dce_graph};
use crate::rename::apply_import_export_name_changes;
use crate::{Diagnostics, ExtraInfo, Node};

/// A registered pass, named in kebab-case on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Pass {
    Dce,
    AggressiveDce,
    EmitDceGraph,
    ApplyDceGraphRemovals,
    ApplyImportExportNameChanges,
    MinifyLocals,
    MinifyGlobals,
    NoPrint,
}

impl Pass {
    pub fn description(&self) -> &'static str {
        match self {
            Pass::Dce => "Remove unused locals, one sweep per function",
            Pass::AggressiveDce => "Remove unused locals and pure statements until fixpoint",
            Pass::EmitDceGraph => "Print the import/export reachability graph instead of the AST",
            Pass::ApplyDceGraphRemovals => "Remove imports and exports listed as unused",
            Pass::ApplyImportExportNameChanges => "Rename imports and exports per the mapping",
            Pass::MinifyLocals => "Shorten locals of toplevel functions",
            Pass::MinifyGlobals => "Shorten every name in the wrapper function",
            Pass::NoPrint => "Suppress AST output",
        }
    }

    /// Whether the pass reads the extra info payload
    pub fn needs_extra_info(&self) -> bool {
        matches!(
            self,
            Pass::ApplyDceGraphRemovals | Pass::ApplyImportExportNameChanges | Pass::MinifyLocals
        )
    }
}

/// Run-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Emit debug traces (missing graph references)
    pub verbose: bool,
    /// Toplevel function minified by `minify-globals`
    pub wrapper_name: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            wrapper_name: "instantiate".to_string(),
        }
    }
}

/// Per-pass statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassStats {
    pub pass: Pass,
    /// Nodes removed, names renamed or graph nodes emitted
    pub changed: usize,
    pub elapsed: Duration,
}

/// Everything a run produces besides the mutated AST
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Whether the caller should print the AST
    pub print: bool,
    /// Reachability graph JSON, set by `emit-dce-graph`
    pub graph: Option<String>,
    /// Trailing extra info marker, set by `minify-globals`
    pub suffix: Option<String>,
    pub stats: Vec<PassStats>,
}

pub struct Pipeline {
    passes: Vec<Pass>,
    options: PipelineOptions,
    extra_info: Option<ExtraInfo>,
}

impl Pipeline {
    pub fn new(passes: Vec<Pass>, options: PipelineOptions) -> Self {
        Self {
            passes,
            options,
            extra_info: None,
        }
    }

    /// Resolve kebab-case pass names
    pub fn from_names<S: AsRef<str>>(names: &[S], options: PipelineOptions) -> Result<Self> {
        let passes = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                name.parse::<Pass>()
                    .map_err(|_| anyhow::anyhow!("unknown pass '{}'", name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(passes, options))
    }

    pub fn with_extra_info(mut self, extra_info: Option<ExtraInfo>) -> Self {
        self.extra_info = extra_info;
        self
    }

    fn require_extra_info(&self, pass: Pass) -> Result<&ExtraInfo> {
        match &self.extra_info {
            Some(extra_info) => Ok(extra_info),
            None => bail!("pass '{}' requires extra info", pass),
        }
    }

    pub fn run(&mut self, program: &mut Node) -> Result<PipelineOutput> {
        program.program_body_mut()?;
        for pass in &self.passes {
            if pass.needs_extra_info() {
                self.require_extra_info(*pass)?;
            }
        }

        let mut diag = Diagnostics::new(self.options.verbose);
        let mut output = PipelineOutput {
            print: true,
            ..PipelineOutput::default()
        };
        for &pass in &self.passes {
            let start = Instant::now();
            let changed = self
                .run_pass(pass, program, &mut diag, &mut output)
                .with_context(|| format!("pass '{}' failed", pass))?;
            let elapsed = start.elapsed();
            info!(%pass, changed, ?elapsed, "pass finished");
            output.stats.push(PassStats {
                pass,
                changed,
                elapsed,
            });
        }
        Ok(output)
    }

    fn run_pass(
        &self,
        pass: Pass,
        program: &mut Node,
        diag: &mut Diagnostics,
        output: &mut PipelineOutput,
    ) -> Result<usize> {
        match pass {
            Pass::Dce => Ok(eliminate_dead_code(program, DceMode::SingleShot)?.removed),
            Pass::AggressiveDce => Ok(eliminate_dead_code(program, DceMode::Aggressive)?.removed),
            Pass::EmitDceGraph => {
                let graph = emit_dce_graph(program, self.extra_info.as_ref(), diag)?;
                output.graph = Some(graph.to_json()?);
                output.print = false;
                Ok(graph.len())
            }
            Pass::ApplyDceGraphRemovals => {
                let unused = &self.require_extra_info(pass)?.unused;
                Ok(apply_dce_graph_removals(program, unused, diag)?.total())
            }
            Pass::ApplyImportExportNameChanges => {
                let mapping = &self.require_extra_info(pass)?.mapping;
                Ok(apply_import_export_name_changes(program, mapping))
            }
            Pass::MinifyLocals => {
                let globals = &self.require_extra_info(pass)?.globals;
                minify_locals(program, globals)
            }
            Pass::MinifyGlobals => {
                let known: Vec<String> = self
                    .extra_info
                    .as_ref()
                    .map(|extra| extra.globals.keys().cloned().collect())
                    .unwrap_or_default();
                let mapping = minify_globals(program, &self.options.wrapper_name, &known)?;
                let renamed = mapping.len();
                let suffix = ExtraInfo {
                    globals: mapping,
                    ..ExtraInfo::default()
                };
                output.suffix = Some(suffix.to_marker()?);
                Ok(renamed)
            }
            Pass::NoPrint => {
                output.print = false;
                Ok(0)
            }
        }
    }
}
