//! Cross-Module Reachability
//!
//! Builds the dependency graph between the glue script and its binary module,
//! and applies the pruning decisions an external graph reducer makes on it.
//!
//! ## Graph
//!
//! Three kinds of node, told apart by a name prefix:
//!
//! - `emcc$import$<key>`: a property of the `wasmImports` object. It reaches
//!   the JS binding named by the property value.
//! - `emcc$export$<jsName>`: a binding to a binary export, recognized by the
//!   matchers in [`crate::patterns`] or seeded from extra info.
//! - `emcc$defun$<name>`: a toplevel function declaration.
//!
//! A reference inside a defun body becomes an edge from that defun; a
//! reference anywhere else at toplevel roots its target. References to
//! unregistered names are traced and dropped: a build without a binary
//! module has none of the import/export patterns.
//!
//! ## Determinism
//!
//! Nodes and edge lists are kept in ordered collections, so the same input
//! always serializes to the same bytes.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::has_side_effects;
use crate::extra_info::ExtraInfo;
use crate::patterns::{
    export_use_name, imports_properties, imports_properties_mut, is_bare_declaration,
    is_dynamic_dyncall, is_export_assignment, is_module_number_export, match_export_declaration,
    minimal_runtime_exports, module_use_name, property_key_name, static_dyncall_target,
    ExportMatch, DYNCALL_PREFIX,
};
use crate::walk::{descend, full, recursive, try_full, Recursive};
use crate::{build, Diagnostics, Node};

/// Prefix of import node names
pub const IMPORT_PREFIX: &str = "emcc$import$";
/// Prefix of export node names
pub const EXPORT_PREFIX: &str = "emcc$export$";
/// Prefix of defun node names
pub const DEFUN_PREFIX: &str = "emcc$defun$";

/// Module name recorded on every import node
const IMPORT_MODULE: &str = "env";

fn is_false(value: &bool) -> bool {
    !*value
}

/// One node of the reachability graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Kind-prefixed unique name
    pub name: String,
    /// `[module, field]` of an import node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<[String; 2]>,
    /// Binary-facing name of an export node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
    /// Names this node keeps alive, sorted
    #[serde(default)]
    pub reaches: BTreeSet<String>,
    /// Unconditionally needed
    #[serde(default, skip_serializing_if = "is_false")]
    pub root: bool,
}

impl GraphNode {
    fn new(name: String) -> Self {
        Self {
            name,
            import: None,
            export: None,
            reaches: BTreeSet::new(),
            root: false,
        }
    }
}

/// The reachability graph, ordered by node name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: BTreeMap<String, GraphNode>,
}

impl Graph {
    /// Node by its kind-prefixed name
    pub fn get(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.get(name)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node was registered
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in name order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Names of root nodes
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes.values().filter(|n| n.root).map(|n| n.name.as_str())
    }

    /// Nodes no root reaches through the edges of this graph alone
    ///
    /// The external reducer also follows edges inside the binary module,
    /// which this graph cannot see; this is the JS-only view of the same
    /// computation.
    pub fn unreachable_from_roots(&self) -> BTreeSet<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = self.roots().collect();
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(node) = self.nodes.get(name) {
                stack.extend(node.reaches.iter().map(String::as_str));
            }
        }
        self.nodes
            .keys()
            .filter(|name| !seen.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Serialize as a JSON array with one-space indentation
    pub fn to_json(&self) -> Result<String> {
        let nodes: Vec<&GraphNode> = self.nodes.values().collect();
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        nodes
            .serialize(&mut serializer)
            .context("Failed to serialize reachability graph")?;
        String::from_utf8(buf).context("Reachability graph is not valid UTF-8")
    }

    /// Parse the JSON array produced by [`Graph::to_json`]
    pub fn from_json(text: &str) -> Result<Self> {
        let nodes: Vec<GraphNode> =
            serde_json::from_str(text).context("Malformed reachability graph")?;
        Ok(Self {
            nodes: nodes.into_iter().map(|n| (n.name.clone(), n)).collect(),
        })
    }

    fn node_mut(&mut self, name: &str) -> Option<&mut GraphNode> {
        self.nodes.get_mut(name)
    }
}

// ============================================================================
// Registration
// ============================================================================

#[derive(Default)]
struct Registry {
    graph: Graph,
    /// JS binding name to graph name (exports and defuns)
    names: HashMap<String, String>,
    /// Binary export name to graph name
    binary_exports: HashMap<String, String>,
    /// Export nodes whose JS name carries the `dynCall_` prefix
    dyncalls: BTreeSet<String>,
}

impl Registry {
    fn add_import(&mut self, key: &str) {
        let name = format!("{}{}", IMPORT_PREFIX, key);
        let mut node = GraphNode::new(name.clone());
        node.import = Some([IMPORT_MODULE.to_string(), key.to_string()]);
        self.graph.nodes.insert(name, node);
    }

    fn add_export(&mut self, export: &ExportMatch) {
        let name = format!("{}{}", EXPORT_PREFIX, export.js_name);
        let mut node = GraphNode::new(name.clone());
        node.export = Some(export.binary_name.clone());
        self.graph.nodes.insert(name.clone(), node);
        self.names.insert(export.js_name.clone(), name.clone());
        self.binary_exports
            .insert(export.binary_name.clone(), name.clone());
        if export.js_name.starts_with(DYNCALL_PREFIX) {
            self.dyncalls.insert(name);
        }
    }

    fn add_defun(&mut self, defun: &str) -> String {
        let name = format!("{}{}", DEFUN_PREFIX, defun);
        self.graph
            .nodes
            .insert(name.clone(), GraphNode::new(name.clone()));
        self.names.insert(defun.to_string(), name.clone());
        name
    }
}

/// Collects the graph names a subtree references
struct References<'r> {
    registry: &'r Registry,
    diag: &'r Diagnostics,
    reached: BTreeSet<String>,
}

impl References<'_> {
    fn reach_export(&mut self, binary_name: &str) {
        match self.registry.binary_exports.get(binary_name) {
            Some(name) => {
                self.reached.insert(name.clone());
            }
            None => self
                .diag
                .trace(format_args!("export use of unknown export '{}'", binary_name)),
        }
    }

    fn reach_all_dyncalls(&mut self) {
        self.reached
            .extend(self.registry.dyncalls.iter().cloned());
    }
}

impl Recursive for References<'_> {
    fn handle(&mut self, node: &mut Node) -> bool {
        if let Some(binary_name) = export_use_name(node) {
            let binary_name = binary_name.to_string();
            self.reach_export(&binary_name);
            return true;
        }
        if let Some(js_name) = module_use_name(node) {
            if let Some(name) = self.registry.names.get(js_name) {
                self.reached.insert(name.clone());
            }
            return true;
        }
        if is_dynamic_dyncall(node) {
            self.reach_all_dyncalls();
            // Arguments may hold further references
            return false;
        }
        if let Some(target) = static_dyncall_target(node) {
            match self.registry.names.get(&target) {
                Some(name) => {
                    self.reached.insert(name.clone());
                }
                None => self
                    .diag
                    .trace(format_args!("dynCall target '{}' is not an export", target)),
            }
            return false;
        }
        match node {
            Node::Identifier { name } => {
                if let Some(graph_name) = self.registry.names.get(name.as_str()) {
                    self.reached.insert(graph_name.clone());
                }
                true
            }
            Node::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                recursive(object, self);
                if *computed {
                    recursive(property, self);
                }
                true
            }
            Node::Property {
                key,
                value,
                computed,
                ..
            }
            | Node::MethodDefinition {
                key,
                value,
                computed,
                ..
            } => {
                if *computed {
                    recursive(key, self);
                }
                recursive(value, self);
                true
            }
            Node::PropertyDefinition {
                key,
                value,
                computed,
                ..
            } => {
                if *computed {
                    recursive(key, self);
                }
                if let Some(value) = value {
                    recursive(value, self);
                }
                true
            }
            Node::ImportDeclaration { .. } | Node::ExportAllDeclaration { .. } => true,
            _ => false,
        }
    }
}

// ============================================================================
// Graph emission
// ============================================================================

struct Harvest {
    found_imports: bool,
    /// Import key and the JS binding its value names
    imports: Vec<(String, Option<String>)>,
    exports: Vec<ExportMatch>,
    minimal_runtime: bool,
}

fn callback_statements_mut(node: &mut Node) -> Option<&mut Vec<Node>> {
    match node {
        Node::ArrowFunctionExpression { body, .. } | Node::FunctionExpression { body, .. } => {
            match &mut **body {
                Node::BlockStatement { body } => Some(body),
                _ => None,
            }
        }
        _ => None,
    }
}

fn import_target(key: &str, value: &Node) -> Result<Option<String>> {
    let value = match value {
        Node::LogicalExpression { left, .. } => &**left,
        other => other,
    };
    match value {
        Node::Literal { .. } | Node::FunctionExpression { .. } | Node::ArrowFunctionExpression { .. } => {
            Ok(None)
        }
        Node::Identifier { name } => Ok(Some(name.clone())),
        other => bail!(
            "Unsupported wasmImports value for '{}': {} ({})",
            key,
            other.node_type(),
            other
        ),
    }
}

impl Harvest {
    /// Record and neutralize one recognized pattern
    fn visit(&mut self, node: &mut Node) -> Result<()> {
        if let Some(properties) = imports_properties(node) {
            self.found_imports = true;
            for property in properties {
                let Node::Property { key, value, .. } = property else {
                    bail!("Unsupported wasmImports entry: {}", property.node_type());
                };
                let key = property_key_name(key)
                    .with_context(|| format!("Unsupported wasmImports key: {}", key))?;
                self.imports
                    .push((key.to_string(), import_target(key, value)?));
            }
            node.empty_out();
            return Ok(());
        }
        if let Some(export) = match_export_declaration(node) {
            self.exports.push(export);
            node.empty_out();
            return Ok(());
        }
        if is_module_number_export(node) || is_bare_declaration(node) || is_export_assignment(node)
        {
            node.empty_out();
            return Ok(());
        }
        if let Some(exports) = minimal_runtime_exports(node) {
            ensure!(
                !self.minimal_runtime,
                "Found more than one minimal runtime export block"
            );
            self.minimal_runtime = true;
            if let Some(statements) = callback_statements_mut(node) {
                for (index, export) in exports {
                    if let Some(stmt) = statements.get_mut(index) {
                        stmt.empty_out();
                    }
                    self.exports.push(export);
                }
            }
        }
        Ok(())
    }
}

/// Build the reachability graph of `program`
///
/// The program is consumed in the process: recognized patterns are emptied
/// and toplevel functions are taken out. Callers print the graph, not the
/// AST, after this pass.
pub fn emit_dce_graph(
    program: &mut Node,
    extra_info: Option<&ExtraInfo>,
    diag: &Diagnostics,
) -> Result<Graph> {
    let mut harvest = Harvest {
        found_imports: false,
        imports: Vec::new(),
        exports: Vec::new(),
        minimal_runtime: false,
    };
    try_full(program, &mut |node| harvest.visit(node))?;
    ensure!(
        harvest.found_imports,
        "Could not find the wasmImports assignment"
    );
    if let Some(extra_info) = extra_info {
        for (js_name, binary_name) in &extra_info.exports {
            harvest.exports.push(ExportMatch {
                js_name: js_name.clone(),
                binary_name: binary_name.clone(),
            });
        }
    }

    let mut defuns = Vec::new();
    for stmt in program.program_body_mut()?.iter_mut() {
        let name = match &*stmt {
            Node::FunctionDeclaration { id: Some(id), .. } => id.identifier_name().map(String::from),
            _ => None,
        };
        if let Some(name) = name {
            defuns.push((name, std::mem::replace(stmt, Node::empty())));
        }
    }

    let mut registry = Registry::default();
    for (key, _) in &harvest.imports {
        registry.add_import(key);
    }
    for export in &harvest.exports {
        registry.add_export(export);
    }
    let defun_names: Vec<String> = defuns
        .iter()
        .map(|(name, _)| registry.add_defun(name))
        .collect();

    // Edges
    let mut edges: Vec<(String, BTreeSet<String>)> = Vec::new();
    for (key, target) in &harvest.imports {
        let Some(target) = target else { continue };
        match registry.names.get(target) {
            Some(name) => edges.push((
                format!("{}{}", IMPORT_PREFIX, key),
                BTreeSet::from([name.clone()]),
            )),
            None => diag.trace(format_args!(
                "import '{}' refers to '{}', which is not a graph node",
                key, target
            )),
        }
    }
    for ((_, defun), graph_name) in defuns.iter_mut().zip(&defun_names) {
        let mut references = References {
            registry: &registry,
            diag,
            reached: BTreeSet::new(),
        };
        if let Node::FunctionDeclaration { params, body, .. } = defun {
            for param in params.iter_mut() {
                recursive(param, &mut references);
            }
            recursive(body, &mut references);
        }
        edges.push((graph_name.clone(), references.reached));
    }

    let mut toplevel = References {
        registry: &registry,
        diag,
        reached: BTreeSet::new(),
    };
    descend(program, &mut toplevel);
    let roots = toplevel.reached;

    let mut graph = registry.graph;
    for (from, reaches) in edges {
        if let Some(node) = graph.node_mut(&from) {
            node.reaches.extend(reaches);
        }
    }
    for root in &roots {
        if let Some(node) = graph.node_mut(root) {
            node.root = true;
        }
    }
    debug!(
        nodes = graph.len(),
        roots = roots.len(),
        "reachability graph built"
    );
    Ok(graph)
}

// ============================================================================
// Pruning
// ============================================================================

/// What [`apply_dce_graph_removals`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalStats {
    /// Import properties deleted
    pub imports_removed: usize,
    /// Export bindings replaced with `undefined`
    pub exports_removed: usize,
}

impl RemovalStats {
    pub fn total(&self) -> usize {
        self.imports_removed + self.exports_removed
    }
}

fn declarator_init_mut(node: &mut Node) -> Option<&mut Option<Box<Node>>> {
    match node {
        Node::VariableDeclaration { declarations, .. } if declarations.len() == 1 => {
            match &mut declarations[0] {
                Node::VariableDeclarator { init, .. } => Some(init),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Remove what the graph reducer reported as `unused`
///
/// Import properties are deleted when their value has no side effects.
/// Export bindings keep their declaration and get `undefined` as their value.
pub fn apply_dce_graph_removals(
    program: &mut Node,
    unused: &BTreeSet<String>,
    diag: &mut Diagnostics,
) -> Result<RemovalStats> {
    program.program_body_mut()?;
    let mut stats = RemovalStats::default();
    let mut found: HashSet<String> = HashSet::new();

    full(program, &mut |node| {
        if let Some(properties) = imports_properties_mut(node) {
            properties.retain_mut(|property| {
                let Node::Property { key, value, .. } = property else {
                    return true;
                };
                let Some(key) = property_key_name(key) else {
                    return true;
                };
                let name = format!("{}{}", IMPORT_PREFIX, key);
                if !unused.contains(&name) {
                    return true;
                }
                found.insert(name);
                if has_side_effects(value) {
                    return true;
                }
                stats.imports_removed += 1;
                false
            });
            return;
        }
        if let Some(export) = match_export_declaration(node) {
            let name = format!("{}{}", EXPORT_PREFIX, export.js_name);
            if unused.contains(&name) {
                if let Some(init) = declarator_init_mut(node) {
                    *init = Some(Box::new(build::undefined()));
                    stats.exports_removed += 1;
                }
                found.insert(name);
            }
            return;
        }
        if let Some(exports) = minimal_runtime_exports(node) {
            let Some(statements) = callback_statements_mut(node) else {
                return;
            };
            for (index, export) in exports {
                let name = format!("{}{}", EXPORT_PREFIX, export.js_name);
                if !unused.contains(&name) {
                    continue;
                }
                if let Some(Node::ExpressionStatement { expression, .. }) = statements.get_mut(index)
                {
                    if let Node::AssignmentExpression { right, .. } = &mut **expression {
                        **right = build::undefined();
                        stats.exports_removed += 1;
                    }
                }
                found.insert(name);
            }
        }
    });

    for name in unused {
        let prunable = name.starts_with(IMPORT_PREFIX) || name.starts_with(EXPORT_PREFIX);
        if prunable && !found.contains(name) {
            diag.warn_once(format!("Unused graph node '{}' not found in the glue code", name));
        }
    }
    debug!(
        imports = stats.imports_removed,
        exports = stats.exports_removed,
        "applied graph removals"
    );
    Ok(stats)
}
