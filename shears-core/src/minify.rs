//! Identifier Minification
//!
//! Two strategies sharing one deterministic name generator:
//!
//! - [`minify_locals`]: per toplevel function, rename parameters and locals
//!   to short names while globals take their names from an external table
//! - [`minify_globals`]: rename every declared name inside one wrapper
//!   function and report the table used
//!
//! Allocation order is fixed (parameters first, then locals by first
//! occurrence), so the same input always produces the same output.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::walk::{pattern_names, recursive, simple, Recursive};
use crate::{Node, NodeType};

// ============================================================================
// Name generation
// ============================================================================

/// Characters allowed first in a generated name
const INITIAL: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$";
/// Characters allowed after the first
const LATER: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$0123456789";

/// Names the generator never produces
pub const RESERVED: &[&str] = &[
    "do", "if", "in", "of", "env", "for", "let", "new", "try", "var", "NaN", "case", "else",
    "enum", "eval", "null", "this", "true", "void", "with", "await", "break", "catch", "class",
    "const", "false", "super", "throw", "while", "yield", "delete", "export", "import",
    "public", "return", "static", "switch", "typeof", "default", "extends", "finally", "package",
    "private", "continue", "debugger", "function", "Infinity", "arguments", "interface",
    "protected", "undefined", "implements", "instanceof",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Deterministic enumeration of short identifiers
///
/// Position 0 advances fastest: `a`, `b`, ... `$`, `aa`, `ba`, ... Generated
/// names are cached, so index `i` always yields the same name.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    state: Vec<usize>,
    names: Vec<String>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        Self {
            state: vec![0],
            names: Vec::new(),
        }
    }

    /// The `index`-th generated name
    pub fn get(&mut self, index: usize) -> &str {
        while self.names.len() <= index {
            self.advance();
        }
        &self.names[index]
    }

    fn advance(&mut self) {
        let mut name = String::with_capacity(self.state.len());
        name.push(INITIAL[self.state[0]] as char);
        for &digit in &self.state[1..] {
            name.push(LATER[digit] as char);
        }
        if !is_reserved(&name) {
            self.names.push(name);
        }

        let mut i = 0;
        loop {
            self.state[i] += 1;
            let limit = if i == 0 { INITIAL.len() } else { LATER.len() };
            if self.state[i] < limit {
                break;
            }
            self.state[i] = 0;
            i += 1;
            if i == self.state.len() {
                self.state.push(0);
                break;
            }
        }
    }
}

/// A cursor over a [`NameGenerator`] handing out names not yet taken
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    cursor: usize,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Next generated name for which `is_taken` is false
    pub fn next_free(
        &mut self,
        generator: &mut NameGenerator,
        is_taken: impl Fn(&str) -> bool,
    ) -> String {
        loop {
            let name = generator.get(self.cursor);
            self.cursor += 1;
            if !is_taken(name) {
                return name.to_string();
            }
        }
    }
}

// ============================================================================
// Reference walking
// ============================================================================

/// Receives every identifier in binding or reference position
///
/// Non-computed member properties, non-computed object keys and meta
/// properties are not references and are never reported.
pub trait IdentifierVisitor {
    fn identifier(&mut self, name: &mut String);

    /// A label definition or a `break`/`continue` target
    fn label(&mut self, _name: &mut String) {}
}

struct ReferenceWalk<'v, V: ?Sized> {
    visitor: &'v mut V,
}

impl<V: IdentifierVisitor + ?Sized> ReferenceWalk<'_, V> {
    fn label(&mut self, label: &mut Node) {
        if let Node::Identifier { name } = label {
            self.visitor.label(name);
        }
    }
}

impl<V: IdentifierVisitor + ?Sized> Recursive for ReferenceWalk<'_, V> {
    fn handle(&mut self, node: &mut Node) -> bool {
        match node {
            Node::Identifier { name } => {
                self.visitor.identifier(name);
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
                shorthand,
                ..
            } => {
                if *computed {
                    recursive(key, self);
                }
                recursive(value, self);
                if *shorthand {
                    let bound = match &**value {
                        Node::AssignmentPattern { left, .. } => left.identifier_name(),
                        other => other.identifier_name(),
                    };
                    if bound != key.identifier_name() {
                        *shorthand = false;
                    }
                }
                true
            }
            Node::MethodDefinition {
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
            Node::MetaProperty { .. } | Node::ExportAllDeclaration { .. } => true,
            Node::LabeledStatement { label, body } => {
                self.label(label);
                recursive(body, self);
                true
            }
            Node::BreakStatement { label } | Node::ContinueStatement { label } => {
                if let Some(label) = label {
                    self.label(label);
                }
                true
            }
            Node::ExportSpecifier { local, .. } | Node::ImportSpecifier { local, .. } => {
                recursive(local, self);
                true
            }
            _ => false,
        }
    }
}

/// Report every identifier reference under `node` to `visitor`
pub fn visit_references<V: IdentifierVisitor + ?Sized>(node: &mut Node, visitor: &mut V) {
    recursive(node, &mut ReferenceWalk { visitor });
}

// ============================================================================
// Local minification
// ============================================================================

/// Free names of a function: mapped globals are renamed, the rest are taken
struct FreeNames<'a> {
    locals: &'a HashSet<String>,
    globals: &'a BTreeMap<String, String>,
    renames: HashMap<String, String>,
    taken: HashSet<String>,
}

impl IdentifierVisitor for FreeNames<'_> {
    fn identifier(&mut self, name: &mut String) {
        if self.locals.contains(name.as_str()) {
            return;
        }
        match self.globals.get(name.as_str()) {
            Some(minified) => {
                self.renames.insert(name.clone(), minified.clone());
                self.taken.insert(minified.clone());
            }
            None => {
                self.taken.insert(name.clone());
            }
        }
    }
}

struct LocalRenamer<'a> {
    locals: &'a HashSet<String>,
    generator: &'a mut NameGenerator,
    renames: HashMap<String, String>,
    taken: HashSet<String>,
    names: NameAllocator,
    labels: HashMap<String, String>,
    label_names: NameAllocator,
    renamed: usize,
}

impl LocalRenamer<'_> {
    fn allocate(&mut self, name: &str) -> String {
        let minified = self
            .names
            .next_free(self.generator, |n| self.taken.contains(n));
        self.taken.insert(minified.clone());
        self.renames.insert(name.to_string(), minified.clone());
        self.renamed += 1;
        minified
    }
}

impl IdentifierVisitor for LocalRenamer<'_> {
    fn identifier(&mut self, name: &mut String) {
        if let Some(minified) = self.renames.get(name.as_str()) {
            *name = minified.clone();
        } else if self.locals.contains(name.as_str()) {
            *name = self.allocate(name);
        }
    }

    fn label(&mut self, name: &mut String) {
        let minified = match self.labels.get(name.as_str()) {
            Some(minified) => minified.clone(),
            None => {
                let minified = self.label_names.next_free(self.generator, |_| false);
                self.labels.insert(name.clone(), minified.clone());
                self.renamed += 1;
                minified
            }
        };
        *name = minified;
    }
}

fn minify_function(
    function: &mut Node,
    globals: &BTreeMap<String, String>,
    generator: &mut NameGenerator,
) -> Result<usize> {
    let Node::FunctionDeclaration {
        id, params, body, ..
    } = function
    else {
        return Ok(0);
    };
    let Some(own_name) = id
        .as_ref()
        .and_then(|id| id.identifier_name())
        .map(String::from)
    else {
        bail!("Cannot minify locals of an anonymous toplevel function");
    };

    let mut param_names = Vec::new();
    for param in params.iter() {
        pattern_names(param, &mut param_names);
    }
    let mut locals: HashSet<String> = param_names.iter().cloned().collect();
    simple(body, &[NodeType::VariableDeclarator], &mut |node| {
        if let Node::VariableDeclarator { id, .. } = node {
            let mut bound = Vec::new();
            pattern_names(id, &mut bound);
            locals.extend(bound);
        }
    });

    // Globals keep their externally assigned names; reserve those first
    let mut free = FreeNames {
        locals: &locals,
        globals,
        renames: HashMap::new(),
        taken: HashSet::new(),
    };
    for param in params.iter_mut() {
        visit_references(param, &mut free);
    }
    visit_references(body, &mut free);

    let mut renamer = LocalRenamer {
        locals: &locals,
        generator,
        renames: free.renames,
        taken: free.taken,
        names: NameAllocator::new(),
        labels: HashMap::new(),
        label_names: NameAllocator::new(),
        renamed: 0,
    };
    for name in &param_names {
        if !renamer.renames.contains_key(name) {
            renamer.allocate(name);
        }
    }
    for param in params.iter_mut() {
        visit_references(param, &mut renamer);
    }
    visit_references(body, &mut renamer);
    let renamed = renamer.renamed;

    let Some(minified) = globals.get(&own_name) else {
        bail!(
            "Function '{}' has no entry in the globals mapping",
            own_name
        );
    };
    *id = Some(Box::new(crate::build::ident(minified)));
    Ok(renamed)
}

/// Minify parameters, locals and labels of every toplevel function
///
/// `globals` maps global names to the minified names a previous
/// [`minify_globals`] run assigned. Every toplevel function name must be in
/// it. Returns the number of bindings renamed.
pub fn minify_locals(program: &mut Node, globals: &BTreeMap<String, String>) -> Result<usize> {
    let mut generator = NameGenerator::new();
    let mut renamed = 0;
    for stmt in program.program_body_mut()?.iter_mut() {
        if matches!(stmt, Node::FunctionDeclaration { .. }) {
            renamed += minify_function(stmt, globals, &mut generator)?;
        }
    }
    debug!(renamed, "minified locals");
    Ok(renamed)
}

// ============================================================================
// Whole-program minification
// ============================================================================

/// Declared names under `node`, pre-order, duplicates included
fn collect_declarations(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::FunctionDeclaration { id, params, .. } | Node::FunctionExpression { id, params, .. } => {
            if let Some(name) = id.as_ref().and_then(|id| id.identifier_name()) {
                out.push(name.to_string());
            }
            for param in params {
                pattern_names(param, out);
            }
        }
        Node::ArrowFunctionExpression { params, .. } => {
            for param in params {
                pattern_names(param, out);
            }
        }
        Node::VariableDeclarator { id, .. } => pattern_names(id, out),
        Node::CatchClause {
            param: Some(param), ..
        } => pattern_names(param, out),
        Node::ClassDeclaration { id: Some(id), .. } => {
            if let Some(name) = id.identifier_name() {
                out.push(name.to_string());
            }
        }
        _ => {}
    }
    if !node.is_empty() {
        node.for_each_child(&mut |child| collect_declarations(child, out));
    }
}

struct Unrenamed<'a> {
    renamed: &'a HashSet<String>,
    taken: HashSet<String>,
}

impl IdentifierVisitor for Unrenamed<'_> {
    fn identifier(&mut self, name: &mut String) {
        if !self.renamed.contains(name.as_str()) {
            self.taken.insert(name.clone());
        }
    }
}

struct GlobalRenamer<'a> {
    mapping: &'a BTreeMap<String, String>,
}

impl IdentifierVisitor for GlobalRenamer<'_> {
    fn identifier(&mut self, name: &mut String) {
        if let Some(minified) = self.mapping.get(name.as_str()) {
            *name = minified.clone();
        }
    }
}

/// Minify every declared name inside the toplevel function `wrapper`
///
/// Names are assigned to declared names first (in declaration order) and
/// then to `known_globals`, which need not be declared. The wrapper's own
/// name is left alone. Returns the original-to-minified table.
pub fn minify_globals(
    program: &mut Node,
    wrapper: &str,
    known_globals: &[String],
) -> Result<BTreeMap<String, String>> {
    let function = program
        .program_body_mut()?
        .iter_mut()
        .find(|stmt| {
            matches!(
                stmt,
                Node::FunctionDeclaration { id: Some(id), .. } if id.is_identifier(wrapper)
            )
        })
        .with_context(|| format!("Could not find the '{}' function to minify", wrapper))?;
    let Node::FunctionDeclaration { params, body, .. } = function else {
        bail!("'{}' is not a function declaration", wrapper);
    };

    let mut declared = Vec::new();
    for param in params.iter() {
        pattern_names(param, &mut declared);
    }
    collect_declarations(body, &mut declared);

    let mut order = Vec::new();
    let mut renamed: HashSet<String> = HashSet::new();
    for name in declared.into_iter().chain(known_globals.iter().cloned()) {
        if name != wrapper && renamed.insert(name.clone()) {
            order.push(name);
        }
    }

    let mut unrenamed = Unrenamed {
        renamed: &renamed,
        taken: HashSet::new(),
    };
    for param in params.iter_mut() {
        visit_references(param, &mut unrenamed);
    }
    visit_references(body, &mut unrenamed);
    let mut taken = unrenamed.taken;
    taken.insert(wrapper.to_string());

    let mut generator = NameGenerator::new();
    let mut allocator = NameAllocator::new();
    let mut mapping = BTreeMap::new();
    for name in order {
        let minified = allocator.next_free(&mut generator, |n| taken.contains(n));
        mapping.insert(name, minified);
    }

    let mut renamer = GlobalRenamer { mapping: &mapping };
    for param in params.iter_mut() {
        visit_references(param, &mut renamer);
    }
    visit_references(body, &mut renamer);
    debug!(names = mapping.len(), wrapper, "minified globals");
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    #[test]
    fn test_generator_sequence() {
        let mut generator = NameGenerator::new();
        assert_eq!(generator.get(0), "a");
        assert_eq!(generator.get(25), "z");
        assert_eq!(generator.get(26), "A");
        assert_eq!(generator.get(52), "_");
        assert_eq!(generator.get(53), "$");
        assert_eq!(generator.get(54), "aa");
        assert_eq!(generator.get(55), "ba");
    }

    #[test]
    fn test_generator_skips_reserved() {
        let mut generator = NameGenerator::new();
        let names: Vec<String> = (0..4000).map(|i| generator.get(i).to_string()).collect();
        assert!(!names.iter().any(|n| n == "do" || n == "if" || n == "in"));
        assert!(names.iter().any(|n| n == "ab"));
    }

    #[test]
    fn test_allocator_skips_taken() {
        let mut generator = NameGenerator::new();
        let mut allocator = NameAllocator::new();
        let taken: HashSet<&str> = ["a", "c"].into_iter().collect();
        assert_eq!(allocator.next_free(&mut generator, |n| taken.contains(n)), "b");
        assert_eq!(allocator.next_free(&mut generator, |n| taken.contains(n)), "d");
    }

    #[test]
    fn test_minify_locals_params_first() {
        let mut node = program(vec![function(
            "compute",
            &["left", "right"],
            vec![
                var("total", Some(binary("+", ident("left"), ident("right")))),
                ret(Some(call(ident("helper"), vec![ident("total")]))),
            ],
        )]);
        let globals = BTreeMap::from([
            ("compute".to_string(), "c".to_string()),
            ("helper".to_string(), "a".to_string()),
        ]);
        let renamed = minify_locals(&mut node, &globals).unwrap();
        assert_eq!(renamed, 3);
        // `a` is taken by helper; the function's own name is not referenced
        assert_eq!(
            node.to_string(),
            "function c(b, c) { var d = b + c; return a(d); }"
        );
    }

    #[test]
    fn test_minify_locals_requires_mapping_for_function_name() {
        let mut node = program(vec![function("unmapped", &[], vec![])]);
        let err = minify_locals(&mut node, &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("unmapped"));
    }

    #[test]
    fn test_minify_locals_avoids_free_names() {
        let mut node = program(vec![function(
            "f",
            &["value"],
            vec![ret(Some(call(member(ident("a"), "abs"), vec![ident("value")])))],
        )]);
        let globals = BTreeMap::from([("f".to_string(), "x".to_string())]);
        minify_locals(&mut node, &globals).unwrap();
        assert_eq!(node.to_string(), "function x(b) { return a.abs(b); }");
    }

    #[test]
    fn test_minify_locals_labels_have_own_namespace() {
        let mut node = program(vec![function(
            "f",
            &["n"],
            vec![labeled(
                "outer",
                for_stmt(None, None, None, block(vec![break_stmt(Some("outer"))])),
            )],
        )]);
        let globals = BTreeMap::from([("f".to_string(), "f".to_string())]);
        minify_locals(&mut node, &globals).unwrap();
        assert_eq!(node.to_string(), "function f(a) { a: for (;;) { break a; } }");
    }

    #[test]
    fn test_minify_globals_declared_before_known() {
        let mut node = program(vec![function(
            "instantiate",
            &["imports"],
            vec![
                var("memory", Some(member(ident("imports"), "memory"))),
                function(
                    "store",
                    &["ptr"],
                    vec![expr_stmt(assign(
                        index(ident("HEAP8"), ident("ptr")),
                        ident("memory"),
                    ))],
                ),
                ret(Some(ident("store"))),
            ],
        )]);
        let mapping = minify_globals(&mut node, "instantiate", &["HEAP8".to_string()]).unwrap();
        assert_eq!(mapping["imports"], "a");
        assert_eq!(mapping["memory"], "b");
        assert_eq!(mapping["store"], "c");
        assert_eq!(mapping["ptr"], "d");
        assert_eq!(mapping["HEAP8"], "e");
        assert_eq!(
            node.to_string(),
            "function instantiate(a) { var b = a.memory; function c(d) { e[d] = b; } return c; }"
        );
    }

    #[test]
    fn test_minify_globals_keeps_object_keys() {
        let mut node = program(vec![function(
            "instantiate",
            &[],
            vec![
                var("table", Some(num(0.0))),
                ret(Some(object(vec![Node::Property {
                    key: Box::new(ident("table")),
                    value: Box::new(ident("table")),
                    kind: "init".to_string(),
                    computed: false,
                    method: false,
                    shorthand: true,
                }]))),
            ],
        )]);
        minify_globals(&mut node, "instantiate", &[]).unwrap();
        assert_eq!(
            node.to_string(),
            "function instantiate() { var a = 0; return { table: a }; }"
        );
    }

    #[test]
    fn test_minify_globals_missing_wrapper() {
        let mut node = program(vec![]);
        assert!(minify_globals(&mut node, "instantiate", &[]).is_err());
    }
}
