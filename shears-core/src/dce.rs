//! Local Dead Code Elimination
//!
//! Scope-stack liveness over lexical function scopes, followed by a cleanup
//! that drops what nobody reads.
//!
//! ## Liveness
//!
//! One scope per function plus the toplevel. Every identifier reference marks
//! a use in the innermost scope; declarators and parameters mark definitions,
//! and parameters are never eliminable. When a function scope is popped:
//!
//! - used but not defined: the use belongs to an enclosing scope
//! - defined, never used, not a parameter: eliminable in this scope
//!
//! A named function ignores its own name inside its own scope, so
//! self-recursion does not keep a function alive.
//!
//! ## Cleanup
//!
//! Runs per scope on the eliminable names and never enters nested functions.
//! Cascades across scopes (a function kept alive only by a dead caller) are
//! resolved by running the whole pass again, which is what
//! [`DceMode::Aggressive`] does until an iteration removes nothing.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, ensure, Result};
use tracing::debug;

use crate::effects::has_side_effects;
use crate::walk::{pattern_names, recursive, repair_loop_headers, walk_pattern, Recursive};
use crate::{build, LiteralValue, Node, Stash};

/// How many times to run the elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DceMode {
    /// One liveness + cleanup iteration
    SingleShot,
    /// Iterate until an iteration removes nothing; also turns pure
    /// expression statements into `null;`
    Aggressive,
}

/// Statistics about dead code elimination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DceStats {
    /// Number of full-program iterations run
    pub iterations: usize,
    /// Declarations, functions and statements removed, net of restored
    /// loop headers
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Binding {
    def: bool,
    used: bool,
    param: bool,
}

type Scope = HashMap<String, Binding>;

fn eliminable(scope: &Scope) -> HashSet<String> {
    scope
        .iter()
        .filter(|(_, b)| b.def && !b.used && !b.param)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Run dead code elimination over a `Program`
pub fn eliminate_dead_code(program: &mut Node, mode: DceMode) -> Result<DceStats> {
    ensure!(
        matches!(program, Node::Program { .. }),
        "dead code elimination expects a Program, found {}",
        program.node_type()
    );

    let aggressive = mode == DceMode::Aggressive;
    let mut stats = DceStats::default();
    loop {
        let removed = run_iteration(program, aggressive)?;
        stats.iterations += 1;
        stats.removed += removed;
        debug!(iteration = stats.iterations, removed, "dce iteration");
        if removed == 0 || !aggressive {
            break;
        }
    }
    Ok(stats)
}

fn run_iteration(program: &mut Node, aggressive: bool) -> Result<usize> {
    let mut liveness = Liveness {
        toplevel: Scope::new(),
        functions: Vec::new(),
        aggressive,
        removed: 0,
        failure: None,
    };
    recursive(program, &mut liveness);
    if let Some(e) = liveness.failure {
        return Err(e);
    }
    ensure!(
        liveness.functions.is_empty(),
        "{} function scope(s) left open after liveness walk",
        liveness.functions.len()
    );

    let names = eliminable(&liveness.toplevel);
    let mut removed = liveness.removed;
    if aggressive || !names.is_empty() {
        let mut cleanup = Cleanup {
            names: &names,
            aggressive,
            removed: 0,
        };
        recursive(program, &mut cleanup);
        removed += cleanup.removed;
    }

    let restored = repair_loop_headers(program)?;
    Ok(removed.saturating_sub(restored))
}

// ============================================================================
// Liveness
// ============================================================================

struct Liveness {
    toplevel: Scope,
    functions: Vec<Scope>,
    aggressive: bool,
    removed: usize,
    failure: Option<anyhow::Error>,
}

impl Liveness {
    fn current(&mut self) -> &mut Scope {
        self.functions.last_mut().unwrap_or(&mut self.toplevel)
    }

    fn define(&mut self, name: &str) {
        self.current().entry(name.to_string()).or_default().def = true;
    }

    fn use_name(&mut self, name: &str) {
        self.current().entry(name.to_string()).or_default().used = true;
    }

    fn handle_function(&mut self, node: &mut Node) {
        let (own_name, params, body) = match node {
            Node::FunctionDeclaration {
                id, params, body, ..
            } => {
                let own_name = id.as_ref().and_then(|id| id.identifier_name()).map(String::from);
                if let Some(name) = &own_name {
                    self.define(name);
                }
                (own_name, params, body)
            }
            Node::FunctionExpression {
                id, params, body, ..
            } => {
                let own_name = id.as_ref().and_then(|id| id.identifier_name()).map(String::from);
                (own_name, params, body)
            }
            Node::ArrowFunctionExpression { params, body, .. } => (None, params, body),
            _ => return,
        };

        self.functions.push(Scope::new());
        for param in params.iter_mut() {
            let mut defaults = Vec::new();
            let mut bound = Vec::new();
            walk_pattern(param, &mut defaults, &mut bound);
            for name in bound {
                let binding = self.current().entry(name).or_default();
                binding.def = true;
                binding.param = true;
            }
            for default in defaults {
                recursive(default, self);
            }
        }
        recursive(body, self);

        let Some(scope) = self.functions.pop() else {
            self.failure
                .get_or_insert_with(|| anyhow!("scope stack underflow leaving a function"));
            return;
        };
        for (name, binding) in &scope {
            if own_name.as_deref() == Some(name.as_str()) && !binding.def {
                continue;
            }
            if binding.used && !binding.def {
                self.use_name(name);
            }
        }

        let names = eliminable(&scope);
        if names.is_empty() && !self.aggressive {
            return;
        }
        let mut cleanup = Cleanup {
            names: &names,
            aggressive: self.aggressive,
            removed: 0,
        };
        recursive(body, &mut cleanup);
        self.removed += cleanup.removed;
    }

    /// Names a declaration introduces, for `export` handling
    fn declared_names(declaration: &Node) -> Vec<String> {
        let mut names = Vec::new();
        match declaration {
            Node::FunctionDeclaration { id: Some(id), .. }
            | Node::ClassDeclaration { id: Some(id), .. } => {
                if let Some(name) = id.identifier_name() {
                    names.push(name.to_string());
                }
            }
            Node::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    if let Node::VariableDeclarator { id, .. } = declarator {
                        pattern_names(id, &mut names);
                    }
                }
            }
            _ => {}
        }
        names
    }
}

impl Recursive for Liveness {
    fn handle(&mut self, node: &mut Node) -> bool {
        match node {
            Node::Identifier { name } => {
                self.use_name(name);
                true
            }
            Node::VariableDeclarator { id, init } => {
                let mut exprs = Vec::new();
                let mut bound = Vec::new();
                walk_pattern(id, &mut exprs, &mut bound);
                for name in &bound {
                    self.define(name);
                }
                for expr in exprs {
                    recursive(expr, self);
                }
                if let Some(init) = init {
                    recursive(init, self);
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
            Node::LabeledStatement { body, .. } => {
                recursive(body, self);
                true
            }
            Node::BreakStatement { .. }
            | Node::ContinueStatement { .. }
            | Node::MetaProperty { .. }
            | Node::ImportDeclaration { .. }
            | Node::ExportAllDeclaration { .. } => true,
            Node::FunctionDeclaration { .. }
            | Node::FunctionExpression { .. }
            | Node::ArrowFunctionExpression { .. } => {
                self.handle_function(node);
                true
            }
            Node::ExportNamedDeclaration {
                declaration,
                specifiers,
                ..
            } => {
                if let Some(declaration) = declaration {
                    recursive(declaration, self);
                    for name in Self::declared_names(declaration) {
                        self.use_name(&name);
                    }
                }
                for specifier in specifiers {
                    if let Node::ExportSpecifier { local, .. } = specifier {
                        recursive(local, self);
                    }
                }
                true
            }
            Node::ExportDefaultDeclaration { declaration } => {
                recursive(declaration, self);
                for name in Self::declared_names(declaration) {
                    self.use_name(&name);
                }
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Cleanup
// ============================================================================

struct Cleanup<'a> {
    names: &'a HashSet<String>,
    aggressive: bool,
    removed: usize,
}

impl Cleanup<'_> {
    fn prune_declaration(&mut self, node: &mut Node) {
        let Node::VariableDeclaration { declarations, .. } = node else {
            return;
        };
        let names = self.names;
        let keep: Vec<bool> = declarations
            .iter_mut()
            .map(|declarator| match declarator {
                Node::VariableDeclarator { id, init } => match id.identifier_name() {
                    Some(name) if names.contains(name) => {
                        init.as_mut().is_some_and(|init| has_side_effects(init))
                    }
                    _ => true,
                },
                _ => true,
            })
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }

        self.removed += 1;
        if keep.iter().all(|k| !*k) {
            let original = std::mem::replace(node, Node::empty());
            *node = Node::EmptyStatement {
                stash: Some(Stash::Declaration(Box::new(original))),
            };
            return;
        }
        let mut keep = keep.into_iter();
        declarations.retain(|_| keep.next().unwrap_or(true));
    }

    fn is_removable_statement(expression: &mut Node) -> bool {
        let is_null = matches!(
            expression,
            Node::Literal {
                value: LiteralValue::Null,
                ..
            }
        );
        !is_null && expression.string_literal() != Some("use strict") && !has_side_effects(expression)
    }
}

impl Recursive for Cleanup<'_> {
    fn handle(&mut self, node: &mut Node) -> bool {
        match node {
            Node::VariableDeclaration { .. } => {
                self.prune_declaration(node);
                true
            }
            Node::FunctionDeclaration { id, .. } => {
                let dead = id
                    .as_ref()
                    .and_then(|id| id.identifier_name())
                    .is_some_and(|name| self.names.contains(name));
                if dead {
                    node.empty_out();
                    self.removed += 1;
                }
                true
            }
            Node::FunctionExpression { .. } | Node::ArrowFunctionExpression { .. } => true,
            Node::ExpressionStatement {
                expression,
                directive,
            } => {
                if self.aggressive && directive.is_none() && Self::is_removable_statement(expression)
                {
                    **expression = build::null();
                    self.removed += 1;
                }
                true
            }
            _ => false,
        }
    }
}
