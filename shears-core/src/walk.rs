//! Tree Walk Kernel
//!
//! Traversal strategies shared by every pass:
//!
//! - [`simple`]: post-order, handler invoked only for the listed node types
//! - [`full`]: post-order, one function for every node
//! - [`recursive`]: the visitor takes full control of each node it handles and
//!   decides itself whether (and where) to descend
//!
//! None of them descend into [`Node::EmptyStatement`]: a neutralized slot is
//! opaque, whatever it stashes.
//!
//! The module also carries the two scope-hiding utilities and the loop-header
//! repair used after dead code elimination.

use anyhow::{bail, Result};

use crate::{Node, NodeType, Stash};

// ============================================================================
// Traversal strategies
// ============================================================================

/// Post-order walk invoking `handler` on nodes whose type is in `types`
pub fn simple(node: &mut Node, types: &[NodeType], handler: &mut dyn FnMut(&mut Node)) {
    if node.is_empty() {
        if types.contains(&NodeType::EmptyStatement) {
            handler(node);
        }
        return;
    }
    node.for_each_child_mut(&mut |child| simple(child, types, handler));
    if types.contains(&node.node_type()) {
        handler(node);
    }
}

/// Post-order walk invoking `f` on every node
pub fn full(node: &mut Node, f: &mut dyn FnMut(&mut Node)) {
    if !node.is_empty() {
        node.for_each_child_mut(&mut |child| full(child, f));
    }
    f(node);
}

/// Read-only [`full`]
pub fn full_ref(node: &Node, f: &mut dyn FnMut(&Node)) {
    if !node.is_empty() {
        node.for_each_child(&mut |child| full_ref(child, f));
    }
    f(node);
}

/// Fallible [`full`]: stops at the first error
pub fn try_full(node: &mut Node, f: &mut dyn FnMut(&mut Node) -> Result<()>) -> Result<()> {
    if !node.is_empty() {
        let mut failure = None;
        node.for_each_child_mut(&mut |child| {
            if failure.is_none() {
                if let Err(e) = try_full(child, f) {
                    failure = Some(e);
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
    }
    f(node)
}

/// A visitor for [`recursive`] walks
pub trait Recursive {
    /// Handle `node`, returning `false` to let the kernel descend into it.
    ///
    /// A handler that returns `true` owns the subtree: it must call
    /// [`recursive`] or [`descend`] itself for any children it wants visited.
    fn handle(&mut self, node: &mut Node) -> bool;
}

/// Visit `node` with `visitor`, descending automatically where it declines
pub fn recursive<V: Recursive + ?Sized>(node: &mut Node, visitor: &mut V) {
    if node.is_empty() {
        return;
    }
    if !visitor.handle(node) {
        descend(node, visitor);
    }
}

/// Visit every direct child of `node` with `visitor`
pub fn descend<V: Recursive + ?Sized>(node: &mut Node, visitor: &mut V) {
    node.for_each_child_mut(&mut |child| recursive(child, visitor));
}

// ============================================================================
// Scope hiding
// ============================================================================

/// Stash every function-valued subtree below `node` inside an empty marker
///
/// Hiding runs post-order, so a hidden scope may itself contain hidden
/// scopes. [`restore_scopes`] undoes this completely.
pub fn hide_scopes(node: &mut Node) {
    node.for_each_child_mut(&mut |child| {
        full(child, &mut |n| {
            if n.is_function() {
                let hidden = std::mem::replace(n, Node::empty());
                *n = Node::EmptyStatement {
                    stash: Some(Stash::Scope(Box::new(hidden))),
                };
            }
        })
    });
}

/// Put back every subtree stashed by [`hide_scopes`]
pub fn restore_scopes(node: &mut Node) {
    if let Node::EmptyStatement { stash } = node {
        if let Some(Stash::Scope(_)) = stash {
            if let Some(Stash::Scope(hidden)) = stash.take() {
                *node = *hidden;
                restore_scopes(node);
            }
        }
        return;
    }
    node.for_each_child_mut(&mut |child| restore_scopes(child));
}

// ============================================================================
// Loop-header repair
// ============================================================================

fn restore_header(slot: &mut Node, loop_type: NodeType) -> Result<bool> {
    let Node::EmptyStatement { stash } = slot else {
        return Ok(false);
    };
    match stash.take() {
        Some(Stash::Declaration(original)) => {
            *slot = *original;
            Ok(true)
        }
        Some(other) => {
            *stash = Some(other);
            bail!("{} header was emptied without a declaration backup", loop_type)
        }
        None => bail!("{} header was emptied without a declaration backup", loop_type),
    }
}

/// Restore emptied `for` initializers and `for-in`/`for-of` left sides
///
/// Returns the number of headers restored. An emptied header without a
/// declaration stash means some pass broke the loop; that is fatal.
pub fn repair_loop_headers(node: &mut Node) -> Result<usize> {
    let mut restored = 0;
    try_full(node, &mut |n| {
        let loop_type = n.node_type();
        let header = match n {
            Node::ForStatement { init: Some(init), .. } => init,
            Node::ForInStatement { left, .. } | Node::ForOfStatement { left, .. } => left,
            _ => return Ok(()),
        };
        if restore_header(header, loop_type)? {
            restored += 1;
        }
        Ok(())
    })?;
    Ok(restored)
}

// ============================================================================
// Patterns
// ============================================================================

/// Split a binding pattern into its bound names and the expressions it
/// evaluates (default values, computed keys, member targets)
pub fn walk_pattern<'a>(
    pattern: &'a mut Node,
    exprs: &mut Vec<&'a mut Node>,
    bound: &mut Vec<String>,
) {
    match pattern {
        Node::Identifier { name } => bound.push(name.clone()),
        Node::AssignmentPattern { left, right } => {
            walk_pattern(left.as_mut(), exprs, bound);
            exprs.push(right.as_mut());
        }
        Node::ArrayPattern { elements } => {
            for element in elements.iter_mut().flatten() {
                walk_pattern(element, exprs, bound);
            }
        }
        Node::ObjectPattern { properties } => {
            for property in properties.iter_mut() {
                match property {
                    Node::Property {
                        key,
                        value,
                        computed,
                        ..
                    } => {
                        if *computed {
                            exprs.push(key.as_mut());
                        }
                        walk_pattern(value.as_mut(), exprs, bound);
                    }
                    other => walk_pattern(other, exprs, bound),
                }
            }
        }
        Node::RestElement { argument } => walk_pattern(argument.as_mut(), exprs, bound),
        Node::EmptyStatement { .. } => {}
        other => exprs.push(other),
    }
}

/// Names bound by a pattern, in source order
pub fn pattern_names(pattern: &Node, bound: &mut Vec<String>) {
    match pattern {
        Node::Identifier { name } => bound.push(name.clone()),
        Node::AssignmentPattern { left, .. } => pattern_names(left, bound),
        Node::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                pattern_names(element, bound);
            }
        }
        Node::ObjectPattern { properties } => {
            for property in properties {
                match property {
                    Node::Property { value, .. } => pattern_names(value, bound),
                    other => pattern_names(other, bound),
                }
            }
        }
        Node::RestElement { argument } => pattern_names(argument, bound),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    #[test]
    fn test_simple_is_post_order() {
        let mut node = program(vec![expr_stmt(call(
            ident("f"),
            vec![call(ident("g"), vec![])],
        ))]);
        let mut callees = Vec::new();
        simple(&mut node, &[NodeType::CallExpression], &mut |n| {
            if let Node::CallExpression { callee, .. } = n {
                callees.push(callee.to_string());
            }
        });
        assert_eq!(callees, vec!["g", "f"]);
    }

    #[test]
    fn test_simple_skips_empty_subtrees() {
        let hidden = function("inner", &[], vec![expr_stmt(ident("x"))]);
        let mut node = program(vec![Node::EmptyStatement {
            stash: Some(Stash::Scope(Box::new(hidden))),
        }]);
        let mut seen = 0;
        simple(&mut node, &[NodeType::Identifier], &mut |_| seen += 1);
        assert_eq!(seen, 0);
    }

    struct CountCalls {
        calls: usize,
    }

    impl Recursive for CountCalls {
        fn handle(&mut self, node: &mut Node) -> bool {
            match node {
                Node::CallExpression { .. } => {
                    self.calls += 1;
                    // Arguments only
                    if let Node::CallExpression { arguments, .. } = node {
                        for argument in arguments {
                            recursive(argument, self);
                        }
                    }
                    true
                }
                Node::FunctionExpression { .. } => true,
                _ => false,
            }
        }
    }

    #[test]
    fn test_recursive_selective_descent() {
        let mut node = program(vec![expr_stmt(call(
            call(ident("outer"), vec![]),
            vec![
                call(ident("arg"), vec![]),
                function_expr(&[], vec![expr_stmt(call(ident("skipped"), vec![]))]),
            ],
        ))]);
        let mut visitor = CountCalls { calls: 0 };
        recursive(&mut node, &mut visitor);
        // The callee call and the call inside the function are never reached
        assert_eq!(visitor.calls, 2);
    }

    #[test]
    fn test_hide_and_restore_nested_scopes() {
        let original = program(vec![function(
            "outer",
            &["a"],
            vec![
                function("inner", &[], vec![ret(Some(ident("a")))]),
                expr_stmt(arrow(&[], vec![])),
            ],
        )]);
        let mut node = original.clone();
        hide_scopes(&mut node);
        assert_eq!(node.to_string(), ";");
        restore_scopes(&mut node);
        assert_eq!(node, original);
    }

    #[test]
    fn test_hide_keeps_root() {
        let mut node = function_expr(&[], vec![expr_stmt(arrow(&[], vec![]))]);
        hide_scopes(&mut node);
        assert_eq!(node.to_string(), "function() { ;; }");
    }

    #[test]
    fn test_repair_restores_stashed_declaration() {
        let decl = var("i", Some(num(0.0)));
        let empty = Node::EmptyStatement {
            stash: Some(Stash::Declaration(Box::new(decl))),
        };
        let mut node = program(vec![for_stmt(Some(empty), None, None, block(vec![]))]);
        assert_eq!(repair_loop_headers(&mut node).unwrap(), 1);
        assert_eq!(node.to_string(), "for (var i = 0;;) {}");
    }

    #[test]
    fn test_repair_without_stash_is_fatal() {
        let mut node = program(vec![for_in(
            Node::empty(),
            ident("obj"),
            block(vec![]),
        )]);
        let err = repair_loop_headers(&mut node).unwrap_err();
        assert!(err.to_string().contains("ForInStatement"));
    }

    #[test]
    fn test_repair_ignores_intact_headers() {
        let mut node = program(vec![for_of(
            var("x", None),
            ident("xs"),
            block(vec![]),
        )]);
        assert_eq!(repair_loop_headers(&mut node).unwrap(), 0);
    }

    #[test]
    fn test_walk_pattern_splits_bindings_and_defaults() {
        let mut pattern = Node::ObjectPattern {
            properties: vec![
                Node::Property {
                    key: Box::new(ident("a")),
                    value: Box::new(Node::AssignmentPattern {
                        left: Box::new(ident("a")),
                        right: Box::new(call(ident("dflt"), vec![])),
                    }),
                    kind: "init".to_string(),
                    computed: false,
                    method: false,
                    shorthand: true,
                },
                Node::Property {
                    key: Box::new(ident("k")),
                    value: Box::new(ident("b")),
                    kind: "init".to_string(),
                    computed: true,
                    method: false,
                    shorthand: false,
                },
                Node::RestElement {
                    argument: Box::new(ident("rest")),
                },
            ],
        };
        let mut exprs = Vec::new();
        let mut bound = Vec::new();
        walk_pattern(&mut pattern, &mut exprs, &mut bound);
        let exprs: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
        assert_eq!(bound, vec!["a", "b", "rest"]);
        assert_eq!(exprs, vec!["dflt()", "k"]);
    }
}
