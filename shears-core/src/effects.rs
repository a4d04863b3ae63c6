//! Side-Effect Oracle
//!
//! Decides whether evaluating a subtree may have an observable effect.
//!
//! ## Conservative Analysis
//!
//! Anything not known to be pure is treated as side-effecting: calls,
//! assignments, updates, `this`, templates, classes, and property reads on
//! anything but [`PURE_OBJECTS`]. A false positive only costs a missed
//! removal; a false negative would delete live code.
//!
//! Function bodies are hidden during the check, including the body of a
//! function passed in directly. Declaring a function does nothing until it
//! is called.

use crate::walk::{full_ref, hide_scopes, restore_scopes};
use crate::Node;

/// Globals whose property reads are pure
pub const PURE_OBJECTS: &[&str] = &["Math"];

/// Constructors that are pure when their arguments are
pub const PURE_CONSTRUCTORS: &[&str] = &[
    "ArrayBuffer",
    "TextDecoder",
    "Int8Array",
    "Uint8Array",
    "Int16Array",
    "Uint16Array",
    "Int32Array",
    "Uint32Array",
    "Float32Array",
    "Float64Array",
];

/// Whether `node` by itself (ignoring its children) is effect free
fn is_pure_node(node: &Node) -> bool {
    match node {
        Node::Literal { .. }
        | Node::Identifier { .. }
        | Node::PrivateIdentifier { .. }
        | Node::BinaryExpression { .. }
        | Node::LogicalExpression { .. }
        | Node::ConditionalExpression { .. }
        | Node::FunctionDeclaration { .. }
        | Node::FunctionExpression { .. }
        | Node::ArrowFunctionExpression { .. }
        | Node::VariableDeclaration { .. }
        | Node::VariableDeclarator { .. }
        | Node::ObjectExpression { .. }
        | Node::Property { .. }
        | Node::SpreadElement { .. }
        | Node::BlockStatement { .. }
        | Node::ArrayExpression { .. }
        | Node::ParenthesizedExpression { .. }
        | Node::EmptyStatement { .. } => true,
        Node::UnaryExpression { operator, .. } => operator != "delete",
        Node::ExpressionStatement { directive, .. } => directive.is_none(),
        Node::MemberExpression { object, .. } => object
            .identifier_name()
            .is_some_and(|name| PURE_OBJECTS.contains(&name)),
        // Arguments are checked on their own by the walk
        Node::NewExpression { callee, .. } => callee
            .identifier_name()
            .is_some_and(|name| PURE_CONSTRUCTORS.contains(&name)),
        _ => false,
    }
}

/// Conservatively decide whether evaluating `node` may have side effects
///
/// `node` is borrowed mutably only to hide and restore nested scopes; it is
/// unchanged on return.
pub fn has_side_effects(node: &mut Node) -> bool {
    if node.is_function() {
        return false;
    }
    hide_scopes(node);
    let mut has = false;
    full_ref(node, &mut |n| {
        if !is_pure_node(n) {
            has = true;
        }
    });
    restore_scopes(node);
    has
}
