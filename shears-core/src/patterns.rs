//! Glue code pattern matchers
//!
//! Syntactic recognizers for the handful of shapes through which the glue
//! script talks to its binary module: the import object, export accessors,
//! export wrappers, the minimal-runtime startup callback and `dynCall`
//! dispatch. Nothing here evaluates code; a shape either matches exactly or
//! it does not.
//!
//! Both the reachability builder and the pruner go through these matchers,
//! so a declaration is recognized the same way on both sides.

use crate::walk::full_ref;
use crate::Node;

/// The import object handed to the binary module
pub const WASM_IMPORTS: &str = "wasmImports";
/// The binary module's export object
pub const WASM_EXPORTS: &str = "wasmExports";
/// The global module object
pub const MODULE: &str = "Module";
/// The dynamic dispatch helper
pub const DYNCALL: &str = "dynCall";
/// Prefix of every signature-specific dispatch export
pub const DYNCALL_PREFIX: &str = "dynCall_";

/// An export binding recognized in the glue code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportMatch {
    /// Name the JavaScript side uses (`_malloc`)
    pub js_name: String,
    /// Name the binary module exports (`malloc`)
    pub binary_name: String,
}

fn strip_parens(mut node: &Node) -> &Node {
    while let Node::ParenthesizedExpression { expression } = node {
        node = &**expression;
    }
    node
}

/// Name of an object key: an identifier or a string literal
pub fn property_key_name(key: &Node) -> Option<&str> {
    key.identifier_name().or_else(|| key.string_literal())
}

fn member_use_name<'a>(node: &'a Node, object_name: &str) -> Option<&'a str> {
    let Node::MemberExpression {
        object,
        property,
        computed,
        ..
    } = node
    else {
        return None;
    };
    if !object.is_identifier(object_name) {
        return None;
    }
    if *computed {
        property.string_literal()
    } else {
        property.identifier_name()
    }
}

/// `wasmExports['name']` or `wasmExports.name`
pub fn export_use_name(node: &Node) -> Option<&str> {
    member_use_name(node, WASM_EXPORTS)
}

/// `Module['name']` or `Module.name`
pub fn module_use_name(node: &Node) -> Option<&str> {
    member_use_name(node, MODULE)
}

// ============================================================================
// Imports
// ============================================================================

/// Properties of the import object, if `node` is `var wasmImports = {...}`
/// or `wasmImports = {...}`
pub fn imports_properties(node: &Node) -> Option<&Vec<Node>> {
    let value = match node {
        Node::VariableDeclaration { declarations, .. } if declarations.len() == 1 => {
            match &declarations[0] {
                Node::VariableDeclarator {
                    id,
                    init: Some(init),
                } if id.is_identifier(WASM_IMPORTS) => init,
                _ => return None,
            }
        }
        Node::ExpressionStatement { expression, .. } => match &**expression {
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } if operator == "=" && left.is_identifier(WASM_IMPORTS) => right,
            _ => return None,
        },
        _ => return None,
    };
    match &**value {
        Node::ObjectExpression { properties } => Some(properties),
        _ => None,
    }
}

/// Mutable [`imports_properties`]
pub fn imports_properties_mut(node: &mut Node) -> Option<&mut Vec<Node>> {
    let value = match node {
        Node::VariableDeclaration { declarations, .. } if declarations.len() == 1 => {
            match &mut declarations[0] {
                Node::VariableDeclarator {
                    id,
                    init: Some(init),
                } if id.is_identifier(WASM_IMPORTS) => init,
                _ => return None,
            }
        }
        Node::ExpressionStatement { expression, .. } => match &mut **expression {
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } if operator == "=" && left.is_identifier(WASM_IMPORTS) => right,
            _ => return None,
        },
        _ => return None,
    };
    match &mut **value {
        Node::ObjectExpression { properties } => Some(properties),
        _ => None,
    }
}

// ============================================================================
// Exports
// ============================================================================

/// The single `wasmExports[...]` use inside `node`, if there is exactly one
fn single_export_use(node: &Node) -> Option<String> {
    let mut found = Vec::new();
    full_ref(node, &mut |n| {
        if let Some(name) = export_use_name(n) {
            found.push(name.to_string());
        }
    });
    if found.len() == 1 {
        found.pop()
    } else {
        None
    }
}

/// `(js_name = <export use>)`, looking through `.apply` / `.call`
fn wrapper_target(callee: &Node, js_name: &str) -> Option<String> {
    let mut callee = strip_parens(callee);
    if let Node::MemberExpression {
        object,
        property,
        computed: false,
        ..
    } = callee
    {
        if property.is_identifier("apply") || property.is_identifier("call") {
            callee = strip_parens(object);
        }
    }
    match callee {
        Node::AssignmentExpression {
            operator,
            left,
            right,
        } if operator == "=" && left.is_identifier(js_name) => single_export_use(right),
        _ => None,
    }
}

/// `function () { return (js_name = wasmExports['x']).apply(null, arguments) }`
/// and its arrow-function forms
fn wrapper_export(function: &Node, js_name: &str) -> Option<String> {
    let body = match function {
        Node::FunctionExpression { body, .. } | Node::ArrowFunctionExpression { body, .. } => body,
        _ => return None,
    };
    let expression = match &**body {
        Node::BlockStatement { body } if body.len() == 1 => match &body[0] {
            Node::ReturnStatement {
                argument: Some(argument),
            } => argument,
            Node::ExpressionStatement { expression, .. } => expression,
            _ => return None,
        },
        Node::BlockStatement { .. } => return None,
        expression => return wrapper_call(expression, js_name),
    };
    wrapper_call(expression, js_name)
}

fn wrapper_call(expression: &Node, js_name: &str) -> Option<String> {
    match strip_parens(expression) {
        Node::CallExpression { callee, .. } => wrapper_target(callee, js_name),
        _ => None,
    }
}

fn single_declarator(node: &Node) -> Option<(&str, Option<&Node>)> {
    let Node::VariableDeclaration { declarations, .. } = node else {
        return None;
    };
    if declarations.len() != 1 {
        return None;
    }
    let Node::VariableDeclarator { id, init } = &declarations[0] else {
        return None;
    };
    Some((id.identifier_name()?, init.as_deref()))
}

/// Recognize an export declaration:
///
/// - `var _x = wasmExports['x']`
/// - `var _x = Module['_x'] = <expression with exactly one export use>`
/// - `var _x = function () { return (_x = wasmExports['x']).apply(null, arguments) }`
pub fn match_export_declaration(node: &Node) -> Option<ExportMatch> {
    let (js_name, init) = single_declarator(node)?;
    let init = strip_parens(init?);
    let binary_name = if let Some(name) = export_use_name(init) {
        name.to_string()
    } else {
        match init {
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } if operator == "=" && module_use_name(left).is_some() => single_export_use(right)?,
            other => wrapper_export(other, js_name)?,
        }
    };
    Some(ExportMatch {
        js_name: js_name.to_string(),
        binary_name,
    })
}

/// `var x = Module['x'] = <number>`
pub fn is_module_number_export(node: &Node) -> bool {
    let Some((_, Some(init))) = single_declarator(node) else {
        return false;
    };
    match strip_parens(init) {
        Node::AssignmentExpression {
            operator,
            left,
            right,
        } => {
            operator == "="
                && module_use_name(left).is_some()
                && matches!(
                    **right,
                    Node::Literal {
                        value: crate::LiteralValue::Number(_),
                        ..
                    }
                )
        }
        _ => false,
    }
}

/// `var x;` with no initializer anywhere
pub fn is_bare_declaration(node: &Node) -> bool {
    match node {
        Node::VariableDeclaration { declarations, .. } => declarations.iter().all(|d| {
            matches!(
                d,
                Node::VariableDeclarator {
                    id,
                    init: None,
                } if id.identifier_name().is_some()
            )
        }),
        _ => false,
    }
}

/// `wasmExports['x'] = ...`
pub fn is_export_assignment(node: &Node) -> bool {
    matches!(
        node,
        Node::AssignmentExpression { left, .. } if export_use_name(left).is_some()
    )
}

/// Minimal-runtime startup callback
///
/// ```js
/// (output) => {
///   var wasmExports = output.instance.exports;
///   _main = wasmExports['main'];
///   ...
/// }
/// ```
///
/// Returns each export assignment with its statement index in the callback
/// body.
pub fn minimal_runtime_exports(node: &Node) -> Option<Vec<(usize, ExportMatch)>> {
    let (params, body) = match node {
        Node::ArrowFunctionExpression { params, body, .. }
        | Node::FunctionExpression { params, body, .. } => (params, body),
        _ => return None,
    };
    let [param] = params.as_slice() else {
        return None;
    };
    let param = param.identifier_name()?;
    let Node::BlockStatement { body } = &**body else {
        return None;
    };
    let (first, rest) = body.split_first()?;

    let (name, init) = single_declarator(first)?;
    if name != WASM_EXPORTS || !is_instance_exports(init?, param) {
        return None;
    }

    let mut exports = Vec::new();
    for (i, stmt) in rest.iter().enumerate() {
        let Node::ExpressionStatement { expression, .. } = stmt else {
            continue;
        };
        if let Node::AssignmentExpression {
            operator,
            left,
            right,
        } = &**expression
        {
            if let (true, Some(js_name), Some(binary_name)) = (
                operator == "=",
                left.identifier_name(),
                export_use_name(right),
            ) {
                exports.push((
                    i + 1,
                    ExportMatch {
                        js_name: js_name.to_string(),
                        binary_name: binary_name.to_string(),
                    },
                ));
            }
        }
    }
    Some(exports)
}

/// `param.instance.exports`
fn is_instance_exports(node: &Node, param: &str) -> bool {
    let Node::MemberExpression {
        object,
        property,
        computed: false,
        ..
    } = node
    else {
        return false;
    };
    if !property.is_identifier("exports") {
        return false;
    }
    matches!(
        &**object,
        Node::MemberExpression {
            object,
            property,
            computed: false,
            ..
        } if object.is_identifier(param) && property.is_identifier("instance")
    )
}

// ============================================================================
// Dynamic dispatch
// ============================================================================

fn dyncall_first_argument(node: &Node) -> Option<Option<&Node>> {
    match node {
        Node::CallExpression {
            callee, arguments, ..
        } if callee.is_identifier(DYNCALL) => Some(arguments.first()),
        _ => None,
    }
}

/// `dynCall('vi', ...)` resolves to the JS name `dynCall_vi`
pub fn static_dyncall_target(node: &Node) -> Option<String> {
    let signature = dyncall_first_argument(node)??.string_literal()?;
    Some(format!("{}{}", DYNCALL_PREFIX, signature))
}

/// A dispatch that may reach any `dynCall_*` export
///
/// Either `dynCall(<not a string literal>, ...)` or any string literal equal
/// to the bare `dynCall_` prefix (code building the name at runtime).
pub fn is_dynamic_dyncall(node: &Node) -> bool {
    if node.string_literal() == Some(DYNCALL_PREFIX) {
        return true;
    }
    match dyncall_first_argument(node) {
        Some(Some(first)) => first.string_literal().is_none(),
        Some(None) => true,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    fn export_use(name: &str) -> Node {
        index(ident(WASM_EXPORTS), str_lit(name))
    }

    #[test]
    fn test_direct_export() {
        let node = var("_malloc", Some(export_use("malloc")));
        assert_eq!(
            match_export_declaration(&node),
            Some(ExportMatch {
                js_name: "_malloc".to_string(),
                binary_name: "malloc".to_string(),
            })
        );
    }

    #[test]
    fn test_module_chain_export() {
        let node = var(
            "_free",
            Some(assign(index(ident(MODULE), str_lit("_free")), export_use("free"))),
        );
        let m = match_export_declaration(&node).unwrap();
        assert_eq!(m.binary_name, "free");

        // Two export uses are ambiguous
        let node = var(
            "_both",
            Some(assign(
                index(ident(MODULE), str_lit("_both")),
                binary("+", export_use("a"), export_use("b")),
            )),
        );
        assert_eq!(match_export_declaration(&node), None);
    }

    #[test]
    fn test_wrapper_export() {
        let wrapper = function_expr(
            &[],
            vec![ret(Some(call(
                member(assign(ident("_main"), export_use("main")), "apply"),
                vec![null(), ident("arguments")],
            )))],
        );
        let node = var("_main", Some(wrapper));
        assert_eq!(match_export_declaration(&node).unwrap().binary_name, "main");

        // The reassigned name must be the declared one
        let wrapper = function_expr(
            &[],
            vec![ret(Some(call(
                assign(ident("_other"), export_use("main")),
                vec![],
            )))],
        );
        assert_eq!(match_export_declaration(&var("_main", Some(wrapper))), None);
    }

    #[test]
    fn test_arrow_wrapper_export() {
        let arrow = Node::ArrowFunctionExpression {
            params: vec![ident("a0")],
            body: Box::new(call(
                Node::ParenthesizedExpression {
                    expression: Box::new(assign(ident("_f"), export_use("f"))),
                },
                vec![ident("a0")],
            )),
            expression: true,
            is_async: false,
        };
        assert_eq!(
            match_export_declaration(&var("_f", Some(arrow))).unwrap().binary_name,
            "f"
        );
    }

    #[test]
    fn test_imports_assign_forms() {
        let decl = var(WASM_IMPORTS, Some(object(vec![])));
        assert!(imports_properties(&decl).is_some());
        let stmt = expr_stmt(assign(ident(WASM_IMPORTS), object(vec![])));
        assert!(imports_properties(&stmt).is_some());
        assert!(imports_properties(&var("other", Some(object(vec![])))).is_none());
    }

    #[test]
    fn test_minimal_runtime_shape() {
        let callback = arrow(
            &["output"],
            vec![
                var(
                    WASM_EXPORTS,
                    Some(member(member(ident("output"), "instance"), "exports")),
                ),
                expr_stmt(assign(ident("_main"), export_use("main"))),
                expr_stmt(call(ident("ready"), vec![])),
                expr_stmt(assign(ident("_f"), export_use("f"))),
            ],
        );
        let exports = minimal_runtime_exports(&callback).unwrap();
        let found: Vec<(usize, &str)> = exports
            .iter()
            .map(|(i, m)| (*i, m.binary_name.as_str()))
            .collect();
        assert_eq!(found, vec![(1, "main"), (3, "f")]);
    }

    #[test]
    fn test_dyncall_classification() {
        let static_call = call(ident(DYNCALL), vec![str_lit("vi"), ident("ptr")]);
        assert_eq!(static_dyncall_target(&static_call).as_deref(), Some("dynCall_vi"));
        assert!(!is_dynamic_dyncall(&static_call));

        let dynamic = call(ident(DYNCALL), vec![ident("sig"), ident("ptr")]);
        assert_eq!(static_dyncall_target(&dynamic), None);
        assert!(is_dynamic_dyncall(&dynamic));

        assert!(is_dynamic_dyncall(&str_lit("dynCall_")));
        assert!(!is_dynamic_dyncall(&str_lit("dynCall_vi")));
    }

    #[test]
    fn test_module_number_export() {
        let node = var(
            "_global",
            Some(assign(index(ident(MODULE), str_lit("_global")), num(1024.0))),
        );
        assert!(is_module_number_export(&node));
        assert!(match_export_declaration(&node).is_none());
    }
}
