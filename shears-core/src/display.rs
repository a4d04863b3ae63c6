//! Compact JavaScript rendering of the AST
//!
//! Prints a node as single-line JavaScript. This is what diagnostics and tests
//! compare against; it is not a code generator (no source maps, no comments,
//! no line breaks).

use std::fmt::{self, Display, Formatter};

use crate::{LiteralValue, Node};

// Binding strength used to decide where parentheses are needed.
const SEQUENCE: u8 = 1;
const ASSIGN: u8 = 2;
const CONDITIONAL: u8 = 3;
const UNARY: u8 = 16;
const POSTFIX: u8 = 17;
const CALL: u8 = 18;
const PRIMARY: u8 = 20;

fn binary_precedence(operator: &str) -> u8 {
    match operator {
        "??" => 4,
        "||" => 5,
        "&&" => 6,
        "|" => 7,
        "^" => 8,
        "&" => 9,
        "==" | "!=" | "===" | "!==" => 10,
        "<" | ">" | "<=" | ">=" | "in" | "instanceof" => 11,
        "<<" | ">>" | ">>>" => 12,
        "+" | "-" => 13,
        "*" | "/" | "%" => 14,
        "**" => 15,
        _ => CALL,
    }
}

fn precedence(node: &Node) -> u8 {
    match node {
        Node::SequenceExpression { .. } => SEQUENCE,
        Node::AssignmentExpression { .. }
        | Node::ArrowFunctionExpression { .. }
        | Node::YieldExpression { .. } => ASSIGN,
        Node::ConditionalExpression { .. } => CONDITIONAL,
        Node::BinaryExpression { operator, .. } | Node::LogicalExpression { operator, .. } => {
            binary_precedence(operator)
        }
        Node::UnaryExpression { .. } | Node::AwaitExpression { .. } => UNARY,
        Node::UpdateExpression { .. } => POSTFIX,
        Node::CallExpression { .. }
        | Node::NewExpression { .. }
        | Node::MemberExpression { .. }
        | Node::ChainExpression { .. }
        | Node::TaggedTemplateExpression { .. }
        | Node::ImportExpression { .. } => CALL,
        _ => PRIMARY,
    }
}

/// Writes `node`, parenthesized if it binds looser than `min`
fn expr(f: &mut Formatter<'_>, node: &Node, min: u8) -> fmt::Result {
    if precedence(node) < min {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

fn comma_list(f: &mut Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        expr(f, node, ASSIGN)?;
    }
    Ok(())
}

fn holey_list(f: &mut Formatter<'_>, elements: &[Option<Node>]) -> fmt::Result {
    f.write_str("[")?;
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(element) = element {
            expr(f, element, ASSIGN)?;
        }
    }
    if matches!(elements.last(), Some(None)) {
        f.write_str(",")?;
    }
    f.write_str("]")
}

fn statements(f: &mut Formatter<'_>, body: &[Node]) -> fmt::Result {
    for (i, stmt) in body.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", stmt)?;
    }
    Ok(())
}

fn function(
    f: &mut Formatter<'_>,
    id: Option<&Node>,
    params: &[Node],
    body: &Node,
    generator: bool,
    is_async: bool,
) -> fmt::Result {
    if is_async {
        f.write_str("async ")?;
    }
    f.write_str(if generator { "function*" } else { "function" })?;
    if let Some(id) = id {
        write!(f, " {}", id)?;
    }
    f.write_str("(")?;
    comma_list(f, params)?;
    write!(f, ") {}", body)
}

/// Parameters and body of a method-shaped function value
fn method_tail(f: &mut Formatter<'_>, value: &Node) -> fmt::Result {
    match value {
        Node::FunctionExpression { params, body, .. } => {
            f.write_str("(")?;
            comma_list(f, params)?;
            write!(f, ") {}", body)
        }
        other => write!(f, ": {}", other),
    }
}

fn property_key(f: &mut Formatter<'_>, key: &Node, computed: bool) -> fmt::Result {
    if computed {
        f.write_str("[")?;
        expr(f, key, ASSIGN)?;
        f.write_str("]")
    } else {
        write!(f, "{}", key)
    }
}

/// A declaration in a loop header, without its terminating semicolon
fn loop_head(f: &mut Formatter<'_>, node: &Node) -> fmt::Result {
    match node {
        Node::VariableDeclaration { declarations, kind } => {
            write!(f, "{} ", kind_keyword(*kind))?;
            comma_list(f, declarations)
        }
        Node::EmptyStatement { .. } => Ok(()),
        other => expr(f, other, SEQUENCE),
    }
}

fn kind_keyword(kind: crate::VariableKind) -> &'static str {
    match kind {
        crate::VariableKind::Var => "var",
        crate::VariableKind::Let => "let",
        crate::VariableKind::Const => "const",
    }
}

fn literal(
    f: &mut Formatter<'_>,
    value: &LiteralValue,
    raw: Option<&str>,
    regex: Option<&crate::RegexLiteral>,
    bigint: Option<&str>,
) -> fmt::Result {
    if let Some(regex) = regex {
        return write!(f, "/{}/{}", regex.pattern, regex.flags);
    }
    if let Some(bigint) = bigint {
        return write!(f, "{}n", bigint);
    }
    match value {
        LiteralValue::Null => f.write_str("null"),
        LiteralValue::Bool(b) => write!(f, "{}", b),
        LiteralValue::Number(n) => write!(f, "{}", n),
        LiteralValue::String(s) => {
            let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
            f.write_str(&quoted)
        }
        LiteralValue::Other(v) => match raw {
            Some(raw) => f.write_str(raw),
            None => write!(f, "{}", v),
        },
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Node::Program { body, .. } => statements(f, body),
            Node::EmptyStatement { .. } => f.write_str(";"),
            Node::ExpressionStatement { expression, .. } => {
                if matches!(
                    **expression,
                    Node::ObjectExpression { .. }
                        | Node::FunctionExpression { .. }
                        | Node::ClassExpression { .. }
                ) {
                    write!(f, "({});", expression)
                } else {
                    write!(f, "{};", expression)
                }
            }
            Node::BlockStatement { body } | Node::ClassBody { body } => {
                if body.is_empty() {
                    f.write_str("{}")
                } else {
                    f.write_str("{ ")?;
                    statements(f, body)?;
                    f.write_str(" }")
                }
            }
            Node::DebuggerStatement {} => f.write_str("debugger;"),
            Node::ReturnStatement { argument } => match argument {
                Some(argument) => write!(f, "return {};", argument),
                None => f.write_str("return;"),
            },
            Node::LabeledStatement { label, body } => write!(f, "{}: {}", label, body),
            Node::BreakStatement { label } => match label {
                Some(label) => write!(f, "break {};", label),
                None => f.write_str("break;"),
            },
            Node::ContinueStatement { label } => match label {
                Some(label) => write!(f, "continue {};", label),
                None => f.write_str("continue;"),
            },
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                write!(f, "if ({}) {}", test, consequent)?;
                if let Some(alternate) = alternate {
                    write!(f, " else {}", alternate)?;
                }
                Ok(())
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => {
                write!(f, "switch ({}) ", discriminant)?;
                if cases.is_empty() {
                    f.write_str("{}")
                } else {
                    f.write_str("{ ")?;
                    statements(f, cases)?;
                    f.write_str(" }")
                }
            }
            Node::SwitchCase { test, consequent } => {
                match test {
                    Some(test) => write!(f, "case {}:", test)?,
                    None => f.write_str("default:")?,
                }
                for stmt in consequent {
                    write!(f, " {}", stmt)?;
                }
                Ok(())
            }
            Node::ThrowStatement { argument } => write!(f, "throw {};", argument),
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                write!(f, "try {}", block)?;
                if let Some(handler) = handler {
                    write!(f, " {}", handler)?;
                }
                if let Some(finalizer) = finalizer {
                    write!(f, " finally {}", finalizer)?;
                }
                Ok(())
            }
            Node::CatchClause { param, body } => match param {
                Some(param) => write!(f, "catch ({}) {}", param, body),
                None => write!(f, "catch {}", body),
            },
            Node::WhileStatement { test, body } => write!(f, "while ({}) {}", test, body),
            Node::DoWhileStatement { body, test } => write!(f, "do {} while ({});", body, test),
            Node::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                f.write_str("for (")?;
                if let Some(init) = init {
                    loop_head(f, init)?;
                }
                f.write_str(";")?;
                if let Some(test) = test {
                    write!(f, " {}", test)?;
                }
                f.write_str(";")?;
                if let Some(update) = update {
                    write!(f, " {}", update)?;
                }
                write!(f, ") {}", body)
            }
            Node::ForInStatement { left, right, body } => {
                f.write_str("for (")?;
                loop_head(f, left)?;
                write!(f, " in {}) {}", right, body)
            }
            Node::ForOfStatement {
                left,
                right,
                body,
                is_await,
            } => {
                f.write_str(if *is_await { "for await (" } else { "for (" })?;
                loop_head(f, left)?;
                write!(f, " of {}) {}", right, body)
            }
            Node::FunctionDeclaration {
                id,
                params,
                body,
                generator,
                is_async,
            }
            | Node::FunctionExpression {
                id,
                params,
                body,
                generator,
                is_async,
            } => function(f, id.as_deref(), params, body, *generator, *is_async),
            Node::VariableDeclaration { .. } => {
                loop_head(f, self)?;
                f.write_str(";")
            }
            Node::VariableDeclarator { id, init } => {
                write!(f, "{}", id)?;
                if let Some(init) = init {
                    f.write_str(" = ")?;
                    expr(f, init, ASSIGN)?;
                }
                Ok(())
            }
            Node::ClassDeclaration {
                id,
                super_class,
                body,
            }
            | Node::ClassExpression {
                id,
                super_class,
                body,
            } => {
                f.write_str("class")?;
                if let Some(id) = id {
                    write!(f, " {}", id)?;
                }
                if let Some(super_class) = super_class {
                    f.write_str(" extends ")?;
                    expr(f, super_class, CALL)?;
                }
                write!(f, " {}", body)
            }
            Node::MethodDefinition {
                key,
                value,
                kind,
                computed,
                is_static,
            } => {
                if *is_static {
                    f.write_str("static ")?;
                }
                if kind == "get" || kind == "set" {
                    write!(f, "{} ", kind)?;
                }
                property_key(f, key, *computed)?;
                method_tail(f, value)
            }
            Node::PropertyDefinition {
                key,
                value,
                computed,
                is_static,
            } => {
                if *is_static {
                    f.write_str("static ")?;
                }
                property_key(f, key, *computed)?;
                if let Some(value) = value {
                    f.write_str(" = ")?;
                    expr(f, value, ASSIGN)?;
                }
                f.write_str(";")
            }
            Node::StaticBlock { body } => {
                f.write_str("static ")?;
                if body.is_empty() {
                    f.write_str("{}")
                } else {
                    f.write_str("{ ")?;
                    statements(f, body)?;
                    f.write_str(" }")
                }
            }
            Node::Identifier { name } => f.write_str(name),
            Node::PrivateIdentifier { name } => write!(f, "#{}", name),
            Node::Literal {
                value,
                raw,
                regex,
                bigint,
            } => literal(
                f,
                value,
                raw.as_deref(),
                regex.as_ref(),
                bigint.as_deref(),
            ),
            Node::ThisExpression {} => f.write_str("this"),
            Node::Super {} => f.write_str("super"),
            Node::ArrayExpression { elements } | Node::ArrayPattern { elements } => {
                holey_list(f, elements)
            }
            Node::ObjectExpression { properties } | Node::ObjectPattern { properties } => {
                if properties.is_empty() {
                    f.write_str("{}")
                } else {
                    f.write_str("{ ")?;
                    comma_list(f, properties)?;
                    f.write_str(" }")
                }
            }
            Node::Property {
                key,
                value,
                kind,
                computed,
                method,
                shorthand,
            } => {
                if *shorthand {
                    return write!(f, "{}", value);
                }
                if kind == "get" || kind == "set" {
                    write!(f, "{} ", kind)?;
                    property_key(f, key, *computed)?;
                    return method_tail(f, value);
                }
                property_key(f, key, *computed)?;
                if *method {
                    method_tail(f, value)
                } else {
                    f.write_str(": ")?;
                    expr(f, value, ASSIGN)
                }
            }
            Node::ArrowFunctionExpression {
                params,
                body,
                is_async,
                ..
            } => {
                if *is_async {
                    f.write_str("async ")?;
                }
                f.write_str("(")?;
                comma_list(f, params)?;
                f.write_str(") => ")?;
                if matches!(**body, Node::ObjectExpression { .. }) {
                    write!(f, "({})", body)
                } else {
                    expr(f, body, ASSIGN)
                }
            }
            Node::UnaryExpression {
                operator, argument, ..
            } => {
                f.write_str(operator)?;
                if operator.chars().all(|c| c.is_ascii_alphabetic()) {
                    f.write_str(" ")?;
                }
                expr(f, argument, UNARY)
            }
            Node::UpdateExpression {
                operator,
                prefix,
                argument,
            } => {
                if *prefix {
                    f.write_str(operator)?;
                    expr(f, argument, UNARY)
                } else {
                    expr(f, argument, CALL)?;
                    f.write_str(operator)
                }
            }
            Node::BinaryExpression {
                operator,
                left,
                right,
            }
            | Node::LogicalExpression {
                operator,
                left,
                right,
            } => {
                let prec = binary_precedence(operator);
                expr(f, left, prec)?;
                write!(f, " {} ", operator)?;
                expr(f, right, prec + 1)
            }
            Node::AssignmentExpression {
                operator,
                left,
                right,
            } => {
                expr(f, left, CALL)?;
                write!(f, " {} ", operator)?;
                expr(f, right, ASSIGN)
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                expr(f, test, CONDITIONAL + 1)?;
                f.write_str(" ? ")?;
                expr(f, consequent, ASSIGN)?;
                f.write_str(" : ")?;
                expr(f, alternate, ASSIGN)
            }
            Node::CallExpression {
                callee,
                arguments,
                optional,
            } => {
                expr(f, callee, CALL)?;
                f.write_str(if *optional { "?.(" } else { "(" })?;
                comma_list(f, arguments)?;
                f.write_str(")")
            }
            Node::NewExpression { callee, arguments } => {
                f.write_str("new ")?;
                expr(f, callee, PRIMARY)?;
                f.write_str("(")?;
                comma_list(f, arguments)?;
                f.write_str(")")
            }
            Node::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => {
                expr(f, object, CALL)?;
                match (*computed, *optional) {
                    (true, true) => write!(f, "?.[{}]", property),
                    (true, false) => write!(f, "[{}]", property),
                    (false, true) => write!(f, "?.{}", property),
                    (false, false) => write!(f, ".{}", property),
                }
            }
            Node::ChainExpression { expression } => write!(f, "{}", expression),
            Node::SequenceExpression { expressions } => {
                for (i, expression) in expressions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    expr(f, expression, ASSIGN)?;
                }
                Ok(())
            }
            Node::ParenthesizedExpression { expression } => write!(f, "({})", expression),
            Node::SpreadElement { argument } | Node::RestElement { argument } => {
                f.write_str("...")?;
                expr(f, argument, ASSIGN)
            }
            Node::YieldExpression { argument, delegate } => {
                f.write_str(if *delegate { "yield*" } else { "yield" })?;
                if let Some(argument) = argument {
                    f.write_str(" ")?;
                    expr(f, argument, ASSIGN)?;
                }
                Ok(())
            }
            Node::AwaitExpression { argument } => {
                f.write_str("await ")?;
                expr(f, argument, UNARY)
            }
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => {
                f.write_str("`")?;
                for (i, quasi) in quasis.iter().enumerate() {
                    write!(f, "{}", quasi)?;
                    if let Some(expression) = expressions.get(i) {
                        write!(f, "${{{}}}", expression)?;
                    }
                }
                f.write_str("`")
            }
            Node::TaggedTemplateExpression { tag, quasi } => {
                expr(f, tag, CALL)?;
                write!(f, "{}", quasi)
            }
            Node::TemplateElement { value, .. } => f.write_str(&value.raw),
            Node::MetaProperty { meta, property } => write!(f, "{}.{}", meta, property),
            Node::ImportExpression { source } => write!(f, "import({})", source),
            Node::AssignmentPattern { left, right } => {
                write!(f, "{} = ", left)?;
                expr(f, right, ASSIGN)
            }
            Node::ExportNamedDeclaration {
                declaration,
                specifiers,
                source,
            } => {
                if let Some(declaration) = declaration {
                    return write!(f, "export {}", declaration);
                }
                f.write_str("export { ")?;
                comma_list(f, specifiers)?;
                f.write_str(" }")?;
                if let Some(source) = source {
                    write!(f, " from {}", source)?;
                }
                f.write_str(";")
            }
            Node::ExportDefaultDeclaration { declaration } => {
                write!(f, "export default {}", declaration)?;
                let is_declaration = matches!(
                    **declaration,
                    Node::FunctionDeclaration { .. } | Node::ClassDeclaration { .. }
                );
                if is_declaration {
                    Ok(())
                } else {
                    f.write_str(";")
                }
            }
            Node::ExportSpecifier { local, exported } => {
                if local == exported {
                    write!(f, "{}", local)
                } else {
                    write!(f, "{} as {}", local, exported)
                }
            }
            Node::ExportAllDeclaration { exported, source } => {
                f.write_str("export *")?;
                if let Some(exported) = exported {
                    write!(f, " as {}", exported)?;
                }
                write!(f, " from {};", source)
            }
            Node::ImportDeclaration { specifiers, source } => {
                f.write_str("import ")?;
                let (named, leading): (Vec<&Node>, Vec<&Node>) = specifiers
                    .iter()
                    .partition(|s| matches!(s, Node::ImportSpecifier { .. }));
                for (i, specifier) in leading.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", specifier)?;
                }
                if !named.is_empty() {
                    if !leading.is_empty() {
                        f.write_str(", ")?;
                    }
                    f.write_str("{ ")?;
                    for (i, specifier) in named.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", specifier)?;
                    }
                    f.write_str(" }")?;
                }
                if !specifiers.is_empty() {
                    f.write_str(" from ")?;
                }
                write!(f, "{};", source)
            }
            Node::ImportSpecifier { imported, local } => {
                if imported == local {
                    write!(f, "{}", local)
                } else {
                    write!(f, "{} as {}", imported, local)
                }
            }
            Node::ImportDefaultSpecifier { local } => write!(f, "{}", local),
            Node::ImportNamespaceSpecifier { local } => write!(f, "* as {}", local),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::build::*;

    #[test]
    fn test_for_header_rendering() {
        let node = for_stmt(
            Some(var("i", Some(num(0.0)))),
            Some(binary("<", ident("i"), num(10.0))),
            Some(update("++", false, ident("i"))),
            block(vec![]),
        );
        assert_eq!(node.to_string(), "for (var i = 0; i < 10; i++) {}");

        let bare = for_stmt(Some(var("i", Some(num(0.0)))), None, None, block(vec![]));
        assert_eq!(bare.to_string(), "for (var i = 0;;) {}");
    }

    #[test]
    fn test_precedence_parentheses() {
        let node = binary("*", binary("+", ident("a"), ident("b")), ident("c"));
        assert_eq!(node.to_string(), "(a + b) * c");

        let node = binary("+", ident("a"), binary("*", ident("b"), ident("c")));
        assert_eq!(node.to_string(), "a + b * c");

        let node = call(seq(vec![num(0.0), member(ident("a"), "b")]), vec![]);
        assert_eq!(node.to_string(), "(0, a.b)()");
    }

    #[test]
    fn test_wrapper_export_rendering() {
        let wrapper = function_expr(
            &[],
            vec![ret(Some(call(
                member(
                    assign(
                        ident("_x"),
                        index(ident("wasmExports"), str_lit("x")),
                    ),
                    "apply",
                ),
                vec![null(), ident("arguments")],
            )))],
        );
        let node = var("_x", Some(wrapper));
        assert_eq!(
            node.to_string(),
            r#"var _x = function() { return (_x = wasmExports["x"]).apply(null, arguments); };"#
        );
    }

    #[test]
    fn test_statement_level_object_is_parenthesized() {
        let node = expr_stmt(object(vec![property("a", num(1.0))]));
        assert_eq!(node.to_string(), r#"({ "a": 1 });"#);
    }
}
