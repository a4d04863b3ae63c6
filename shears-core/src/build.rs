//! Node constructors
//!
//! Shorthand for assembling ESTree nodes in passes and tests.

use crate::{LiteralValue, Node, VariableKind};

pub fn ident(name: &str) -> Node {
    Node::Identifier {
        name: name.to_string(),
    }
}

pub fn num(value: f64) -> Node {
    Node::Literal {
        value: LiteralValue::Number(value),
        raw: None,
        regex: None,
        bigint: None,
    }
}

pub fn str_lit(value: &str) -> Node {
    Node::Literal {
        value: LiteralValue::String(value.to_string()),
        raw: None,
        regex: None,
        bigint: None,
    }
}

pub fn null() -> Node {
    Node::Literal {
        value: LiteralValue::Null,
        raw: None,
        regex: None,
        bigint: None,
    }
}

/// The `undefined` identifier, used as the replacement for pruned values
pub fn undefined() -> Node {
    ident("undefined")
}

pub fn declarator(id: Node, init: Option<Node>) -> Node {
    Node::VariableDeclarator {
        id: Box::new(id),
        init: init.map(Box::new),
    }
}

pub fn var_decl(kind: VariableKind, declarations: Vec<Node>) -> Node {
    Node::VariableDeclaration { declarations, kind }
}

/// `var name = init;`
pub fn var(name: &str, init: Option<Node>) -> Node {
    var_decl(VariableKind::Var, vec![declarator(ident(name), init)])
}

pub fn expr_stmt(expression: Node) -> Node {
    Node::ExpressionStatement {
        expression: Box::new(expression),
        directive: None,
    }
}

pub fn call(callee: Node, arguments: Vec<Node>) -> Node {
    Node::CallExpression {
        callee: Box::new(callee),
        arguments,
        optional: false,
    }
}

pub fn new_expr(callee: Node, arguments: Vec<Node>) -> Node {
    Node::NewExpression {
        callee: Box::new(callee),
        arguments,
    }
}

/// `object.property`
pub fn member(object: Node, property: &str) -> Node {
    Node::MemberExpression {
        object: Box::new(object),
        property: Box::new(ident(property)),
        computed: false,
        optional: false,
    }
}

/// `object[property]`
pub fn index(object: Node, property: Node) -> Node {
    Node::MemberExpression {
        object: Box::new(object),
        property: Box::new(property),
        computed: true,
        optional: false,
    }
}

pub fn assign(left: Node, right: Node) -> Node {
    Node::AssignmentExpression {
        operator: "=".to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn binary(operator: &str, left: Node, right: Node) -> Node {
    Node::BinaryExpression {
        operator: operator.to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn logical(operator: &str, left: Node, right: Node) -> Node {
    Node::LogicalExpression {
        operator: operator.to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unary(operator: &str, argument: Node) -> Node {
    Node::UnaryExpression {
        operator: operator.to_string(),
        prefix: true,
        argument: Box::new(argument),
    }
}

pub fn update(operator: &str, prefix: bool, argument: Node) -> Node {
    Node::UpdateExpression {
        operator: operator.to_string(),
        prefix,
        argument: Box::new(argument),
    }
}

/// `function name(params) { body }`
pub fn function(name: &str, params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionDeclaration {
        id: Some(Box::new(ident(name))),
        params: params.iter().map(|p| ident(p)).collect(),
        body: Box::new(block(body)),
        generator: false,
        is_async: false,
    }
}

/// `function (params) { body }`
pub fn function_expr(params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionExpression {
        id: None,
        params: params.iter().map(|p| ident(p)).collect(),
        body: Box::new(block(body)),
        generator: false,
        is_async: false,
    }
}

/// `(params) => { body }`
pub fn arrow(params: &[&str], body: Vec<Node>) -> Node {
    Node::ArrowFunctionExpression {
        params: params.iter().map(|p| ident(p)).collect(),
        body: Box::new(block(body)),
        expression: false,
        is_async: false,
    }
}

pub fn ret(argument: Option<Node>) -> Node {
    Node::ReturnStatement {
        argument: argument.map(Box::new),
    }
}

pub fn block(body: Vec<Node>) -> Node {
    Node::BlockStatement { body }
}

pub fn program(body: Vec<Node>) -> Node {
    Node::Program {
        body,
        source_type: Some("script".to_string()),
    }
}

/// `key: value` with a string-literal key
pub fn property(key: &str, value: Node) -> Node {
    Node::Property {
        key: Box::new(str_lit(key)),
        value: Box::new(value),
        kind: "init".to_string(),
        computed: false,
        method: false,
        shorthand: false,
    }
}

pub fn object(properties: Vec<Node>) -> Node {
    Node::ObjectExpression { properties }
}

pub fn seq(expressions: Vec<Node>) -> Node {
    Node::SequenceExpression { expressions }
}

pub fn for_stmt(init: Option<Node>, test: Option<Node>, update: Option<Node>, body: Node) -> Node {
    Node::ForStatement {
        init: init.map(Box::new),
        test: test.map(Box::new),
        update: update.map(Box::new),
        body: Box::new(body),
    }
}

pub fn for_in(left: Node, right: Node, body: Node) -> Node {
    Node::ForInStatement {
        left: Box::new(left),
        right: Box::new(right),
        body: Box::new(body),
    }
}

pub fn for_of(left: Node, right: Node, body: Node) -> Node {
    Node::ForOfStatement {
        left: Box::new(left),
        right: Box::new(right),
        body: Box::new(body),
        is_await: false,
    }
}

pub fn labeled(label: &str, body: Node) -> Node {
    Node::LabeledStatement {
        label: Box::new(ident(label)),
        body: Box::new(body),
    }
}

pub fn break_stmt(label: Option<&str>) -> Node {
    Node::BreakStatement {
        label: label.map(|l| Box::new(ident(l))),
    }
}

pub fn continue_stmt(label: Option<&str>) -> Node {
    Node::ContinueStatement {
        label: label.map(|l| Box::new(ident(l))),
    }
}
