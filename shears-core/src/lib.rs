//! SHEARS Core Library
//!
//! Core functionality for the SHEARS JavaScript glue optimizer including:
//! - ESTree AST model (read from and written to ESTree JSON)
//! - Tree walk kernel shared by every pass
//! - Conservative side-effect classification
//! - Scope-aware local dead code elimination
//! - Cross-module reachability graph construction and pruning
//! - Deterministic identifier minification
//!
//! The AST is mutated in place by an ordered list of passes (see [`pipeline`]).
//! Deleting a node never unlinks it from its parent: the node is retyped to
//! [`Node::EmptyStatement`] so that every structural slot stays addressable.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumDiscriminants};

pub mod build;
pub mod dce;
pub mod diagnostics;
mod display;
pub mod effects;
pub mod extra_info;
pub mod minify;
pub mod patterns;
pub mod pipeline;
pub mod reachability;
pub mod rename;
pub mod walk;

pub use diagnostics::Diagnostics;
pub use extra_info::ExtraInfo;
pub use pipeline::{Pass, Pipeline, PipelineOptions, PipelineOutput};

/// Hidden state carried by an [`Node::EmptyStatement`]
///
/// Never serialized: a stash only lives between a hide/empty step and the
/// matching restore/repair step of the same pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Stash {
    /// A function subtree hidden by [`walk::hide_scopes`]
    Scope(Box<Node>),
    /// A `VariableDeclaration` emptied by DCE, kept for [`walk::repair_loop_headers`]
    Declaration(Box<Node>),
}

/// `var`, `let` or `const`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

/// Value of a `Literal` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any numeric literal
    Number(f64),
    /// A string literal
    String(String),
    /// Regex and bigint literals, whose JSON value is not meaningful
    Other(serde_json::Value),
}

/// `/pattern/flags`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexLiteral {
    /// Regex source
    pub pattern: String,
    /// Regex flags
    pub flags: String,
}

/// Raw and cooked text of a template chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateValue {
    /// Source text
    pub raw: String,
    /// Escape-processed text
    #[serde(default)]
    pub cooked: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_init() -> String {
    "init".to_string()
}

/// ESTree node
///
/// One variant per supported ESTree node type; the serde tag is the ESTree
/// `type` field, so an acorn-produced JSON AST deserializes directly.
/// Position fields (`start`, `end`, `loc`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type")]
#[strum_discriminants(name(NodeType), derive(Hash, Display))]
pub enum Node {
    /// Script or module root
    Program {
        /// Toplevel statements
        body: Vec<Node>,
        /// `script` or `module`
        #[serde(
            rename = "sourceType",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        source_type: Option<String>,
    },
    /// `;`, also the inert marker left behind by deletion
    EmptyStatement {
        /// Stashed subtree, if this marker hides something
        #[serde(skip)]
        stash: Option<Stash>,
    },
    /// `expr;`
    ExpressionStatement {
        /// The expression
        expression: Box<Node>,
        /// Directive prologue text (`"use strict"`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directive: Option<String>,
    },
    /// `{ ... }`
    BlockStatement {
        /// Statements
        body: Vec<Node>,
    },
    /// `debugger;`
    DebuggerStatement {},
    /// `return arg;`
    ReturnStatement {
        /// Returned value
        argument: Option<Box<Node>>,
    },
    /// `label: body`
    LabeledStatement {
        /// Label identifier
        label: Box<Node>,
        /// Labeled statement
        body: Box<Node>,
    },
    /// `break label;`
    BreakStatement {
        /// Optional label
        label: Option<Box<Node>>,
    },
    /// `continue label;`
    ContinueStatement {
        /// Optional label
        label: Option<Box<Node>>,
    },
    /// `if (test) consequent else alternate`
    IfStatement {
        /// Condition
        test: Box<Node>,
        /// Then branch
        consequent: Box<Node>,
        /// Else branch
        alternate: Option<Box<Node>>,
    },
    /// `switch (discriminant) { cases }`
    SwitchStatement {
        /// Switched value
        discriminant: Box<Node>,
        /// `SwitchCase` nodes
        cases: Vec<Node>,
    },
    /// `case test: consequent` / `default: consequent`
    SwitchCase {
        /// `None` for `default`
        test: Option<Box<Node>>,
        /// Case body
        consequent: Vec<Node>,
    },
    /// `throw arg;`
    ThrowStatement {
        /// Thrown value
        argument: Box<Node>,
    },
    /// `try block catch finally`
    TryStatement {
        /// Protected block
        block: Box<Node>,
        /// `CatchClause`
        handler: Option<Box<Node>>,
        /// `finally` block
        finalizer: Option<Box<Node>>,
    },
    /// `catch (param) body`
    CatchClause {
        /// Bound pattern
        param: Option<Box<Node>>,
        /// Handler block
        body: Box<Node>,
    },
    /// `while (test) body`
    WhileStatement {
        /// Condition
        test: Box<Node>,
        /// Loop body
        body: Box<Node>,
    },
    /// `do body while (test)`
    DoWhileStatement {
        /// Loop body
        body: Box<Node>,
        /// Condition
        test: Box<Node>,
    },
    /// `for (init; test; update) body`
    ForStatement {
        /// Declaration or expression
        init: Option<Box<Node>>,
        /// Condition
        test: Option<Box<Node>>,
        /// Step expression
        update: Option<Box<Node>>,
        /// Loop body
        body: Box<Node>,
    },
    /// `for (left in right) body`
    ForInStatement {
        /// Declaration or assignment target
        left: Box<Node>,
        /// Iterated object
        right: Box<Node>,
        /// Loop body
        body: Box<Node>,
    },
    /// `for (left of right) body`
    ForOfStatement {
        /// Declaration or assignment target
        left: Box<Node>,
        /// Iterated value
        right: Box<Node>,
        /// Loop body
        body: Box<Node>,
        /// `for await`
        #[serde(rename = "await", default)]
        is_await: bool,
    },
    /// `function id(params) body`
    FunctionDeclaration {
        /// Name, absent only for `export default function () {}`
        id: Option<Box<Node>>,
        /// Parameter patterns
        params: Vec<Node>,
        /// `BlockStatement`
        body: Box<Node>,
        /// `function*`
        #[serde(default)]
        generator: bool,
        /// `async function`
        #[serde(rename = "async", default)]
        is_async: bool,
    },
    /// `kind declarations;`
    VariableDeclaration {
        /// `VariableDeclarator` nodes
        declarations: Vec<Node>,
        /// Binding keyword
        kind: VariableKind,
    },
    /// `id = init`
    VariableDeclarator {
        /// Bound pattern
        id: Box<Node>,
        /// Initializer
        init: Option<Box<Node>>,
    },
    /// `class id extends superClass body`
    ClassDeclaration {
        /// Class name
        id: Option<Box<Node>>,
        /// Extended class
        #[serde(rename = "superClass")]
        super_class: Option<Box<Node>>,
        /// `ClassBody`
        body: Box<Node>,
    },
    /// Class expression
    ClassExpression {
        /// Class name
        id: Option<Box<Node>>,
        /// Extended class
        #[serde(rename = "superClass")]
        super_class: Option<Box<Node>>,
        /// `ClassBody`
        body: Box<Node>,
    },
    /// `{ methods }` of a class
    ClassBody {
        /// `MethodDefinition` nodes
        body: Vec<Node>,
    },
    /// Class method, getter, setter or constructor
    MethodDefinition {
        /// Method name
        key: Box<Node>,
        /// `FunctionExpression`
        value: Box<Node>,
        /// `method`, `get`, `set` or `constructor`
        kind: String,
        /// `[key]() {}`
        #[serde(default)]
        computed: bool,
        /// `static`
        #[serde(rename = "static", default)]
        is_static: bool,
    },
    /// Class field, `name = value`
    PropertyDefinition {
        /// Field name
        key: Box<Node>,
        /// Initializer
        value: Option<Box<Node>>,
        /// `[key] = value`
        #[serde(default)]
        computed: bool,
        #[serde(rename = "static", default)]
        is_static: bool,
    },
    /// `#name` in a class body or member access
    PrivateIdentifier {
        name: String,
    },
    /// `static { body }` in a class body
    StaticBlock {
        body: Vec<Node>,
    },
    /// A name
    Identifier {
        /// Identifier text
        name: String,
    },
    /// String, number, boolean, null or regex literal
    Literal {
        /// Literal value
        value: LiteralValue,
        /// Source text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
        /// Regex parts
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<RegexLiteral>,
        /// Bigint digits
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bigint: Option<String>,
    },
    /// `this`
    ThisExpression {},
    /// `super`
    Super {},
    /// `[a, , b]`
    ArrayExpression {
        /// Elements, `None` for holes
        elements: Vec<Option<Node>>,
    },
    /// `{ properties }`
    ObjectExpression {
        /// `Property` and `SpreadElement` nodes
        properties: Vec<Node>,
    },
    /// `key: value` in an object literal or object pattern
    Property {
        /// Property name
        key: Box<Node>,
        /// Property value or bound pattern
        value: Box<Node>,
        /// `init`, `get` or `set`
        #[serde(default = "default_init")]
        kind: String,
        /// `[key]: value`
        #[serde(default)]
        computed: bool,
        /// `key() {}`
        #[serde(default)]
        method: bool,
        /// `{ key }`
        #[serde(default)]
        shorthand: bool,
    },
    /// `function id(params) body` in expression position
    FunctionExpression {
        /// Optional name (only visible inside the function)
        id: Option<Box<Node>>,
        /// Parameter patterns
        params: Vec<Node>,
        /// `BlockStatement`
        body: Box<Node>,
        /// `function*`
        #[serde(default)]
        generator: bool,
        /// `async function`
        #[serde(rename = "async", default)]
        is_async: bool,
    },
    /// `(params) => body`
    ArrowFunctionExpression {
        /// Parameter patterns
        params: Vec<Node>,
        /// `BlockStatement` or expression
        body: Box<Node>,
        /// Expression-bodied arrow
        #[serde(default)]
        expression: bool,
        /// `async () => {}`
        #[serde(rename = "async", default)]
        is_async: bool,
    },
    /// `op argument`
    UnaryExpression {
        /// `-`, `+`, `!`, `~`, `typeof`, `void`, `delete`
        operator: String,
        /// Always true for unary operators
        #[serde(default = "default_true")]
        prefix: bool,
        /// Operand
        argument: Box<Node>,
    },
    /// `++x`, `x--`
    UpdateExpression {
        /// `++` or `--`
        operator: String,
        /// Prefix form
        #[serde(default)]
        prefix: bool,
        /// Updated target
        argument: Box<Node>,
    },
    /// `left op right`
    BinaryExpression {
        /// Operator text
        operator: String,
        /// Left operand
        left: Box<Node>,
        /// Right operand
        right: Box<Node>,
    },
    /// `left && right`, `left || right`, `left ?? right`
    LogicalExpression {
        /// Operator text
        operator: String,
        /// Left operand
        left: Box<Node>,
        /// Right operand
        right: Box<Node>,
    },
    /// `left op= right`
    AssignmentExpression {
        /// `=`, `+=`, ...
        operator: String,
        /// Target
        left: Box<Node>,
        /// Assigned value
        right: Box<Node>,
    },
    /// `test ? consequent : alternate`
    ConditionalExpression {
        /// Condition
        test: Box<Node>,
        /// Value if true
        consequent: Box<Node>,
        /// Value if false
        alternate: Box<Node>,
    },
    /// `callee(arguments)`
    CallExpression {
        /// Called value
        callee: Box<Node>,
        /// Arguments
        arguments: Vec<Node>,
        /// `callee?.()`
        #[serde(default)]
        optional: bool,
    },
    /// `new callee(arguments)`
    NewExpression {
        /// Constructor
        callee: Box<Node>,
        /// Arguments
        arguments: Vec<Node>,
    },
    /// `object.property` or `object[property]`
    MemberExpression {
        /// Accessed object
        object: Box<Node>,
        /// Property name or key expression
        property: Box<Node>,
        /// `object[property]`
        #[serde(default)]
        computed: bool,
        /// `object?.property`
        #[serde(default)]
        optional: bool,
    },
    /// Wrapper around an optional chain
    ChainExpression {
        /// Chain
        expression: Box<Node>,
    },
    /// `a, b, c`
    SequenceExpression {
        /// Expressions in order
        expressions: Vec<Node>,
    },
    /// `(expr)`, only present when the parser preserves parentheses
    ParenthesizedExpression {
        /// Inner expression
        expression: Box<Node>,
    },
    /// `...argument`
    SpreadElement {
        /// Spread value
        argument: Box<Node>,
    },
    /// `yield argument`
    YieldExpression {
        /// Yielded value
        argument: Option<Box<Node>>,
        /// `yield*`
        #[serde(default)]
        delegate: bool,
    },
    /// `await argument`
    AwaitExpression {
        /// Awaited value
        argument: Box<Node>,
    },
    /// `` `quasi${expr}quasi` ``
    TemplateLiteral {
        /// `TemplateElement` chunks
        quasis: Vec<Node>,
        /// Interpolated expressions
        expressions: Vec<Node>,
    },
    /// `` tag`...` ``
    TaggedTemplateExpression {
        /// Tag function
        tag: Box<Node>,
        /// `TemplateLiteral`
        quasi: Box<Node>,
    },
    /// One literal chunk of a template
    TemplateElement {
        /// Chunk text
        value: TemplateValue,
        /// Last chunk
        #[serde(default)]
        tail: bool,
    },
    /// `new.target`, `import.meta`
    MetaProperty {
        /// `new` / `import`
        meta: Box<Node>,
        /// `target` / `meta`
        property: Box<Node>,
    },
    /// `import(source)`
    ImportExpression {
        /// Module specifier
        source: Box<Node>,
    },
    /// `left = right` in a pattern
    AssignmentPattern {
        /// Bound pattern
        left: Box<Node>,
        /// Default value
        right: Box<Node>,
    },
    /// `[a, b]` in a pattern
    ArrayPattern {
        /// Element patterns, `None` for holes
        elements: Vec<Option<Node>>,
    },
    /// `{ a, b: c }` in a pattern
    ObjectPattern {
        /// `Property` and `RestElement` nodes
        properties: Vec<Node>,
    },
    /// `...argument` in a pattern
    RestElement {
        /// Bound pattern
        argument: Box<Node>,
    },
    /// `export declaration` / `export { specifiers }`
    ExportNamedDeclaration {
        /// Exported declaration
        declaration: Option<Box<Node>>,
        /// `ExportSpecifier` nodes
        #[serde(default)]
        specifiers: Vec<Node>,
        /// Re-export source
        source: Option<Box<Node>>,
    },
    /// `export default declaration`
    ExportDefaultDeclaration {
        /// Exported declaration or expression
        declaration: Box<Node>,
    },
    /// `local as exported`
    ExportSpecifier {
        /// Local binding
        local: Box<Node>,
        /// Exported name
        exported: Box<Node>,
    },
    /// `export * from source` / `export * as exported from source`
    ExportAllDeclaration {
        exported: Option<Box<Node>>,
        source: Box<Node>,
    },
    /// `import specifiers from source`
    ImportDeclaration {
        #[serde(default)]
        specifiers: Vec<Node>,
        source: Box<Node>,
    },
    /// `imported as local`
    ImportSpecifier {
        /// Name in the source module
        imported: Box<Node>,
        /// Local binding
        local: Box<Node>,
    },
    /// `import local from ...`
    ImportDefaultSpecifier {
        local: Box<Node>,
    },
    /// `import * as local from ...`
    ImportNamespaceSpecifier {
        local: Box<Node>,
    },
}

/// Visits the direct children of a node in source order. The match arms are
/// shared by the `&Node` and `&mut Node` versions through match ergonomics.
macro_rules! visit_children {
    ($node:expr, $f:expr) => {
        match $node {
            Node::Program { body, .. }
            | Node::BlockStatement { body }
            | Node::ClassBody { body }
            | Node::StaticBlock { body } => {
                for child in body {
                    $f(child);
                }
            }
            Node::EmptyStatement { .. }
            | Node::DebuggerStatement {}
            | Node::Identifier { .. }
            | Node::PrivateIdentifier { .. }
            | Node::Literal { .. }
            | Node::ThisExpression {}
            | Node::Super {}
            | Node::TemplateElement { .. } => {}
            Node::ExpressionStatement { expression, .. }
            | Node::ChainExpression { expression }
            | Node::ParenthesizedExpression { expression } => $f(expression),
            Node::ReturnStatement { argument } | Node::YieldExpression { argument, .. } => {
                if let Some(argument) = argument {
                    $f(argument);
                }
            }
            Node::ThrowStatement { argument }
            | Node::UnaryExpression { argument, .. }
            | Node::UpdateExpression { argument, .. }
            | Node::SpreadElement { argument }
            | Node::AwaitExpression { argument }
            | Node::RestElement { argument } => $f(argument),
            Node::LabeledStatement { label, body } => {
                $f(label);
                $f(body);
            }
            Node::BreakStatement { label } | Node::ContinueStatement { label } => {
                if let Some(label) = label {
                    $f(label);
                }
            }
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                $f(test);
                $f(consequent);
                if let Some(alternate) = alternate {
                    $f(alternate);
                }
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => {
                $f(discriminant);
                for case in cases {
                    $f(case);
                }
            }
            Node::SwitchCase { test, consequent } => {
                if let Some(test) = test {
                    $f(test);
                }
                for child in consequent {
                    $f(child);
                }
            }
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                $f(block);
                if let Some(handler) = handler {
                    $f(handler);
                }
                if let Some(finalizer) = finalizer {
                    $f(finalizer);
                }
            }
            Node::CatchClause { param, body } => {
                if let Some(param) = param {
                    $f(param);
                }
                $f(body);
            }
            Node::WhileStatement { test, body } => {
                $f(test);
                $f(body);
            }
            Node::DoWhileStatement { body, test } => {
                $f(body);
                $f(test);
            }
            Node::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init {
                    $f(init);
                }
                if let Some(test) = test {
                    $f(test);
                }
                if let Some(update) = update {
                    $f(update);
                }
                $f(body);
            }
            Node::ForInStatement { left, right, body }
            | Node::ForOfStatement {
                left, right, body, ..
            } => {
                $f(left);
                $f(right);
                $f(body);
            }
            Node::FunctionDeclaration {
                id, params, body, ..
            }
            | Node::FunctionExpression {
                id, params, body, ..
            } => {
                if let Some(id) = id {
                    $f(id);
                }
                for param in params {
                    $f(param);
                }
                $f(body);
            }
            Node::ArrowFunctionExpression { params, body, .. } => {
                for param in params {
                    $f(param);
                }
                $f(body);
            }
            Node::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    $f(declarator);
                }
            }
            Node::VariableDeclarator { id, init } => {
                $f(id);
                if let Some(init) = init {
                    $f(init);
                }
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
                if let Some(id) = id {
                    $f(id);
                }
                if let Some(super_class) = super_class {
                    $f(super_class);
                }
                $f(body);
            }
            Node::MethodDefinition { key, value, .. } | Node::Property { key, value, .. } => {
                $f(key);
                $f(value);
            }
            Node::PropertyDefinition { key, value, .. } => {
                $f(key);
                if let Some(value) = value {
                    $f(value);
                }
            }
            Node::ArrayExpression { elements } | Node::ArrayPattern { elements } => {
                for element in elements {
                    if let Some(element) = element {
                        $f(element);
                    }
                }
            }
            Node::ObjectExpression { properties } | Node::ObjectPattern { properties } => {
                for property in properties {
                    $f(property);
                }
            }
            Node::BinaryExpression { left, right, .. }
            | Node::LogicalExpression { left, right, .. }
            | Node::AssignmentExpression { left, right, .. }
            | Node::AssignmentPattern { left, right } => {
                $f(left);
                $f(right);
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                $f(test);
                $f(consequent);
                $f(alternate);
            }
            Node::CallExpression {
                callee, arguments, ..
            }
            | Node::NewExpression { callee, arguments } => {
                $f(callee);
                for argument in arguments {
                    $f(argument);
                }
            }
            Node::MemberExpression {
                object, property, ..
            } => {
                $f(object);
                $f(property);
            }
            Node::SequenceExpression { expressions } => {
                for expression in expressions {
                    $f(expression);
                }
            }
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => {
                for quasi in quasis {
                    $f(quasi);
                }
                for expression in expressions {
                    $f(expression);
                }
            }
            Node::TaggedTemplateExpression { tag, quasi } => {
                $f(tag);
                $f(quasi);
            }
            Node::MetaProperty { meta, property } => {
                $f(meta);
                $f(property);
            }
            Node::ImportExpression { source } => $f(source),
            Node::ExportNamedDeclaration {
                declaration,
                specifiers,
                source,
            } => {
                if let Some(declaration) = declaration {
                    $f(declaration);
                }
                for specifier in specifiers {
                    $f(specifier);
                }
                if let Some(source) = source {
                    $f(source);
                }
            }
            Node::ExportDefaultDeclaration { declaration } => $f(declaration),
            Node::ExportSpecifier { local, exported } => {
                $f(local);
                $f(exported);
            }
            Node::ExportAllDeclaration { exported, source } => {
                if let Some(exported) = exported {
                    $f(exported);
                }
                $f(source);
            }
            Node::ImportDeclaration { specifiers, source } => {
                for specifier in specifiers {
                    $f(specifier);
                }
                $f(source);
            }
            Node::ImportSpecifier { imported, local } => {
                $f(imported);
                $f(local);
            }
            Node::ImportDefaultSpecifier { local } | Node::ImportNamespaceSpecifier { local } => {
                $f(local)
            }
        }
    };
}

impl Node {
    /// The inert marker every deletion leaves behind
    pub fn empty() -> Node {
        Node::EmptyStatement { stash: None }
    }

    /// Retype this node to the empty marker, dropping its children
    pub fn empty_out(&mut self) {
        *self = Node::empty();
    }

    /// True for `EmptyStatement`, stashed or not
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::EmptyStatement { .. })
    }

    /// The node's type tag
    pub fn node_type(&self) -> NodeType {
        NodeType::from(self)
    }

    /// Name of an `Identifier` node
    pub fn identifier_name(&self) -> Option<&str> {
        match self {
            Node::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// True if this is an `Identifier` called `name`
    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifier_name() == Some(name)
    }

    /// Value of a string `Literal`
    pub fn string_literal(&self) -> Option<&str> {
        match self {
            Node::Literal {
                value: LiteralValue::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }

    /// True for function declarations, function expressions and arrows
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Node::FunctionDeclaration { .. }
                | Node::FunctionExpression { .. }
                | Node::ArrowFunctionExpression { .. }
        )
    }

    /// Toplevel statements of a `Program`
    pub fn program_body_mut(&mut self) -> anyhow::Result<&mut Vec<Node>> {
        match self {
            Node::Program { body, .. } => Ok(body),
            other => anyhow::bail!("expected a Program node, found {}", other.node_type()),
        }
    }

    /// Call `f` on each direct child, in source order
    pub fn for_each_child(&self, f: &mut dyn FnMut(&Node)) {
        visit_children!(self, f)
    }

    /// Call `f` on each direct child mutably, in source order
    pub fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        visit_children!(self, f)
    }
}
