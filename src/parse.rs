//! Parse Module
//!
//! Reads a JSX/TSX component module with oxc and lowers its render output
//! into the template IR defined in `validate`.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use std::collections::HashMap;
use tracing::debug;

use crate::transform::TransformOptions;
use crate::validate::{
    AttributeIR, AttributeValue, CompilerError, ComponentIR, ElementNode, ExpressionNode,
    FragmentNode, RenderKind, SourceLocation, TemplateNode, TextNode, ERR_NO_DEFAULT_EXPORT,
    ERR_NO_RENDER_ROOT, ERR_PARSE,
};
use crate::visitor::{walk_children_mut, TemplateVisitorMut};

/// Import extensions treated as stylesheets.
pub const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less", "styl"];

pub fn is_component_tag(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

fn is_style_import(source: &str) -> bool {
    source.starts_with('.')
        && source
            .rsplit_once('.')
            .map_or(false, |(_, ext)| STYLE_EXTENSIONS.contains(&ext))
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCAL DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Something in the module that can produce JSX.
#[derive(Clone, Copy)]
enum Declared<'s, 'a> {
    Function(&'s Function<'a>),
    Arrow(&'s ArrowFunctionExpression<'a>),
    Class(&'s Class<'a>),
}

impl<'s, 'a> Declared<'s, 'a> {
    fn render_kind(self) -> RenderKind {
        match self {
            Declared::Function(_) => RenderKind::Function,
            Declared::Arrow(_) => RenderKind::Arrow,
            Declared::Class(_) => RenderKind::ClassRender,
        }
    }

    fn name(self) -> Option<String> {
        match self {
            Declared::Function(f) => f.id.as_ref().map(|id| id.name.to_string()),
            Declared::Class(c) => c.id.as_ref().map(|id| id.name.to_string()),
            Declared::Arrow(_) => None,
        }
    }

    fn span(self) -> Span {
        match self {
            Declared::Function(f) => f.span,
            Declared::Arrow(a) => a.span,
            Declared::Class(c) => c.span,
        }
    }

    /// The expression this declaration renders, parentheses removed.
    fn render_output(self) -> Option<&'s Expression<'a>> {
        let output = match self {
            Declared::Function(f) => first_return(&f.body.as_ref()?.statements),
            Declared::Arrow(a) => arrow_output(a),
            Declared::Class(c) => {
                let render = class_method(c, "render")?;
                first_return(&render.body.as_ref()?.statements)
            }
        }?;
        Some(unwrap_parens(output))
    }
}

fn first_return<'s, 'a>(statements: &'s [Statement<'a>]) -> Option<&'s Expression<'a>> {
    statements.iter().find_map(|stmt| match stmt {
        Statement::ReturnStatement(ret) => ret.argument.as_ref(),
        _ => None,
    })
}

fn arrow_output<'s, 'a>(arrow: &'s ArrowFunctionExpression<'a>) -> Option<&'s Expression<'a>> {
    if arrow.expression {
        match arrow.body.statements.first() {
            Some(Statement::ExpressionStatement(stmt)) => Some(&stmt.expression),
            _ => None,
        }
    } else {
        first_return(&arrow.body.statements)
    }
}

fn unwrap_parens<'s, 'a>(mut expr: &'s Expression<'a>) -> &'s Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &paren.expression;
    }
    expr
}

fn property_key_name<'s>(key: &'s PropertyKey) -> Option<&'s str> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.as_str()),
        _ => None,
    }
}

fn class_method<'s, 'a>(class: &'s Class<'a>, name: &str) -> Option<&'s Function<'a>> {
    class.body.body.iter().find_map(|element| match element {
        ClassElement::MethodDefinition(method) if property_key_name(&method.key) == Some(name) => {
            Some(&*method.value)
        }
        _ => None,
    })
}

fn declared_from_expression<'s, 'a>(expr: &'s Expression<'a>) -> Option<Declared<'s, 'a>> {
    match unwrap_parens(expr) {
        Expression::ArrowFunctionExpression(arrow) => Some(Declared::Arrow(arrow)),
        Expression::FunctionExpression(func) => Some(Declared::Function(func)),
        Expression::ClassExpression(class) => Some(Declared::Class(class)),
        _ => None,
    }
}

#[derive(Default)]
struct LocalScope<'s, 'a> {
    /// Top-level functions, function-valued consts and classes.
    declarations: HashMap<String, Declared<'s, 'a>>,
    /// Class methods and arrow-valued class properties, reachable via `this.x()`.
    methods: HashMap<String, Declared<'s, 'a>>,
}

impl<'s, 'a> LocalScope<'s, 'a> {
    fn collect(body: &'s [Statement<'a>]) -> Self {
        let mut scope = LocalScope::default();
        for stmt in body {
            match stmt {
                Statement::FunctionDeclaration(func) => scope.add_function(func),
                Statement::ClassDeclaration(class) => scope.add_class(class),
                Statement::VariableDeclaration(var) => scope.add_variables(var),
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(Declaration::FunctionDeclaration(func)) => scope.add_function(func),
                    Some(Declaration::ClassDeclaration(class)) => scope.add_class(class),
                    Some(Declaration::VariableDeclaration(var)) => scope.add_variables(var),
                    _ => {}
                },
                Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        scope.add_function(func)
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => scope.add_class(class),
                    _ => {}
                },
                _ => {}
            }
        }
        scope
    }

    fn add_function(&mut self, func: &'s Function<'a>) {
        if let Some(id) = &func.id {
            self.declarations
                .insert(id.name.to_string(), Declared::Function(func));
        }
    }

    fn add_class(&mut self, class: &'s Class<'a>) {
        if let Some(id) = &class.id {
            self.declarations
                .insert(id.name.to_string(), Declared::Class(class));
        }
        for element in &class.body.body {
            match element {
                ClassElement::MethodDefinition(method) => {
                    if let Some(name) = property_key_name(&method.key) {
                        self.methods
                            .insert(name.to_string(), Declared::Function(&method.value));
                    }
                }
                ClassElement::PropertyDefinition(prop) => {
                    let declared = prop.value.as_ref().and_then(declared_from_expression);
                    if let (Some(name), Some(declared)) = (property_key_name(&prop.key), declared) {
                        self.methods.insert(name.to_string(), declared);
                    }
                }
                _ => {}
            }
        }
    }

    fn add_variables(&mut self, var: &'s VariableDeclaration<'a>) {
        for decl in &var.declarations {
            if let (BindingPattern::BindingIdentifier(id), Some(init)) = (&decl.id, &decl.init) {
                if let Some(declared) = declared_from_expression(init) {
                    self.declarations.insert(id.name.to_string(), declared);
                }
            }
        }
    }
}

fn find_default_export<'s, 'a>(
    body: &'s [Statement<'a>],
    scope: &LocalScope<'s, 'a>,
) -> Option<Declared<'s, 'a>> {
    body.iter().find_map(|stmt| {
        let Statement::ExportDefaultDeclaration(export) = stmt else {
            return None;
        };
        match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => Some(Declared::Function(func)),
            ExportDefaultDeclarationKind::ClassDeclaration(class) => Some(Declared::Class(class)),
            ExportDefaultDeclarationKind::ArrowFunctionExpression(arrow) => {
                Some(Declared::Arrow(arrow))
            }
            ExportDefaultDeclarationKind::FunctionExpression(func) => Some(Declared::Function(func)),
            ExportDefaultDeclarationKind::Identifier(id) => {
                scope.declarations.get(id.name.as_str()).copied()
            }
            ExportDefaultDeclarationKind::ParenthesizedExpression(paren) => {
                declared_from_expression(&paren.expression)
            }
            _ => None,
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

struct TreeBuilder<'s, 'a> {
    source: &'s str,
    scope: &'s LocalScope<'s, 'a>,
    native_components: &'s [String],
    /// Names currently being expanded; never re-entered.
    expanding: Vec<String>,
}

impl<'s, 'a> TreeBuilder<'s, 'a> {
    fn text(&self, span: Span) -> String {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
            .to_string()
    }

    fn location(&self, offset: u32) -> SourceLocation {
        SourceLocation::from_offset(self.source, offset)
    }

    fn expression_node(&self, expr: &Expression<'a>) -> TemplateNode {
        let span = expr.span();
        TemplateNode::Expression(ExpressionNode {
            code: self.text(span),
            location: self.location(span.start),
        })
    }

    /// Inline the output of a local declaration as a fragment named after it.
    fn expand(&mut self, name: &str, declared: Declared<'s, 'a>, offset: u32) -> Option<TemplateNode> {
        if self.expanding.iter().any(|n| n == name) {
            debug!(name, "skipping recursive expansion");
            return None;
        }
        let output = declared.render_output()?;

        self.expanding.push(name.to_string());
        let children = self.jsx_nodes(output);
        self.expanding.pop();

        Some(TemplateNode::Fragment(FragmentNode {
            source: Some(name.to_string()),
            children: children?,
            location: self.location(offset),
        }))
    }

    fn build_expression(&mut self, expr: &'s Expression<'a>) -> Vec<TemplateNode> {
        self.jsx_nodes(expr)
            .unwrap_or_else(|| vec![self.expression_node(expr)])
    }

    /// Template nodes for an expression that yields JSX, or `None` when no JSX
    /// is reachable through the forms we understand.
    fn jsx_nodes(&mut self, expr: &'s Expression<'a>) -> Option<Vec<TemplateNode>> {
        match unwrap_parens(expr) {
            Expression::JSXElement(element) => Some(vec![self.build_element(element)]),
            Expression::JSXFragment(fragment) => Some(vec![TemplateNode::Fragment(FragmentNode {
                source: None,
                children: self.build_children(&fragment.children),
                location: self.location(fragment.span.start),
            })]),
            Expression::LogicalExpression(logical) => {
                let left = self.jsx_nodes(&logical.left);
                let right = self.jsx_nodes(&logical.right);
                merge_branches(left, right)
            }
            Expression::ConditionalExpression(cond) => {
                let consequent = self.jsx_nodes(&cond.consequent);
                let alternate = self.jsx_nodes(&cond.alternate);
                merge_branches(consequent, alternate)
            }
            Expression::CallExpression(call) => self.call_nodes(call),
            _ => None,
        }
    }

    fn call_nodes(&mut self, call: &'s CallExpression<'a>) -> Option<Vec<TemplateNode>> {
        match &call.callee {
            Expression::Identifier(id) => {
                let declared = *self.scope.declarations.get(id.name.as_str())?;
                let node = self.expand(id.name.as_str(), declared, call.span.start)?;
                Some(vec![node])
            }
            Expression::StaticMemberExpression(member) => {
                let name = member.property.name.as_str();
                if matches!(member.object, Expression::ThisExpression(_)) {
                    let declared = *self.scope.methods.get(name)?;
                    let node = self.expand(name, declared, call.span.start)?;
                    return Some(vec![node]);
                }
                if name == "map" {
                    let callback = call.arguments.first()?.as_expression()?;
                    let output = declared_from_expression(callback)?.render_output()?;
                    return self.jsx_nodes(output);
                }
                None
            }
            _ => None,
        }
    }

    fn build_children(&mut self, children: &'s [JSXChild<'a>]) -> Vec<TemplateNode> {
        let mut nodes = Vec::new();
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    let value = text.value.trim();
                    if !value.is_empty() {
                        nodes.push(TemplateNode::Text(TextNode {
                            value: value.to_string(),
                            location: self.location(text.span.start),
                        }));
                    }
                }
                JSXChild::Element(element) => nodes.push(self.build_element(element)),
                JSXChild::Fragment(fragment) => nodes.push(TemplateNode::Fragment(FragmentNode {
                    source: None,
                    children: self.build_children(&fragment.children),
                    location: self.location(fragment.span.start),
                })),
                JSXChild::ExpressionContainer(container) => {
                    if let Some(expr) = container.expression.as_expression() {
                        nodes.extend(self.build_expression(expr));
                    }
                }
                JSXChild::Spread(spread) => nodes.push(TemplateNode::Expression(ExpressionNode {
                    code: self.text(spread.span),
                    location: self.location(spread.span.start),
                })),
            }
        }
        nodes
    }

    fn build_attributes(&self, opening: &JSXOpeningElement<'a>) -> Vec<AttributeIR> {
        opening
            .attributes
            .iter()
            .map(|item| match item {
                JSXAttributeItem::Attribute(attr) => {
                    let name = match &attr.name {
                        JSXAttributeName::Identifier(id) => id.name.to_string(),
                        JSXAttributeName::NamespacedName(ns) => {
                            format!("{}:{}", ns.namespace.name, ns.name.name)
                        }
                    };
                    AttributeIR {
                        name,
                        value: self.attribute_value(attr.value.as_ref()),
                        location: self.location(attr.span.start),
                    }
                }
                JSXAttributeItem::SpreadAttribute(spread) => AttributeIR {
                    name: "...".to_string(),
                    value: AttributeValue::Dynamic(self.text(spread.argument.span())),
                    location: self.location(spread.span.start),
                },
            })
            .collect()
    }

    fn attribute_value(&self, value: Option<&JSXAttributeValue<'a>>) -> AttributeValue {
        match value {
            None => AttributeValue::Boolean,
            Some(JSXAttributeValue::StringLiteral(s)) => AttributeValue::Static(s.value.to_string()),
            Some(JSXAttributeValue::ExpressionContainer(container)) => {
                match container.expression.as_expression().map(unwrap_parens) {
                    Some(Expression::StringLiteral(s)) => AttributeValue::Static(s.value.to_string()),
                    Some(Expression::TemplateLiteral(tpl)) if tpl.expressions.is_empty() => {
                        let text = tpl
                            .quasis
                            .first()
                            .map(|q| q.value.cooked.as_ref().unwrap_or(&q.value.raw).to_string())
                            .unwrap_or_default();
                        AttributeValue::Static(text)
                    }
                    Some(expr) => AttributeValue::Dynamic(self.text(expr.span())),
                    None => AttributeValue::Dynamic(String::new()),
                }
            }
            Some(other) => AttributeValue::Dynamic(self.text(other.span())),
        }
    }

    fn build_element(&mut self, element: &'s JSXElement<'a>) -> TemplateNode {
        let opening = &element.opening_element;
        let tag = tag_name(&opening.name);
        let span_start = opening.span.start;
        let is_component = is_component_tag(&tag);

        if is_component && !self.native_components.iter().any(|n| *n == tag) {
            if let Some(declared) = self.scope.declarations.get(tag.as_str()).copied() {
                if let Some(node) = self.expand(&tag, declared, span_start) {
                    return node;
                }
            }
        }

        TemplateNode::Element(ElementNode {
            tag,
            is_component,
            attributes: self.build_attributes(opening),
            children: self.build_children(&element.children),
            span_start,
            location: self.location(span_start),
            in_compile_mode: false,
        })
    }
}

/// Marks `compileMode` subtrees once the tree is built.
#[derive(Default)]
struct CompileModeMarker {
    depth: usize,
    roots: Vec<u32>,
}

impl TemplateVisitorMut for CompileModeMarker {
    fn visit_element_mut(&mut self, element: &mut ElementNode) {
        let is_root = element.has_boolean_attribute("compileMode");
        if is_root {
            self.roots.push(element.span_start);
            self.depth += 1;
        }
        element.in_compile_mode = self.depth > 0;
        walk_children_mut(self, &mut element.children);
        if is_root {
            self.depth -= 1;
        }
    }
}

fn merge_branches(a: Option<Vec<TemplateNode>>, b: Option<Vec<TemplateNode>>) -> Option<Vec<TemplateNode>> {
    match (a, b) {
        (None, None) => None,
        (a, b) => {
            let mut nodes = a.unwrap_or_default();
            nodes.extend(b.unwrap_or_default());
            Some(nodes)
        }
    }
}

fn tag_name(name: &JSXElementName) -> String {
    match name {
        JSXElementName::Identifier(id) => id.name.to_string(),
        JSXElementName::IdentifierReference(id) => id.name.to_string(),
        JSXElementName::NamespacedName(ns) => format!("{}:{}", ns.namespace.name, ns.name.name),
        JSXElementName::MemberExpression(member) => member_tag_name(member),
        JSXElementName::ThisExpression(_) => "this".to_string(),
    }
}

fn member_tag_name(member: &JSXMemberExpression) -> String {
    let object = match &member.object {
        JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
        JSXMemberExpressionObject::MemberExpression(inner) => member_tag_name(inner),
        JSXMemberExpressionObject::ThisExpression(_) => "this".to_string(),
    };
    format!("{}.{}", object, member.property.name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parse_component(
    source: &str,
    file_path: &str,
    options: &TransformOptions,
) -> Result<ComponentIR, CompilerError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true);
    let ret = Parser::new(&allocator, source, source_type).parse();

    if let Some(first) = ret.errors.first() {
        let offset = first
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset() as u32)
            .unwrap_or(0);
        let location = SourceLocation::from_offset(source, offset);
        return Err(CompilerError::detached(ERR_PARSE, &first.to_string())
            .located(file_path, &location)
            .with_hint(format!("{} parse error(s) in total", ret.errors.len())));
    }

    let body = &ret.program.body;

    let mut style_imports = Vec::new();
    let mut native_components = Vec::new();
    for stmt in body.iter() {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        let from = import.source.value.as_str();
        if is_style_import(from) {
            style_imports.push(from.to_string());
        }
        if !options.native_component_sources.iter().any(|s| s == from) {
            continue;
        }
        for specifier in import.specifiers.iter().flatten() {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    native_components.push(s.local.name.to_string())
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    native_components.push(s.local.name.to_string())
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => {}
            }
        }
    }

    let scope = LocalScope::collect(body);
    let Some(component) = find_default_export(body, &scope) else {
        return Err(CompilerError::new(
            ERR_NO_DEFAULT_EXPORT,
            "Module has no default-exported component",
            file_path,
            1,
            1,
        )
        .with_hint("Export the component with `export default`."));
    };

    let render_location = SourceLocation::from_offset(source, component.span().start);
    let Some(output) = component.render_output() else {
        return Err(CompilerError::detached(
            ERR_NO_RENDER_ROOT,
            "Default export does not return anything",
        )
        .located(file_path, &render_location));
    };
    if !matches!(output, Expression::JSXElement(_) | Expression::JSXFragment(_)) {
        let span = output.span();
        return Err(CompilerError::detached(
            ERR_NO_RENDER_ROOT,
            "Default export must return a JSX element or fragment",
        )
        .located(file_path, &SourceLocation::from_offset(source, span.start))
        .with_context(source.get(span.start as usize..span.end as usize).unwrap_or_default()));
    }

    let mut builder = TreeBuilder {
        source,
        scope: &scope,
        native_components: &native_components,
        expanding: component.name().into_iter().collect(),
    };
    let mut root = builder.jsx_nodes(output).and_then(|mut nodes| nodes.pop());

    let mut marker = CompileModeMarker::default();
    if let Some(root) = root.as_mut() {
        marker.visit_node_mut(root);
    }
    let compile_mode_roots = marker.roots;

    debug!(
        file = file_path,
        styles = style_imports.len(),
        natives = native_components.len(),
        compile_mode_roots = compile_mode_roots.len(),
        "parsed component"
    );

    Ok(ComponentIR {
        file_path: file_path.to_string(),
        name: component.name(),
        render_kind: component.render_kind(),
        root,
        style_imports,
        native_components,
        compile_mode_roots,
    })
}
