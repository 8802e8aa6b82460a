#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::class_list::parse_class_list;
use crate::color::Rgba;
use crate::value::parse_value;
use crate::visitor::{walk_element, TemplateVisitor};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "S-ERR-PARSE-001";
pub const ERR_NO_DEFAULT_EXPORT: &str = "S-ERR-EXPORT-001";
pub const ERR_NO_RENDER_ROOT: &str = "S-ERR-RENDER-001";
pub const ERR_CLASS_UNBALANCED: &str = "S-ERR-CLASS-001";
pub const ERR_CLASS_TOKEN: &str = "S-ERR-CLASS-002";
pub const ERR_VALUE_SYNTAX: &str = "S-ERR-VALUE-001";
pub const ERR_COLOR_ARGUMENTS: &str = "S-ERR-COLOR-001";
pub const ERR_COLOR_RANGE: &str = "S-ERR-COLOR-002";
pub const ERR_STYLESHEET: &str = "S-ERR-STYLE-001";
pub const ERR_DYNAMIC_STYLE: &str = "S-ERR-STYLE-002";
pub const ERR_IO: &str = "S-ERR-IO-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "Only syntactically valid JSX/TSX modules are transformed.",
        ERR_NO_DEFAULT_EXPORT => "Every transformed module default-exports one component.",
        ERR_NO_RENDER_ROOT => "A component's render output is a JSX element or fragment.",
        ERR_CLASS_UNBALANCED => "Brackets and parentheses inside class lists are balanced.",
        ERR_CLASS_TOKEN => "Every class token has a non-empty name and value.",
        ERR_VALUE_SYNTAX => "Arbitrary values are complete, well-formed expressions.",
        ERR_COLOR_ARGUMENTS => "Color functions receive the number and kind of arguments they accept.",
        ERR_COLOR_RANGE => "Color channels and alpha stay inside their legal ranges.",
        ERR_STYLESHEET => "Stylesheets have balanced rule blocks.",
        ERR_DYNAMIC_STYLE => "Resolved styles are only merged into inline styles whose shape is known.",
        ERR_IO => "Source files are readable and outputs are writable.",
        _ => "Unknown invariant.",
    }
}

fn get_error_type(code: &str) -> &'static str {
    match code {
        ERR_PARSE | ERR_NO_DEFAULT_EXPORT | ERR_NO_RENDER_ROOT => "PARSE_ERROR",
        ERR_CLASS_UNBALANCED | ERR_CLASS_TOKEN => "CLASS_SYNTAX",
        ERR_VALUE_SYNTAX => "VALUE_SYNTAX",
        ERR_COLOR_ARGUMENTS | ERR_COLOR_RANGE => "INVALID_COLOR",
        ERR_STYLESHEET => "STYLESHEET_SYNTAX",
        ERR_DYNAMIC_STYLE => "STYLE_MERGE",
        ERR_IO => "IO_ERROR",
        _ => "COMPILER_ERROR",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message} ({file}:{line}:{column})")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    /// Error raised by a pure parsing helper that has no file context yet.
    /// Callers attach one with [`CompilerError::located`].
    pub fn detached(code: &str, message: &str) -> Self {
        Self::new(code, message, "", 0, 0)
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: get_error_type(code).to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    pub fn located(mut self, file: &str, location: &SourceLocation) -> Self {
        self.file = file.to_string();
        self.line = location.line;
        self.column = location.column;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// 1-based line/column of a byte offset. Columns count characters.
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = (offset as usize).min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() as u32 + 1;
        SourceLocation { line, column }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RenderKind {
    Function,
    Arrow,
    ClassRender,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentIR {
    pub file_path: String,
    pub name: Option<String>,
    pub render_kind: RenderKind,
    pub root: Option<TemplateNode>,
    pub style_imports: Vec<String>,
    pub native_components: Vec<String>,
    pub compile_mode_roots: Vec<u32>,
}

impl ComponentIR {
    /// First element of the render output, looking through fragments.
    pub fn root_element(&self) -> Option<&ElementNode> {
        match self.root.as_ref()? {
            TemplateNode::Element(el) => Some(el),
            TemplateNode::Fragment(frag) => first_element(&frag.children),
            _ => None,
        }
    }
}

fn first_element(nodes: &[TemplateNode]) -> Option<&ElementNode> {
    nodes.iter().find_map(|node| match node {
        TemplateNode::Element(el) => Some(el),
        TemplateNode::Fragment(frag) => first_element(&frag.children),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Element(ElementNode),
    Fragment(FragmentNode),
    Text(TextNode),
    Expression(ExpressionNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub is_component: bool,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
    /// Byte offset of the opening tag; keys resolved styles back to the source.
    pub span_start: u32,
    #[serde(default)]
    pub location: SourceLocation,
    #[serde(default)]
    pub in_compile_mode: bool,
}

impl ElementNode {
    pub fn attribute(&self, name: &str) -> Option<&AttributeIR> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// The `className` (or `class`) attribute, whichever comes first.
    pub fn class_attribute(&self) -> Option<&AttributeIR> {
        self.attributes
            .iter()
            .find(|attr| attr.name == "className" || attr.name == "class")
    }

    /// Static class string, if the class attribute is a literal.
    pub fn static_class(&self) -> Option<&str> {
        match &self.class_attribute()?.value {
            AttributeValue::Static(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn has_boolean_attribute(&self, name: &str) -> bool {
        matches!(
            self.attribute(name).map(|attr| &attr.value),
            Some(AttributeValue::Boolean)
        )
    }

    /// Element children in document order. Fragments are transparent.
    pub fn child_elements(&self) -> Vec<&ElementNode> {
        let mut out = Vec::new();
        collect_elements(&self.children, &mut out);
        out
    }
}

fn collect_elements<'n>(nodes: &'n [TemplateNode], out: &mut Vec<&'n ElementNode>) {
    for node in nodes {
        match node {
            TemplateNode::Element(el) => out.push(el),
            TemplateNode::Fragment(frag) => collect_elements(&frag.children, out),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentNode {
    /// Name of the helper or component expanded into this fragment.
    pub source: Option<String>,
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub code: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum AttributeValue {
    Static(String),
    Dynamic(String),
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    pub value: AttributeValue,
    #[serde(default)]
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASS VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

struct ClassValidator<'c> {
    file_path: &'c str,
    errors: Vec<CompilerError>,
}

impl TemplateVisitor for ClassValidator<'_> {
    fn visit_element(&mut self, element: &ElementNode) {
        if let (Some(attr), Some(class)) = (element.class_attribute(), element.static_class()) {
            self.errors.extend(
                check_class_string(class)
                    .into_iter()
                    .map(|e| e.located(self.file_path, &attr.location).with_context(class)),
            );
        }
        walk_element(self, element);
    }
}

/// Every problem in one class string: tokenization, arbitrary value syntax
/// and color validity.
pub fn check_class_string(class: &str) -> Vec<CompilerError> {
    let list = match parse_class_list(class) {
        Ok(list) => list,
        Err(e) => return vec![e],
    };

    let mut errors = Vec::new();
    for (_, value) in list.arbitrary() {
        match parse_value(value) {
            Ok(parsed) => {
                if let Err(e) = Rgba::check_all(&parsed) {
                    errors.push(e);
                }
            }
            Err(e) => errors.push(e),
        }
    }
    errors
}

/// Reports every invalid static class attribute in the component.
pub fn validate_component(component: &ComponentIR) -> Vec<CompilerError> {
    let mut validator = ClassValidator {
        file_path: &component.file_path,
        errors: Vec::new(),
    };
    if let Some(root) = &component.root {
        validator.visit_node(root);
    }
    validator.errors
}
