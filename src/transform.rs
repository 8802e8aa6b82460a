//! Transform Module
//!
//! Runs the full pipeline on one component and writes the resolved styles back
//! into its source as inline `style` attributes.

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::class_list::split_top_level;
use crate::color::ColorFormat;
use crate::parse::parse_component;
use crate::resolve::{declaration_css, resolve_styles, to_camel_case, ResolvedStyle};
use crate::stylesheet::{parse_stylesheet, StyleDeclaration};
use crate::validate::{CompilerError, ComponentIR, SourceLocation, ERR_DYNAMIC_STYLE};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS & OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Modules whose imports are platform components rather than local ones.
    pub native_component_sources: Vec<String>,
    /// Expand utility classes into declarations.
    pub utilities: bool,
    /// Only style elements inside `compileMode` subtrees.
    pub compile_mode_only: bool,
    pub color_format: ColorFormat,
    /// Fail on the first diagnostic instead of reporting it.
    pub strict: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            native_component_sources: vec!["@tarojs/components".to_string()],
            utilities: true,
            compile_mode_only: false,
            color_format: ColorFormat::Hex,
            strict: false,
        }
    }
}

impl TransformOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub component: ComponentIR,
    pub styles: BTreeMap<u32, ResolvedStyle>,
    pub diagnostics: Vec<CompilerError>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// INLINE STYLE HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Declarations of a `style="a:b;c:d"` string.
pub fn parse_inline_style(style: &str) -> Vec<StyleDeclaration> {
    split_top_level(style, ';')
        .into_iter()
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            Some(StyleDeclaration::new(property.to_ascii_lowercase(), value.trim()))
        })
        .collect()
}

/// Swap the surrounding quote character out of `css` so it can be embedded.
fn fit_quotes(css: &str, quote: char) -> String {
    match quote {
        '"' => css.replace('"', "'"),
        '\'' => css.replace('\'', "\""),
        _ => css.to_string(),
    }
}

fn js_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn object_key(key: &str) -> String {
    let mut chars = key.chars();
    let is_ident = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        key.to_string()
    } else {
        js_string(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STYLE INJECTION
// ═══════════════════════════════════════════════════════════════════════════════

struct StyleInjector<'t> {
    source: &'t str,
    file_path: &'t str,
    styles: &'t BTreeMap<u32, ResolvedStyle>,
    /// (start, end, replacement), applied back to front.
    replacements: Vec<(u32, u32, String)>,
    diagnostics: Vec<CompilerError>,
}

impl<'t> StyleInjector<'t> {
    fn text(&self, span: Span) -> &'t str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }

    /// Offset just past the last attribute (or the tag name), before `>` or `/>`.
    fn insertion_point(&self, element: &JSXOpeningElement<'_>) -> u32 {
        let text = self.text(element.span);
        let head = text.strip_suffix('>').unwrap_or(text).trim_end();
        let head = head.strip_suffix('/').unwrap_or(head).trim_end();
        element.span.start + head.len() as u32
    }

    fn inject(&mut self, element: &JSXOpeningElement<'_>, style: &ResolvedStyle) {
        let style_attr = element.attributes.iter().find_map(|item| match item {
            JSXAttributeItem::Attribute(attr)
                if matches!(&attr.name, JSXAttributeName::Identifier(id) if id.name.as_str() == "style") =>
            {
                Some(attr)
            }
            _ => None,
        });

        let Some(attr) = style_attr else {
            let at = self.insertion_point(element);
            let css = fit_quotes(&style.to_style_string(), '"');
            self.replacements.push((at, at, format!(" style=\"{}\"", css)));
            return;
        };

        match &attr.value {
            None => self.replace_attribute(attr.span, style),
            Some(JSXAttributeValue::StringLiteral(s)) => self.merge_string(s.span, s.value.as_str(), style),
            Some(JSXAttributeValue::ExpressionContainer(container)) => {
                match container.expression.as_expression() {
                    Some(Expression::StringLiteral(s)) => {
                        self.merge_string(s.span, s.value.as_str(), style)
                    }
                    Some(Expression::ObjectExpression(object)) => self.merge_object(object, style),
                    _ => self.report_dynamic(attr.span, style),
                }
            }
            Some(_) => self.report_dynamic(attr.span, style),
        }
    }

    fn replace_attribute(&mut self, span: Span, style: &ResolvedStyle) {
        let css = fit_quotes(&style.to_style_string(), '"');
        self.replacements
            .push((span.start, span.end, format!("style=\"{}\"", css)));
    }

    /// Inline declarations keep their value; resolved ones fill in the rest.
    fn merge_string(&mut self, span: Span, inline: &str, style: &ResolvedStyle) {
        let existing = parse_inline_style(inline);
        let missing: String = style
            .declarations
            .iter()
            .filter(|d| !existing.iter().any(|e| e.property == d.property))
            .map(declaration_css)
            .collect();
        if missing.is_empty() {
            return;
        }

        let mut merged = inline.trim().to_string();
        if !merged.is_empty() && !merged.ends_with(';') {
            merged.push(';');
        }
        merged.push_str(&missing);

        let quote = self.text(span).chars().next().unwrap_or('"');
        self.replacements.push((
            span.start,
            span.end,
            format!("{q}{}{q}", fit_quotes(&merged, quote), q = quote),
        ));
    }

    /// Style objects have no `!important`; appended keys carry the value only.
    fn merge_object(&mut self, object: &ObjectExpression<'_>, style: &ResolvedStyle) {
        let existing: Vec<String> = object
            .properties
            .iter()
            .filter_map(|prop| match prop {
                ObjectPropertyKind::ObjectProperty(p) => match &p.key {
                    PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
                    PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
                    _ => None,
                },
                ObjectPropertyKind::SpreadProperty(_) => None,
            })
            .collect();

        let missing: Vec<String> = style
            .declarations
            .iter()
            .filter_map(|d| {
                let key = to_camel_case(&d.property);
                if existing.iter().any(|e| *e == key || *e == d.property) {
                    return None;
                }
                Some(format!("{}: {}", object_key(&key), js_string(&d.value)))
            })
            .collect();
        if missing.is_empty() {
            return;
        }

        let entries = missing.join(", ");
        match object.properties.last() {
            Some(last) => {
                let end = last.span().end;
                self.replacements.push((end, end, format!(", {}", entries)));
            }
            None => self.replacements.push((
                object.span.start + 1,
                object.span.end - 1,
                format!(" {} ", entries),
            )),
        }
    }

    fn report_dynamic(&mut self, span: Span, style: &ResolvedStyle) {
        let location = SourceLocation::from_offset(self.source, span.start);
        self.diagnostics.push(
            CompilerError::detached(
                ERR_DYNAMIC_STYLE,
                "Resolved styles were not merged into a computed style expression",
            )
            .located(self.file_path, &location)
            .with_context(self.text(span))
            .with_hint(format!(
                "Merge these declarations by hand: {}",
                style.to_style_string()
            )),
        );
    }
}

impl<'a> Visit<'a> for StyleInjector<'_> {
    fn visit_jsx_opening_element(&mut self, element: &JSXOpeningElement<'a>) {
        if let Some(style) = self.styles.get(&element.span.start) {
            if !style.is_empty() {
                self.inject(element, style);
            }
        }
        walk::walk_jsx_opening_element(self, element);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn transform_source(
    source: &str,
    file_path: &str,
    stylesheet: Option<&str>,
    options: &TransformOptions,
) -> Result<TransformOutput, CompilerError> {
    let component = parse_component(source, file_path, options)?;

    let sheet_path = component
        .style_imports
        .first()
        .map(String::as_str)
        .unwrap_or(file_path);
    let sheet = stylesheet
        .map(|css| parse_stylesheet(css, sheet_path))
        .transpose()?;

    let resolution = resolve_styles(&component, sheet.as_ref(), options);

    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true);
    let ret = Parser::new(&allocator, source, source_type).parse();

    let mut injector = StyleInjector {
        source,
        file_path,
        styles: &resolution.styles,
        replacements: Vec::new(),
        diagnostics: Vec::new(),
    };
    injector.visit_program(&ret.program);

    let mut replacements = injector.replacements;
    replacements.sort_by(|a, b| b.0.cmp(&a.0));
    let mut code = source.to_string();
    for (start, end, replacement) in &replacements {
        code.replace_range((*start as usize)..(*end as usize), replacement);
    }

    let mut diagnostics = resolution.diagnostics;
    diagnostics.extend(injector.diagnostics);
    if options.strict {
        if let Some(first) = diagnostics.into_iter().next() {
            return Err(first);
        }
        diagnostics = Vec::new();
    }

    debug!(
        file = file_path,
        edits = replacements.len(),
        diagnostics = diagnostics.len(),
        "transformed component"
    );

    Ok(TransformOutput {
        code,
        component,
        styles: resolution.styles,
        diagnostics,
    })
}

#[cfg(feature = "napi")]
#[napi]
pub fn transform_native(
    source: String,
    file_path: String,
    stylesheet: Option<String>,
    options_json: Option<String>,
) -> napi::Result<String> {
    let options = match options_json {
        Some(json) => TransformOptions::from_json(&json)
            .map_err(|e| napi::Error::from_reason(format!("Options parse error: {}", e)))?,
        None => TransformOptions::default(),
    };
    let output = transform_source(&source, &file_path, stylesheet.as_deref(), &options)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_string(&output)
        .map_err(|e| napi::Error::from_reason(format!("Serialize error: {}", e)))
}
