//! Style resolution.
//!
//! Combines stylesheet rules and utility classes into the declarations each
//! element should carry inline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::class_list::{parse_class_token, tokenize_class_list, ClassToken};
use crate::stylesheet::{cascade_into, StyleDeclaration, StyleSheet};
use crate::transform::TransformOptions;
use crate::utility::utility_declarations;
use crate::validate::{CompilerError, ComponentIR, ElementNode};
use crate::visitor::{walk_element, TemplateVisitor};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStyle {
    pub declarations: Vec<StyleDeclaration>,
    /// Tokens that produced nothing: variants and classes no rule or utility knows.
    pub skipped: Vec<String>,
}

impl ResolvedStyle {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    /// `prop:value;prop:value;`
    pub fn to_style_string(&self) -> String {
        self.declarations.iter().map(declaration_css).collect()
    }
}

pub fn declaration_css(decl: &StyleDeclaration) -> String {
    if decl.important {
        format!("{}:{} !important;", decl.property, decl.value)
    } else {
        format!("{}:{};", decl.property, decl.value)
    }
}

/// `background-color` -> `backgroundColor`. Custom properties are returned as-is.
pub fn to_camel_case(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len());
    let mut upper = false;
    for c in property.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StyleResolution {
    /// Keyed by the element's opening-tag offset.
    pub styles: BTreeMap<u32, ResolvedStyle>,
    pub diagnostics: Vec<CompilerError>,
}

struct StyleResolver<'r> {
    file_path: &'r str,
    sheet: Option<&'r StyleSheet>,
    options: &'r TransformOptions,
    resolution: StyleResolution,
}

impl StyleResolver<'_> {
    fn parse_tokens(&mut self, element: &ElementNode, class: &str) -> Vec<ClassToken> {
        let location = element
            .class_attribute()
            .map(|attr| attr.location)
            .unwrap_or(element.location);

        let raw = match tokenize_class_list(class) {
            Ok(raw) => raw,
            Err(e) => {
                self.resolution
                    .diagnostics
                    .push(e.located(self.file_path, &location).with_context(class));
                return Vec::new();
            }
        };

        let mut tokens = Vec::with_capacity(raw.len());
        for token in &raw {
            match parse_class_token(token) {
                Ok(t) => tokens.push(t),
                Err(e) => self
                    .resolution
                    .diagnostics
                    .push(e.located(self.file_path, &location).with_context(class)),
            }
        }
        tokens
    }

    fn resolve_element(&mut self, element: &ElementNode, class: &str) {
        let tokens = self.parse_tokens(element, class);
        let names: Vec<&str> = tokens.iter().map(|t| t.raw.as_str()).collect();
        let location = element.location;

        let mut style = ResolvedStyle::default();
        let mut matched_by_sheet: Vec<&str> = Vec::new();
        if let Some(sheet) = self.sheet {
            style.declarations = sheet.declarations_for(&names);
            for rule in sheet.matching(&names) {
                if let Some(classes) = &rule.classes {
                    matched_by_sheet.extend(classes.iter().map(String::as_str));
                }
            }
        }

        for token in &tokens {
            let expanded = if self.options.utilities {
                match utility_declarations(token, self.options.color_format) {
                    Ok(expanded) => expanded,
                    Err(e) => {
                        self.resolution.diagnostics.push(
                            e.located(self.file_path, &location)
                                .with_context(token.raw.clone()),
                        );
                        continue;
                    }
                }
            } else {
                None
            };

            match expanded {
                Some(decls) => {
                    for decl in decls {
                        cascade_into(&mut style.declarations, decl);
                    }
                }
                None if !matched_by_sheet.contains(&token.raw.as_str()) => {
                    style.skipped.push(token.raw.clone())
                }
                None => {}
            }
        }

        if !style.declarations.is_empty() || !style.skipped.is_empty() {
            self.resolution.styles.insert(element.span_start, style);
        }
    }
}

impl TemplateVisitor for StyleResolver<'_> {
    fn visit_element(&mut self, element: &ElementNode) {
        let in_scope = !self.options.compile_mode_only || element.in_compile_mode;
        if in_scope {
            if let Some(class) = element.static_class() {
                self.resolve_element(element, class);
            }
        }
        walk_element(self, element);
    }
}

pub fn resolve_styles(
    component: &ComponentIR,
    sheet: Option<&StyleSheet>,
    options: &TransformOptions,
) -> StyleResolution {
    let mut resolver = StyleResolver {
        file_path: &component.file_path,
        sheet,
        options,
        resolution: StyleResolution::default(),
    };
    if let Some(root) = &component.root {
        resolver.visit_node(root);
    }

    debug!(
        file = component.file_path.as_str(),
        elements = resolver.resolution.styles.len(),
        diagnostics = resolver.resolution.diagnostics.len(),
        "resolved styles"
    );
    resolver.resolution
}
