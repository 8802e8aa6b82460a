//! Stylesheet Module
//!
//! Reads the stylesheet a component imports (`import './index.scss'`) into class
//! rules. Handles flat CSS plus the SCSS subset components usually carry:
//! nesting with `&`, `$variables` and `//` comments.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::class_list::split_top_level;
use crate::validate::{CompilerError, ERR_STYLESHEET};

lazy_static! {
    static ref SCSS_VARIABLE_RE: Regex = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_-]*)").unwrap();
    static ref IMPORTANT_RE: Regex = Regex::new(r"(?i)\s*!\s*important\s*$").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleDeclaration {
    pub property: String,
    pub value: String,
    #[serde(default)]
    pub important: bool,
}

impl StyleDeclaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// Adds `decl` with cascade semantics: a later declaration replaces an earlier
/// one of the same property unless only the earlier one is `!important`.
/// The property keeps its first position.
pub fn cascade_into(list: &mut Vec<StyleDeclaration>, decl: StyleDeclaration) {
    match list.iter_mut().find(|d| d.property == decl.property) {
        Some(existing) => {
            if existing.important && !decl.important {
                return;
            }
            *existing = decl;
        }
        None => list.push(decl),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
    pub selector: String,
    /// Set only for compound class selectors such as `.a` or `.a.b`.
    pub classes: Option<Vec<String>>,
    pub declarations: Vec<StyleDeclaration>,
    pub order: usize,
}

impl StyleRule {
    pub fn specificity(&self) -> usize {
        self.classes.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StyleSheet {
    pub file_path: String,
    pub rules: Vec<StyleRule>,
    pub variables: HashMap<String, String>,
}

impl StyleSheet {
    /// Rules whose classes are all present on the element, weakest first.
    pub fn matching(&self, classes: &[&str]) -> Vec<&StyleRule> {
        let mut matched: Vec<&StyleRule> = self
            .rules
            .iter()
            .filter(|rule| match &rule.classes {
                Some(required) => required.iter().all(|c| classes.contains(&c.as_str())),
                None => false,
            })
            .collect();
        matched.sort_by_key(|rule| (rule.specificity(), rule.order));
        matched
    }

    pub fn declarations_for(&self, classes: &[&str]) -> Vec<StyleDeclaration> {
        let mut out = Vec::new();
        for rule in self.matching(classes) {
            for decl in &rule.declarations {
                cascade_into(&mut out, decl.clone());
            }
        }
        out
    }
}

/// Classes of a compound class selector (`.a.b` -> `[a, b]`); `None` for
/// anything with combinators, pseudo-classes, ids, attributes or tags.
pub fn compound_classes(selector: &str) -> Option<Vec<String>> {
    let selector = selector.trim();
    if !selector.starts_with('.') {
        return None;
    }

    let mut classes = Vec::new();
    let mut current = String::new();
    let mut chars = selector.chars().skip(1);
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next()?),
            '.' => {
                if current.is_empty() {
                    return None;
                }
                classes.push(std::mem::take(&mut current));
            }
            c if c.is_whitespace() || ">+~:[]#*(),".contains(c) => return None,
            c => current.push(c),
        }
    }
    if current.is_empty() {
        return None;
    }
    classes.push(current);
    Some(classes)
}

/// Blanks out `/* */` and `//` comments, keeping newlines so offsets still
/// map to the original lines.
fn strip_comments(css: &str) -> Vec<char> {
    let chars: Vec<char> = css.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    let mut in_string: Option<char> = None;
    let mut paren_depth = 0usize;

    let blank = |c: char| if c == '\n' { '\n' } else { ' ' };

    while i < chars.len() {
        let c = chars[i];

        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '/' if chars.get(i + 1) == Some(&'*') => {
                let mut j = i;
                while j < chars.len() && !(chars[j] == '*' && chars.get(j + 1) == Some(&'/') && j > i + 1) {
                    out.push(blank(chars[j]));
                    j += 1;
                }
                if j < chars.len() {
                    out.push(' ');
                    out.push(' ');
                    j += 2;
                }
                i = j;
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'/') && paren_depth == 0 => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
                continue;
            }
            _ => {}
        }

        out.push(c);
        i += 1;
    }

    out
}

enum Terminator {
    Semicolon,
    Open,
    Close,
    End,
}

struct SheetParser<'s> {
    chars: Vec<char>,
    pos: usize,
    file_path: &'s str,
    variables: HashMap<String, String>,
    rules: Vec<StyleRule>,
    next_order: usize,
}

impl<'s> SheetParser<'s> {
    fn error_at(&self, pos: usize, message: &str) -> CompilerError {
        let before = &self.chars[..pos.min(self.chars.len())];
        let line = before.iter().filter(|c| **c == '\n').count() as u32 + 1;
        let column = before.iter().rev().take_while(|c| **c != '\n').count() as u32 + 1;
        CompilerError::new(ERR_STYLESHEET, message, self.file_path, line, column)
    }

    /// Reads up to the next `;`, `{` or `}` outside strings and parentheses.
    fn read_prelude(&mut self) -> (String, Terminator) {
        let mut text = String::new();
        let mut in_string: Option<char> = None;
        let mut paren_depth = 0usize;

        while let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            if let Some(quote) = in_string {
                text.push(c);
                if c == quote {
                    in_string = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => in_string = Some(c),
                '(' => paren_depth += 1,
                ')' => paren_depth = paren_depth.saturating_sub(1),
                ';' if paren_depth == 0 => return (text, Terminator::Semicolon),
                '{' if paren_depth == 0 => return (text, Terminator::Open),
                '}' if paren_depth == 0 => return (text, Terminator::Close),
                _ => {}
            }
            text.push(c);
        }
        (text, Terminator::End)
    }

    /// Skips a block whose `{` was already consumed.
    fn skip_block(&mut self, open_pos: usize) -> Result<(), CompilerError> {
        let mut depth = 1;
        let mut in_string: Option<char> = None;
        while let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            if let Some(quote) = in_string {
                if c == quote {
                    in_string = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => in_string = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error_at(open_pos, "Unclosed '{' in at-rule block"))
    }

    fn substitute_variables(&self, value: &str) -> String {
        SCSS_VARIABLE_RE
            .replace_all(value, |caps: &regex::Captures| {
                self.variables
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }

    fn handle_statement(&mut self, statement: &str, in_rule: bool, out: &mut Vec<StyleDeclaration>) {
        let statement = statement.trim();
        if statement.is_empty() {
            return;
        }
        if statement.starts_with('@') {
            debug!(file = self.file_path, "Ignoring at-rule statement `{}`", statement);
            return;
        }

        let Some((property, value)) = statement.split_once(':') else {
            debug!(file = self.file_path, "Ignoring stray text `{}`", statement);
            return;
        };
        let property = property.trim();
        let value = self.substitute_variables(value.trim());

        if let Some(name) = property.strip_prefix('$') {
            self.variables.insert(name.to_string(), value);
            return;
        }
        if !in_rule {
            debug!(file = self.file_path, "Ignoring declaration outside a rule `{}`", statement);
            return;
        }

        let important = IMPORTANT_RE.is_match(&value);
        let value = IMPORTANT_RE.replace(&value, "").trim().to_string();
        if property.is_empty() || value.is_empty() {
            return;
        }
        let property = if property.starts_with("--") {
            property.to_string()
        } else {
            property.to_ascii_lowercase()
        };
        out.push(StyleDeclaration { property, value, important });
    }

    fn parse_block(&mut self, selectors: &[String], open_pos: Option<usize>) -> Result<Vec<StyleDeclaration>, CompilerError> {
        let in_rule = !selectors.is_empty();
        let mut declarations = Vec::new();

        loop {
            let start = self.pos;
            let (prelude, terminator) = self.read_prelude();
            match terminator {
                Terminator::Semicolon => self.handle_statement(&prelude, in_rule, &mut declarations),
                Terminator::Open => {
                    let prelude = prelude.trim();
                    let brace_pos = self.pos - 1;
                    if prelude.starts_with('@') {
                        debug!(file = self.file_path, "Skipping at-rule block `{}`", prelude);
                        self.skip_block(brace_pos)?;
                        continue;
                    }
                    let nested = combine_selectors(selectors, prelude);
                    let order = self.next_order;
                    self.next_order += 1;
                    let inner = self.parse_block(&nested, Some(brace_pos))?;
                    if inner.is_empty() {
                        continue;
                    }
                    for selector in nested {
                        self.rules.push(StyleRule {
                            classes: compound_classes(&selector),
                            selector,
                            declarations: inner.clone(),
                            order,
                        });
                    }
                }
                Terminator::Close => {
                    if open_pos.is_none() {
                        return Err(self.error_at(self.pos - 1, "Unexpected '}'"));
                    }
                    self.handle_statement(&prelude, in_rule, &mut declarations);
                    return Ok(declarations);
                }
                Terminator::End => {
                    if let Some(open) = open_pos {
                        return Err(self.error_at(open, "Unclosed '{'"));
                    }
                    if !prelude.trim().is_empty() {
                        debug!(file = self.file_path, "Ignoring trailing text at offset {}", start);
                    }
                    return Ok(declarations);
                }
            }
        }
    }
}

fn combine_selectors(parents: &[String], prelude: &str) -> Vec<String> {
    let children: Vec<String> = split_top_level(prelude, ',')
        .into_iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect();

    if parents.is_empty() {
        return children;
    }

    let mut out = Vec::new();
    for parent in parents {
        for child in &children {
            if child.contains('&') {
                out.push(child.replace('&', parent));
            } else {
                out.push(format!("{} {}", parent, child));
            }
        }
    }
    out
}

pub fn parse_stylesheet(css: &str, file_path: &str) -> Result<StyleSheet, CompilerError> {
    let mut parser = SheetParser {
        chars: strip_comments(css),
        pos: 0,
        file_path,
        variables: HashMap::new(),
        rules: Vec::new(),
        next_order: 0,
    };
    parser.parse_block(&[], None)?;
    parser.rules.sort_by_key(|rule| rule.order);

    debug!(
        file = file_path,
        rules = parser.rules.len(),
        "Parsed stylesheet"
    );

    Ok(StyleSheet {
        file_path: file_path.to_string(),
        rules: parser.rules,
        variables: parser.variables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_rules_and_comments() {
        let css = r#"
            /* header */
            .a { color: red; margin: 0 } // trailing
            .b{background:url(http://x.test/a.png)}
        "#;
        let sheet = parse_stylesheet(css, "index.css").unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].classes, Some(vec!["a".to_string()]));
        assert_eq!(
            sheet.rules[0].declarations,
            vec![StyleDeclaration::new("color", "red"), StyleDeclaration::new("margin", "0")]
        );
        assert_eq!(sheet.rules[1].declarations[0].value, "url(http://x.test/a.png)");
    }

    #[test]
    fn test_scss_nesting_and_variables() {
        let scss = r#"
            $mask: rgba(0, 0, 0, 0.5);
            .a {
              width: 100px;
              &.b { background-color: $mask; }
              .c { height: 10px; }
            }
        "#;
        let sheet = parse_stylesheet(scss, "index.scss").unwrap();
        let selectors: Vec<&str> = sheet.rules.iter().map(|r| r.selector.as_str()).collect();
        assert_eq!(selectors, vec![".a", ".a.b", ".a .c"]);
        assert_eq!(sheet.rules[1].declarations[0].value, "rgba(0, 0, 0, 0.5)");
        assert_eq!(sheet.rules[1].classes, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(sheet.rules[2].classes, None);
    }

    #[test]
    fn test_selector_lists_and_at_rules() {
        let css = r#"
            @import './base.css';
            @media (max-width: 100px) { .a { color: blue; } }
            @keyframes spin { from { opacity: 0 } to { opacity: 1 } }
            .a, .b { color: green !important; }
        "#;
        let sheet = parse_stylesheet(css, "x.css").unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert!(sheet.rules.iter().all(|r| r.declarations[0].important));
        assert_eq!(sheet.rules[0].declarations[0].value, "green");
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse_stylesheet(".a { color: red;", "x.css").unwrap_err();
        assert_eq!(err.code, ERR_STYLESHEET);
        assert_eq!(err.line, 1);
        assert_eq!(parse_stylesheet(".a {} }", "x.css").unwrap_err().code, ERR_STYLESHEET);
    }

    #[test]
    fn test_cascade_and_specificity() {
        let css = r#"
            .a.b { color: blue; }
            .a { color: red; padding: 1px !important; }
            .b { padding: 2px; }
        "#;
        let sheet = parse_stylesheet(css, "x.css").unwrap();
        let decls = sheet.declarations_for(&["a", "b"]);
        let find = |p: &str| decls.iter().find(|d| d.property == p).map(|d| d.value.clone());
        assert_eq!(find("color").as_deref(), Some("blue"));
        assert_eq!(find("padding").as_deref(), Some("1px"));
        assert!(sheet.declarations_for(&["b"]).iter().all(|d| d.property == "padding"));
    }

    #[test]
    fn test_compound_classes() {
        assert_eq!(compound_classes(".a.b"), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(
            compound_classes(r".bg-\[red\]"),
            Some(vec!["bg-[red]".to_string()])
        );
        assert_eq!(compound_classes(".a:hover"), None);
        assert_eq!(compound_classes("div.a"), None);
        assert_eq!(compound_classes(".a > .b"), None);
    }
}
