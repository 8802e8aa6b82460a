//! Class List Module
//!
//! Splits `className` strings into tokens and classifies each token as a plain
//! class, an arbitrary-value utility (`bg-[rgba(0,0,0,0.5)]`) or an arbitrary
//! property (`[mask-type:luminance]`).

use serde::{Deserialize, Serialize};

use crate::validate::{CompilerError, ERR_CLASS_TOKEN, ERR_CLASS_UNBALANCED};

/// Data-type hints accepted in front of an arbitrary value, e.g. `text-[color:var(--c)]`.
const TYPE_HINTS: &[&str] = &[
    "color",
    "length",
    "number",
    "percentage",
    "url",
    "image",
    "position",
    "family-name",
    "line-width",
    "absolute-size",
    "relative-size",
    "any",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ClassKind {
    Plain,
    Arbitrary {
        prefix: String,
        value: String,
        hint: Option<String>,
    },
    ArbitraryProperty {
        property: String,
        value: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassToken {
    /// The token exactly as written in the class string.
    pub raw: String,
    pub variants: Vec<String>,
    pub important: bool,
    pub negative: bool,
    /// Token with variants, `!` and `-` removed.
    pub utility: String,
    pub kind: ClassKind,
}

impl ClassToken {
    pub fn is_arbitrary(&self) -> bool {
        !matches!(self.kind, ClassKind::Plain)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClassList {
    pub tokens: Vec<ClassToken>,
}

impl ClassList {
    /// Raw class names in source order.
    pub fn names(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.raw.as_str()).collect()
    }

    /// `(prefix or property, decoded value)` for every bracketed token.
    pub fn arbitrary(&self) -> Vec<(&str, &str)> {
        self.tokens
            .iter()
            .filter_map(|t| match &t.kind {
                ClassKind::Arbitrary { prefix, value, .. } => Some((prefix.as_str(), value.as_str())),
                ClassKind::ArbitraryProperty { property, value } => {
                    Some((property.as_str(), value.as_str()))
                }
                ClassKind::Plain => None,
            })
            .collect()
    }
}

fn unbalanced(class: &str, found: char) -> CompilerError {
    CompilerError::detached(
        ERR_CLASS_UNBALANCED,
        &format!("Unbalanced '{}' in class list \"{}\"", found, class),
    )
    .with_hint("Arbitrary values must close every '[' and '(' they open.")
}

/// Split on whitespace outside `[]` and `()`.
pub fn tokenize_class_list(class: &str) -> Result<Vec<String>, CompilerError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut stack: Vec<char> = Vec::new();

    for c in class.chars() {
        match c {
            '[' | '(' => {
                stack.push(c);
                current.push(c);
            }
            ']' | ')' => {
                let expected = if c == ']' { '[' } else { '(' };
                if stack.pop() != Some(expected) {
                    return Err(unbalanced(class, c));
                }
                current.push(c);
            }
            c if c.is_whitespace() && stack.is_empty() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if let Some(open) = stack.last() {
        return Err(unbalanced(class, *open));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Split `s` on `sep` where it is not nested in brackets or parentheses.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// `_` stands for a space inside arbitrary values; `\_` is a literal underscore.
/// URLs are left alone.
pub fn decode_arbitrary_value(value: &str) -> String {
    if value.starts_with("url(") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'_') => {
                chars.next();
                out.push('_');
            }
            '_' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

fn split_type_hint(value: &str) -> (Option<String>, &str) {
    if let Some((head, rest)) = value.split_once(':') {
        if TYPE_HINTS.contains(&head) {
            return (Some(head.to_string()), rest);
        }
    }
    (None, value)
}

fn malformed(token: &str, reason: &str) -> CompilerError {
    CompilerError::detached(
        ERR_CLASS_TOKEN,
        &format!("Malformed class \"{}\": {}", token, reason),
    )
}

pub fn parse_class_token(token: &str) -> Result<ClassToken, CompilerError> {
    if token.is_empty() {
        return Err(malformed(token, "empty class name"));
    }

    let mut parts = split_top_level(token, ':');
    let base = parts.pop().unwrap_or_default();
    if parts.iter().any(|v| v.is_empty()) {
        return Err(malformed(token, "empty variant"));
    }
    if base.is_empty() {
        return Err(malformed(token, "variant without a utility"));
    }
    let variants = parts.into_iter().map(str::to_string).collect();

    let mut utility = base;
    let mut important = false;
    if let Some(rest) = utility.strip_prefix('!') {
        utility = rest;
        important = true;
    } else if let Some(rest) = utility.strip_suffix('!') {
        utility = rest;
        important = true;
    }
    let mut negative = false;
    if let Some(rest) = utility.strip_prefix('-') {
        utility = rest;
        negative = true;
    }
    if utility.is_empty() {
        return Err(malformed(token, "empty class name"));
    }

    let kind =if utility.starts_with('[') && utility.ends_with(']') {
        let inner = &utility[1..utility.len() - 1];
        match inner.split_once(':') {
            Some((property, value)) if !property.is_empty() && !value.is_empty() => {
                ClassKind::ArbitraryProperty {
                    property: property.to_string(),
                    value: decode_arbitrary_value(value),
                }
            }
            _ => return Err(malformed(token, "arbitrary property needs 'property:value'")),
        }
    } else if let (true, Some(idx)) = (utility.ends_with(']'), utility.find("-[")) {
        let prefix = &utility[..idx];
        let raw_value = &utility[idx + 2..utility.len() - 1];
        let (hint, value) = split_type_hint(raw_value);
        if prefix.is_empty() {
            return Err(malformed(token, "arbitrary value without a utility prefix"));
        }
        if value.trim().is_empty() {
            return Err(malformed(token, "empty arbitrary value"));
        }
        ClassKind::Arbitrary {
            prefix: prefix.to_string(),
            value: decode_arbitrary_value(value),
            hint,
        }
    } else if utility.contains('[') || utility.contains(']') {
        return Err(malformed(token, "brackets must close the class name"));
    } else {
        ClassKind::Plain
    };

    Ok(ClassToken {
        raw: token.to_string(),
        variants,
        important,
        negative,
        utility: utility.to_string(),
        kind,
    })
}

pub fn parse_class_list(class: &str) -> Result<ClassList, CompilerError> {
    let tokens = tokenize_class_list(class)?
        .iter()
        .map(|t| parse_class_token(t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ClassList { tokens })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_brackets_whole() {
        let tokens = tokenize_class_list("  a  bg-[rgba(0, 0, 0, 0.5)]\tflex ").unwrap();
        assert_eq!(tokens, vec!["a", "bg-[rgba(0, 0, 0, 0.5)]", "flex"]);
    }

    #[test]
    fn test_tokenize_unbalanced() {
        assert_eq!(
            tokenize_class_list("bg-[red").unwrap_err().code,
            ERR_CLASS_UNBALANCED
        );
        assert_eq!(
            tokenize_class_list("bg-[rgba(0,0,0])").unwrap_err().code,
            ERR_CLASS_UNBALANCED
        );
        assert_eq!(tokenize_class_list("a]").unwrap_err().code, ERR_CLASS_UNBALANCED);
    }

    #[test]
    fn test_plain_token() {
        let t = parse_class_token("a").unwrap();
        assert_eq!(t.kind, ClassKind::Plain);
        assert!(t.variants.is_empty());
        assert!(!t.important && !t.negative);
    }

    #[test]
    fn test_arbitrary_token() {
        let t = parse_class_token("bg-[rgba(0,0,0,0.5)]").unwrap();
        assert_eq!(
            t.kind,
            ClassKind::Arbitrary {
                prefix: "bg".to_string(),
                value: "rgba(0,0,0,0.5)".to_string(),
                hint: None,
            }
        );
    }

    #[test]
    fn test_variants_important_negative() {
        let t = parse_class_token("md:hover:!-mt-[4px]").unwrap();
        assert_eq!(t.variants, vec!["md", "hover"]);
        assert!(t.important);
        assert!(t.negative);
        assert_eq!(t.utility, "mt-[4px]");
    }

    #[test]
    fn test_type_hint_and_underscores() {
        let t = parse_class_token("text-[color:var(--brand)]").unwrap();
        match t.kind {
            ClassKind::Arbitrary { hint, value, .. } => {
                assert_eq!(hint.as_deref(), Some("color"));
                assert_eq!(value, "var(--brand)");
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let t = parse_class_token("shadow-[0_0_4px_red]").unwrap();
        assert!(matches!(t.kind, ClassKind::Arbitrary { ref value, .. } if value == "0 0 4px red"));
        assert_eq!(decode_arbitrary_value(r"a\_b"), "a_b");
    }

    #[test]
    fn test_arbitrary_property() {
        let t = parse_class_token("[mask-type:luminance]").unwrap();
        assert_eq!(
            t.kind,
            ClassKind::ArbitraryProperty {
                property: "mask-type".to_string(),
                value: "luminance".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_tokens() {
        for bad in ["bg-[]", "hover:", ":flex", "bg-[red]x", "[nope]", "-[1px]", "!", "-", "!-", "md:!"] {
            assert_eq!(parse_class_token(bad).unwrap_err().code, ERR_CLASS_TOKEN, "{}", bad);
        }
    }

    #[test]
    fn test_class_list_accessors() {
        let list = parse_class_list("a bg-[rgba(0,0,0,0.5)]").unwrap();
        assert_eq!(list.names(), vec!["a", "bg-[rgba(0,0,0,0.5)]"]);
        assert_eq!(list.arbitrary(), vec![("bg", "rgba(0,0,0,0.5)")]);
    }
}
