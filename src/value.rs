//! Arbitrary Value Parser
//!
//! Parses the text inside a utility's brackets (`rgba(0,0,0,0.5)`, `12px`,
//! `#fff`, `0 0 4px red`) into a typed value.

use serde::{Deserialize, Serialize};

use crate::validate::{CompilerError, ERR_VALUE_SYNTAX};

/// Functions whose arguments are kept verbatim instead of being tokenized.
const RAW_FUNCTIONS: &[&str] = &["calc", "min", "max", "clamp", "env"];

/// Functions that evaluate to a length.
const LENGTH_FUNCTIONS: &[&str] = &["calc", "min", "max", "clamp", "var", "env"];

/// Color functions; printed with comma-separated arguments.
pub const COLOR_FUNCTIONS: &[&str] = &["rgb", "rgba", "hsl", "hsla"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<ArbitraryValue>,
    /// Separator written before each argument after the first: `,`, ` ` or ` / `.
    #[serde(default)]
    pub separators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ArbitraryValue {
    Function(FunctionCall),
    Dimension { value: f64, unit: String },
    Number(f64),
    Percentage(f64),
    Hex(String),
    Keyword(String),
    Url(String),
    List(Vec<ArbitraryValue>),
    Raw(String),
}

impl ArbitraryValue {
    pub fn to_css(&self) -> String {
        match self {
            ArbitraryValue::Function(call) => call.to_css(),
            ArbitraryValue::Dimension { value, unit } => format!("{}{}", value, unit),
            ArbitraryValue::Number(n) => n.to_string(),
            ArbitraryValue::Percentage(p) => format!("{}%", p),
            ArbitraryValue::Hex(h) => h.clone(),
            ArbitraryValue::Keyword(k) => k.clone(),
            ArbitraryValue::Url(u) => format!("url({})", u),
            ArbitraryValue::List(items) => items
                .iter()
                .map(ArbitraryValue::to_css)
                .collect::<Vec<_>>()
                .join(" "),
            ArbitraryValue::Raw(r) => r.clone(),
        }
    }

    pub fn is_length_like(&self) -> bool {
        match self {
            ArbitraryValue::Dimension { .. }
            | ArbitraryValue::Number(_)
            | ArbitraryValue::Percentage(_) => true,
            ArbitraryValue::Function(call) => LENGTH_FUNCTIONS.contains(&call.name.as_str()),
            _ => false,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionCall> {
        match self {
            ArbitraryValue::Function(call) => Some(call),
            _ => None,
        }
    }
}

impl FunctionCall {
    /// A call whose arguments are separated by commas.
    pub fn new(name: impl Into<String>, args: Vec<ArbitraryValue>) -> Self {
        let separators = vec![",".to_string(); args.len().saturating_sub(1)];
        Self {
            name: name.into(),
            args,
            separators,
        }
    }

    pub fn is_color(&self) -> bool {
        COLOR_FUNCTIONS.contains(&self.name.to_ascii_lowercase().as_str())
    }

    /// Color functions print in the comma form; everything else keeps the
    /// separators it was written with.
    pub fn to_css(&self) -> String {
        let canonical = self.is_color();
        let mut out = format!("{}(", self.name);
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                let sep = match self.separators.get(i - 1) {
                    Some(sep) if !canonical => sep.as_str(),
                    _ => ",",
                };
                out.push_str(sep);
            }
            out.push_str(&arg.to_css());
        }
        out.push(')');
        out
    }
}

fn normalize_separator(sep: &str) -> String {
    if sep.contains(',') {
        ",".to_string()
    } else if sep.contains('/') {
        " / ".to_string()
    } else {
        " ".to_string()
    }
}

fn syntax_error(input: &str, message: &str) -> CompilerError {
    CompilerError::detached(
        ERR_VALUE_SYNTAX,
        &format!("Invalid arbitrary value \"{}\": {}", input, message),
    )
}

struct ValueParser<'v> {
    input: &'v str,
    chars: Vec<char>,
    pos: usize,
}

impl<'v> ValueParser<'v> {
    fn new(input: &'v str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: &str) -> CompilerError {
        syntax_error(self.input, message)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace() || c == ',' || c == '/') {
            self.pos += 1;
        }
    }

    fn starts_number(&self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_at(1).map_or(false, |c| c.is_ascii_digit()),
            Some('+') | Some('-') => match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('.') => self.peek_at(2).map_or(false, |c| c.is_ascii_digit()),
                _ => false,
            },
            _ => false,
        }
    }

    fn parse_item(&mut self) -> Result<ArbitraryValue, CompilerError> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('#') => self.parse_hex(),
            Some('(') => Err(self.error("function call without a name")),
            Some('"') | Some('\'') => self.parse_string(),
            Some(_) if self.starts_number() => self.parse_numeric(),
            Some(c) if c.is_alphabetic() || c == '-' || c == '_' => self.parse_ident_or_function(),
            Some(c) => Err(self.error(&format!("unexpected '{}'", c))),
        }
    }

    fn parse_hex(&mut self) -> Result<ArbitraryValue, CompilerError> {
        let start = self.pos;
        self.pos += 1;
        while self.peek().map_or(false, |c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if text.len() < 2 || !text[1..].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error(&format!("'{}' is not a hex color", text)));
        }
        Ok(ArbitraryValue::Hex(text))
    }

    fn parse_string(&mut self) -> Result<ArbitraryValue, CompilerError> {
        let quote = self.chars[self.pos];
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\\' {
                self.pos += 1;
            } else if c == quote {
                let text: String = self.chars[start..self.pos].iter().collect();
                return Ok(ArbitraryValue::Keyword(text));
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_numeric(&mut self) -> Result<ArbitraryValue, CompilerError> {
        let start = self.pos;
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.pos += 1;
        }
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // `1e3` is an exponent, `1em` is a unit.
        if matches!(self.peek(), Some('e') | Some('E')) {
            let exp_digit = match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => Some(1),
                Some('+') | Some('-') if self.peek_at(2).map_or(false, |c| c.is_ascii_digit()) => {
                    Some(2)
                }
                _ => None,
            };
            if let Some(skip) = exp_digit {
                self.pos += skip;
                while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(&format!("'{}' is not a number", text)))?;

        if self.peek() == Some('%') {
            self.pos += 1;
            return Ok(ArbitraryValue::Percentage(value));
        }

        let unit_start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos > unit_start {
            let unit: String = self.chars[unit_start..self.pos].iter().collect();
            return Ok(ArbitraryValue::Dimension { value, unit });
        }

        Ok(ArbitraryValue::Number(value))
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .map_or(false, |c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Consumes up to and including the `)` that closes an already-consumed `(`.
    fn read_balanced_raw(&mut self) -> Result<String, CompilerError> {
        let start = self.pos;
        let mut depth = 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.chars[start..self.pos - 1].iter().collect());
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unclosed '('"))
    }

    fn parse_ident_or_function(&mut self) -> Result<ArbitraryValue, CompilerError> {
        let name = self.read_ident();
        if self.peek() != Some('(') {
            return Ok(ArbitraryValue::Keyword(name));
        }
        self.pos += 1;

        if name == "url" {
            let inner = self.read_balanced_raw()?;
            let inner = inner.trim().trim_matches(|c| c == '"' || c == '\'');
            return Ok(ArbitraryValue::Url(inner.to_string()));
        }

        if RAW_FUNCTIONS.contains(&name.as_str()) {
            let inner = self.read_balanced_raw()?;
            return Ok(ArbitraryValue::Function(FunctionCall::new(
                name,
                vec![ArbitraryValue::Raw(inner.trim().to_string())],
            )));
        }

        let mut args = Vec::new();
        let mut separators = Vec::new();
        loop {
            let sep_start = self.pos;
            self.skip_separators();
            match self.peek() {
                None => return Err(self.error("unclosed '('")),
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    if !args.is_empty() {
                        let sep: String = self.chars[sep_start..self.pos].iter().collect();
                        separators.push(normalize_separator(&sep));
                    }
                    args.push(self.parse_item()?);
                    match self.peek() {
                        Some(c) if c.is_whitespace() || c == ',' || c == '/' || c == ')' => {}
                        None => return Err(self.error("unclosed '('")),
                        Some(c) => {
                            return Err(self.error(&format!("unexpected '{}' in arguments", c)))
                        }
                    }
                }
            }
        }

        Ok(ArbitraryValue::Function(FunctionCall {
            name,
            args,
            separators,
        }))
    }
}

pub fn parse_value(input: &str) -> Result<ArbitraryValue, CompilerError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(syntax_error(input, "empty value"));
    }

    let mut parser = ValueParser::new(trimmed);
    let mut items = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.at_end() {
            break;
        }
        items.push(parser.parse_item()?);
        match parser.peek() {
            None => break,
            Some(c) if c.is_whitespace() => {}
            Some(c) => return Err(parser.error(&format!("unexpected trailing '{}'", c))),
        }
    }

    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Ok(ArbitraryValue::List(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_function() {
        let value = parse_value("rgba(0,0,0,0.5)").unwrap();
        let call = value.as_function().unwrap();
        assert_eq!(call.name, "rgba");
        assert_eq!(
            call.args,
            vec![
                ArbitraryValue::Number(0.0),
                ArbitraryValue::Number(0.0),
                ArbitraryValue::Number(0.0),
                ArbitraryValue::Number(0.5),
            ]
        );
        assert_eq!(value.to_css(), "rgba(0,0,0,0.5)");
    }

    #[test]
    fn test_space_and_slash_separated_arguments() {
        let value = parse_value("rgb(10 20 30 / 50%)").unwrap();
        let call = value.as_function().unwrap();
        assert_eq!(call.args.len(), 4);
        assert_eq!(call.args[3], ArbitraryValue::Percentage(50.0));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            parse_value("12px").unwrap(),
            ArbitraryValue::Dimension { value: 12.0, unit: "px".to_string() }
        );
        assert_eq!(parse_value(".5").unwrap(), ArbitraryValue::Number(0.5));
        assert_eq!(parse_value("-1.5e2").unwrap(), ArbitraryValue::Number(-150.0));
        assert_eq!(
            parse_value("2em").unwrap(),
            ArbitraryValue::Dimension { value: 2.0, unit: "em".to_string() }
        );
        assert_eq!(parse_value("50%").unwrap(), ArbitraryValue::Percentage(50.0));
        assert_eq!(parse_value("#0f0").unwrap(), ArbitraryValue::Hex("#0f0".to_string()));
        assert_eq!(parse_value("red").unwrap(), ArbitraryValue::Keyword("red".to_string()));
    }

    #[test]
    fn test_raw_and_url_functions() {
        let calc = parse_value("calc(100% - var(--gap))").unwrap();
        assert_eq!(calc.to_css(), "calc(100% - var(--gap))");
        assert!(calc.is_length_like());

        assert_eq!(
            parse_value("url('/img/bg.png')").unwrap(),
            ArbitraryValue::Url("/img/bg.png".to_string())
        );
        assert!(parse_value("var(--x)").unwrap().is_length_like());
    }

    #[test]
    fn test_list() {
        let value = parse_value("0 0 4px red").unwrap();
        assert!(matches!(value, ArbitraryValue::List(ref items) if items.len() == 4));
        assert_eq!(value.to_css(), "0 0 4px red");
    }

    #[test]
    fn test_nested_function() {
        let value = parse_value("drop-shadow(0 0 2px rgba(0,0,0,0.2))").unwrap();
        let call = value.as_function().unwrap();
        assert_eq!(call.args.len(), 4);
        assert!(call.args[3].as_function().is_some());
    }

    #[test]
    fn test_function_keeps_separators() {
        let gradient = parse_value("linear-gradient(to right,red,blue)").unwrap();
        assert_eq!(gradient.to_css(), "linear-gradient(to right,red,blue)");

        let shadow = parse_value("drop-shadow(0 0 2px rgba(0, 0, 0, 0.2))").unwrap();
        assert_eq!(shadow.to_css(), "drop-shadow(0 0 2px rgba(0,0,0,0.2))");

        let modern = parse_value("rgb(10 20 30 / 50%)").unwrap();
        assert_eq!(modern.to_css(), "rgb(10,20,30,50%)");

        let ratio = parse_value("foo(1 / 2)").unwrap();
        assert_eq!(ratio.to_css(), "foo(1 / 2)");
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "rgba(0,0,0", "(1,2)", "12px)", "#zz", "rgba(0;0)", "'open"] {
            let err = parse_value(bad).unwrap_err();
            assert_eq!(err.code, ERR_VALUE_SYNTAX, "{}", bad);
        }
    }
}
