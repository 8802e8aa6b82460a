//! Utility class expansion.
//!
//! Turns utility tokens (`flex`, `bg-[rgba(0,0,0,0.5)]`, `[mask-type:alpha]`)
//! into CSS declarations that can be written into an inline style.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::class_list::{ClassKind, ClassToken};
use crate::color::{ColorFormat, Rgba};
use crate::stylesheet::StyleDeclaration;
use crate::validate::CompilerError;
use crate::value::{parse_value, ArbitraryValue};

lazy_static! {
    /// Static utilities that need no value.
    static ref STATIC_UTILITIES: HashMap<&'static str, Vec<(&'static str, &'static str)>> = {
        let mut m = HashMap::new();
        m.insert("block", vec![("display", "block")]);
        m.insert("inline-block", vec![("display", "inline-block")]);
        m.insert("inline", vec![("display", "inline")]);
        m.insert("flex", vec![("display", "flex")]);
        m.insert("inline-flex", vec![("display", "inline-flex")]);
        m.insert("grid", vec![("display", "grid")]);
        m.insert("hidden", vec![("display", "none")]);
        m.insert("flex-row", vec![("flex-direction", "row")]);
        m.insert("flex-row-reverse", vec![("flex-direction", "row-reverse")]);
        m.insert("flex-col", vec![("flex-direction", "column")]);
        m.insert("flex-col-reverse", vec![("flex-direction", "column-reverse")]);
        m.insert("flex-wrap", vec![("flex-wrap", "wrap")]);
        m.insert("flex-nowrap", vec![("flex-wrap", "nowrap")]);
        m.insert("flex-1", vec![("flex", "1 1 0%")]);
        m.insert("flex-auto", vec![("flex", "1 1 auto")]);
        m.insert("flex-none", vec![("flex", "none")]);
        m.insert("shrink-0", vec![("flex-shrink", "0")]);
        m.insert("grow", vec![("flex-grow", "1")]);
        m.insert("items-start", vec![("align-items", "flex-start")]);
        m.insert("items-end", vec![("align-items", "flex-end")]);
        m.insert("items-center", vec![("align-items", "center")]);
        m.insert("items-baseline", vec![("align-items", "baseline")]);
        m.insert("items-stretch", vec![("align-items", "stretch")]);
        m.insert("justify-start", vec![("justify-content", "flex-start")]);
        m.insert("justify-end", vec![("justify-content", "flex-end")]);
        m.insert("justify-center", vec![("justify-content", "center")]);
        m.insert("justify-between", vec![("justify-content", "space-between")]);
        m.insert("justify-around", vec![("justify-content", "space-around")]);
        m.insert("justify-evenly", vec![("justify-content", "space-evenly")]);
        m.insert("static", vec![("position", "static")]);
        m.insert("relative", vec![("position", "relative")]);
        m.insert("absolute", vec![("position", "absolute")]);
        m.insert("fixed", vec![("position", "fixed")]);
        m.insert("sticky", vec![("position", "sticky")]);
        m.insert("overflow-hidden", vec![("overflow", "hidden")]);
        m.insert("overflow-auto", vec![("overflow", "auto")]);
        m.insert("overflow-scroll", vec![("overflow", "scroll")]);
        m.insert("overflow-visible", vec![("overflow", "visible")]);
        m.insert("text-left", vec![("text-align", "left")]);
        m.insert("text-center", vec![("text-align", "center")]);
        m.insert("text-right", vec![("text-align", "right")]);
        m.insert("font-normal", vec![("font-weight", "400")]);
        m.insert("font-medium", vec![("font-weight", "500")]);
        m.insert("font-semibold", vec![("font-weight", "600")]);
        m.insert("font-bold", vec![("font-weight", "700")]);
        m.insert("italic", vec![("font-style", "italic")]);
        m.insert("not-italic", vec![("font-style", "normal")]);
        m.insert("underline", vec![("text-decoration", "underline")]);
        m.insert("line-through", vec![("text-decoration", "line-through")]);
        m.insert("no-underline", vec![("text-decoration", "none")]);
        m.insert("uppercase", vec![("text-transform", "uppercase")]);
        m.insert("lowercase", vec![("text-transform", "lowercase")]);
        m.insert("capitalize", vec![("text-transform", "capitalize")]);
        m.insert(
            "truncate",
            vec![
                ("overflow", "hidden"),
                ("text-overflow", "ellipsis"),
                ("white-space", "nowrap"),
            ],
        );
        m.insert("w-full", vec![("width", "100%")]);
        m.insert("h-full", vec![("height", "100%")]);
        m.insert("w-screen", vec![("width", "100vw")]);
        m.insert("h-screen", vec![("height", "100vh")]);
        m
    };

    /// Arbitrary-value prefixes that always map to the same properties.
    static ref LENGTH_PREFIXES: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("w", vec!["width"]);
        m.insert("h", vec!["height"]);
        m.insert("min-w", vec!["min-width"]);
        m.insert("max-w", vec!["max-width"]);
        m.insert("min-h", vec!["min-height"]);
        m.insert("max-h", vec!["max-height"]);
        m.insert("size", vec!["width", "height"]);
        m.insert("p", vec!["padding"]);
        m.insert("px", vec!["padding-left", "padding-right"]);
        m.insert("py", vec!["padding-top", "padding-bottom"]);
        m.insert("pt", vec!["padding-top"]);
        m.insert("pr", vec!["padding-right"]);
        m.insert("pb", vec!["padding-bottom"]);
        m.insert("pl", vec!["padding-left"]);
        m.insert("m", vec!["margin"]);
        m.insert("mx", vec!["margin-left", "margin-right"]);
        m.insert("my", vec!["margin-top", "margin-bottom"]);
        m.insert("mt", vec!["margin-top"]);
        m.insert("mr", vec!["margin-right"]);
        m.insert("mb", vec!["margin-bottom"]);
        m.insert("ml", vec!["margin-left"]);
        m.insert("gap", vec!["gap"]);
        m.insert("gap-x", vec!["column-gap"]);
        m.insert("gap-y", vec!["row-gap"]);
        m.insert("top", vec!["top"]);
        m.insert("right", vec!["right"]);
        m.insert("bottom", vec!["bottom"]);
        m.insert("left", vec!["left"]);
        m.insert("inset", vec!["top", "right", "bottom", "left"]);
        m.insert("rounded", vec!["border-radius"]);
        m.insert("leading", vec!["line-height"]);
        m.insert("tracking", vec!["letter-spacing"]);
        m.insert("basis", vec!["flex-basis"]);
        m
    };

    /// Prefixes whose value is copied through unchanged.
    static ref VERBATIM_PREFIXES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("opacity", "opacity");
        m.insert("z", "z-index");
        m.insert("flex", "flex");
        m.insert("shadow", "box-shadow");
        m.insert("aspect", "aspect-ratio");
        m.insert("grid-cols", "grid-template-columns");
        m.insert("grid-rows", "grid-template-rows");
        m.insert("content", "content");
        m
    };
}

/// How a value was read once type hints are taken into account.
enum ValueShape {
    Color(String),
    Length(String),
    Url(String),
    Other(String),
}

fn classify(
    hint: Option<&str>,
    value: &str,
    negative: bool,
    format: ColorFormat,
) -> Result<ValueShape, CompilerError> {
    let parsed = parse_value(value)?;
    Rgba::check_all(&parsed)?;

    if let Some(color) = Rgba::from_value(&parsed) {
        if hint.map_or(true, |h| h == "color") {
            return Ok(ValueShape::Color(color?.format(format)));
        }
    }

    let css = parsed.to_css();
    let shaped = match hint {
        Some("color") => ValueShape::Color(css),
        Some("length") | Some("percentage") | Some("number") => ValueShape::Length(css),
        Some("url") | Some("image") => ValueShape::Url(css),
        _ => match &parsed {
            ArbitraryValue::Url(_) => ValueShape::Url(css),
            v if v.is_length_like() => ValueShape::Length(css),
            _ => ValueShape::Other(css),
        },
    };

    Ok(match shaped {
        ValueShape::Length(css) if negative => ValueShape::Length(negate(&css)),
        other => other,
    })
}

fn negate(css: &str) -> String {
    match css.strip_prefix('-') {
        Some(positive) => positive.to_string(),
        None if css.starts_with("calc(") || css.starts_with("var(") => format!("calc({} * -1)", css),
        None => format!("-{}", css),
    }
}

fn declarations(properties: &[&str], value: &str, important: bool) -> Vec<StyleDeclaration> {
    properties
        .iter()
        .map(|p| StyleDeclaration {
            property: p.to_string(),
            value: value.to_string(),
            important,
        })
        .collect()
}

/// Declarations for one class token, or `None` when the token is not a
/// utility that can be inlined (variants, unknown prefixes, plain class names).
pub fn utility_declarations(
    token: &ClassToken,
    format: ColorFormat,
) -> Result<Option<Vec<StyleDeclaration>>, CompilerError> {
    if !token.variants.is_empty() {
        return Ok(None);
    }

    match &token.kind {
        ClassKind::Plain => Ok(STATIC_UTILITIES.get(token.utility.as_str()).map(|decls| {
            decls
                .iter()
                .map(|(p, v)| StyleDeclaration {
                    property: p.to_string(),
                    value: v.to_string(),
                    important: token.important,
                })
                .collect()
        })),
        ClassKind::ArbitraryProperty { property, value } => Ok(Some(declarations(
            &[property.as_str()],
            value,
            token.important,
        ))),
        ClassKind::Arbitrary { prefix, value, hint } => {
            let important = token.important;
            let shape = classify(hint.as_deref(), value, token.negative, format)?;
            let out = match (prefix.as_str(), shape) {
                ("bg", ValueShape::Color(c)) => declarations(&["background-color"], &c, important),
                ("bg", ValueShape::Url(u)) => declarations(&["background-image"], &u, important),
                ("bg", ValueShape::Length(v)) | ("bg", ValueShape::Other(v)) => {
                    declarations(&["background"], &v, important)
                }
                ("text", ValueShape::Color(c)) => declarations(&["color"], &c, important),
                ("text", ValueShape::Length(v)) | ("text", ValueShape::Other(v)) => {
                    declarations(&["font-size"], &v, important)
                }
                ("border", ValueShape::Color(c)) => declarations(&["border-color"], &c, important),
                ("border", ValueShape::Length(v)) => declarations(&["border-width"], &v, important),
                ("border", ValueShape::Other(v)) => declarations(&["border"], &v, important),
                ("fill", ValueShape::Color(c)) => declarations(&["fill"], &c, important),
                ("stroke", ValueShape::Color(c)) => declarations(&["stroke"], &c, important),
                ("stroke", ValueShape::Length(v)) => declarations(&["stroke-width"], &v, important),
                ("font", ValueShape::Length(v)) => declarations(&["font-weight"], &v, important),
                ("font", ValueShape::Other(v)) => declarations(&["font-family"], &v, important),
                (prefix, ValueShape::Length(v)) | (prefix, ValueShape::Other(v))
                    if LENGTH_PREFIXES.contains_key(prefix) =>
                {
                    declarations(&LENGTH_PREFIXES[prefix], &v, important)
                }
                (prefix, shape) if VERBATIM_PREFIXES.contains_key(prefix) => {
                    let v = match shape {
                        ValueShape::Color(v)
                        | ValueShape::Length(v)
                        | ValueShape::Url(v)
                        | ValueShape::Other(v) => v,
                    };
                    declarations(&[VERBATIM_PREFIXES[prefix]], &v, important)
                }
                _ => return Ok(None),
            };
            Ok(Some(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_list::parse_class_token;
    use crate::validate::ERR_COLOR_RANGE;

    fn expand(class: &str) -> Option<Vec<(String, String)>> {
        expand_as(class, ColorFormat::Hex)
    }

    fn expand_as(class: &str, format: ColorFormat) -> Option<Vec<(String, String)>> {
        let token = parse_class_token(class).unwrap();
        utility_declarations(&token, format)
            .unwrap()
            .map(|decls| decls.into_iter().map(|d| (d.property, d.value)).collect())
    }

    fn pair(p: &str, v: &str) -> (String, String) {
        (p.to_string(), v.to_string())
    }

    #[test]
    fn test_background_color() {
        assert_eq!(
            expand("bg-[rgba(0,0,0,0.5)]"),
            Some(vec![pair("background-color", "#00000080")])
        );
        assert_eq!(
            expand_as("bg-[rgba(0,0,0,0.5)]", ColorFormat::Rgba),
            Some(vec![pair("background-color", "rgba(0,0,0,0.5)")])
        );
        assert_eq!(
            expand("bg-[url(/a.png)]"),
            Some(vec![pair("background-image", "url(/a.png)")])
        );
    }

    #[test]
    fn test_text_color_vs_size() {
        assert_eq!(expand("text-[#fff]"), Some(vec![pair("color", "#ffffff")]));
        assert_eq!(expand("text-[14px]"), Some(vec![pair("font-size", "14px")]));
        assert_eq!(
            expand("text-[color:var(--brand)]"),
            Some(vec![pair("color", "var(--brand)")])
        );
    }

    #[test]
    fn test_lengths() {
        assert_eq!(
            expand("px-[12px]"),
            Some(vec![pair("padding-left", "12px"), pair("padding-right", "12px")])
        );
        assert_eq!(expand("-mt-[4px]"), Some(vec![pair("margin-top", "-4px")]));
        assert_eq!(
            expand("w-[calc(100%-10px)]"),
            Some(vec![pair("width", "calc(100%-10px)")])
        );
        assert_eq!(expand("z-[10]"), Some(vec![pair("z-index", "10")]));
    }

    #[test]
    fn test_static_and_property_utilities() {
        assert_eq!(expand("flex"), Some(vec![pair("display", "flex")]));
        assert_eq!(expand("hidden"), Some(vec![pair("display", "none")]));
        assert_eq!(expand("a"), None);
        assert_eq!(
            expand("[mask-type:luminance]"),
            Some(vec![pair("mask-type", "luminance")])
        );
    }

    #[test]
    fn test_variants_and_unknown_prefixes_are_skipped() {
        assert_eq!(expand("hover:bg-[red]"), None);
        assert_eq!(expand("foo-[12px]"), None);
    }

    #[test]
    fn test_functions_keep_their_separators() {
        assert_eq!(
            expand("bg-[linear-gradient(to_right,red,blue)]"),
            Some(vec![pair("background", "linear-gradient(to right,red,blue)")])
        );
        assert_eq!(
            expand("bg-[radial-gradient(circle_at_center,red,blue)]"),
            Some(vec![pair("background", "radial-gradient(circle at center,red,blue)")])
        );
        assert_eq!(
            expand("shadow-[0_0_4px_rgba(0,0,0,0.5)]"),
            Some(vec![pair("box-shadow", "0 0 4px rgba(0,0,0,0.5)")])
        );
    }

    #[test]
    fn test_named_colors_pick_color_properties() {
        assert_eq!(expand("text-[lightblue]"), Some(vec![pair("color", "#add8e6")]));
        assert_eq!(
            expand("border-[rebeccapurple]"),
            Some(vec![pair("border-color", "#663399")])
        );
    }

    #[test]
    fn test_nested_invalid_color_is_an_error() {
        let token = parse_class_token("shadow-[0_0_4px_rgba(0,0,0,9)]").unwrap();
        let err = utility_declarations(&token, ColorFormat::Hex).unwrap_err();
        assert_eq!(err.code, ERR_COLOR_RANGE);
    }

    #[test]
    fn test_invalid_color_is_an_error() {
        let token = parse_class_token("bg-[rgba(0,0,0,2)]").unwrap();
        let err = utility_declarations(&token, ColorFormat::Hex).unwrap_err();
        assert_eq!(err.code, ERR_COLOR_RANGE);
    }
}
