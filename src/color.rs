//! Color validation and normalization for arbitrary values.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::validate::{CompilerError, ERR_COLOR_ARGUMENTS, ERR_COLOR_RANGE};
use crate::value::{ArbitraryValue, FunctionCall};

/// CSS Color 4 named colors as 0xRRGGBB.
const NAMED_COLOR_TABLE: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];

lazy_static! {
    static ref NAMED_COLORS: HashMap<&'static str, u32> = NAMED_COLOR_TABLE.iter().copied().collect();
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorFormat {
    /// `#rrggbb`, or `#rrggbbaa` when translucent.
    #[default]
    Hex,
    /// `rgb(r,g,b)`, or `rgba(r,g,b,a)` when translucent.
    Rgba,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f32,
}

fn arity_error(call: &FunctionCall, expected: &str) -> CompilerError {
    CompilerError::detached(
        ERR_COLOR_ARGUMENTS,
        &format!(
            "{}() takes {} arguments, got {} in \"{}\"",
            call.name,
            expected,
            call.args.len(),
            call.to_css()
        ),
    )
}

fn kind_error(call: &FunctionCall, arg: &ArbitraryValue, expected: &str) -> CompilerError {
    CompilerError::detached(
        ERR_COLOR_ARGUMENTS,
        &format!(
            "{}() argument \"{}\" must be {}",
            call.name,
            arg.to_css(),
            expected
        ),
    )
}

fn range_error(call: &FunctionCall, what: &str, got: f64, range: &str) -> CompilerError {
    CompilerError::detached(
        ERR_COLOR_RANGE,
        &format!(
            "{} {} out of range {} in \"{}\"",
            what,
            got,
            range,
            call.to_css()
        ),
    )
}

fn rgb_channel(call: &FunctionCall, arg: &ArbitraryValue) -> Result<u8, CompilerError> {
    match arg {
        ArbitraryValue::Number(n) => {
            if !(0.0..=255.0).contains(n) {
                return Err(range_error(call, "channel", *n, "0-255"));
            }
            Ok(n.round() as u8)
        }
        ArbitraryValue::Percentage(p) => {
            if !(0.0..=100.0).contains(p) {
                return Err(range_error(call, "channel", *p, "0%-100%"));
            }
            Ok((p * 2.55).round() as u8)
        }
        other => Err(kind_error(call, other, "a number or percentage")),
    }
}

fn alpha_channel(call: &FunctionCall, arg: &ArbitraryValue) -> Result<f32, CompilerError> {
    match arg {
        ArbitraryValue::Number(n) => {
            if !(0.0..=1.0).contains(n) {
                return Err(range_error(call, "alpha", *n, "0-1"));
            }
            Ok(*n as f32)
        }
        ArbitraryValue::Percentage(p) => {
            if !(0.0..=100.0).contains(p) {
                return Err(range_error(call, "alpha", *p, "0%-100%"));
            }
            Ok((*p / 100.0) as f32)
        }
        other => Err(kind_error(call, other, "a number or percentage")),
    }
}

fn hue_degrees(call: &FunctionCall, arg: &ArbitraryValue) -> Result<f64, CompilerError> {
    match arg {
        ArbitraryValue::Number(n) => Ok(*n),
        ArbitraryValue::Dimension { value, unit } => match unit.as_str() {
            "deg" => Ok(*value),
            "turn" => Ok(value * 360.0),
            "rad" => Ok(value.to_degrees()),
            "grad" => Ok(value * 0.9),
            _ => Err(kind_error(call, arg, "an angle")),
        },
        other => Err(kind_error(call, other, "an angle")),
    }
}

fn unit_percentage(call: &FunctionCall, arg: &ArbitraryValue, what: &str) -> Result<f64, CompilerError> {
    match arg {
        ArbitraryValue::Percentage(p) => {
            if !(0.0..=100.0).contains(p) {
                return Err(range_error(call, what, *p, "0%-100%"));
            }
            Ok(p / 100.0)
        }
        other => Err(kind_error(call, other, "a percentage")),
    }
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 360.0;
    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;

    let channel = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round() as u8
    };

    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

impl Rgba {
    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    pub fn from_function(call: &FunctionCall) -> Result<Rgba, CompilerError> {
        match call.name.to_ascii_lowercase().as_str() {
            "rgb" | "rgba" => {
                if call.args.len() != 3 && call.args.len() != 4 {
                    return Err(arity_error(call, "3 or 4"));
                }
                let alpha = match call.args.get(3) {
                    Some(arg) => alpha_channel(call, arg)?,
                    None => 1.0,
                };
                Ok(Rgba {
                    red: rgb_channel(call, &call.args[0])?,
                    green: rgb_channel(call, &call.args[1])?,
                    blue: rgb_channel(call, &call.args[2])?,
                    alpha,
                })
            }
            "hsl" | "hsla" => {
                if call.args.len() != 3 && call.args.len() != 4 {
                    return Err(arity_error(call, "3 or 4"));
                }
                let hue = hue_degrees(call, &call.args[0])?;
                let saturation = unit_percentage(call, &call.args[1], "saturation")?;
                let lightness = unit_percentage(call, &call.args[2], "lightness")?;
                let alpha = match call.args.get(3) {
                    Some(arg) => alpha_channel(call, arg)?,
                    None => 1.0,
                };
                let (red, green, blue) = hsl_to_rgb(hue, saturation, lightness);
                Ok(Rgba { red, green, blue, alpha })
            }
            other => Err(CompilerError::detached(
                ERR_COLOR_ARGUMENTS,
                &format!("{}() is not a supported color function", other),
            )),
        }
    }

    pub fn from_hex(hex: &str) -> Result<Rgba, CompilerError> {
        let digits = hex.trim_start_matches('#');
        let invalid = || {
            CompilerError::detached(
                ERR_COLOR_ARGUMENTS,
                &format!("\"{}\" is not a 3, 4, 6 or 8 digit hex color", hex),
            )
        };
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return Err(invalid()),
        };
        let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());

        let alpha = if expanded.len() == 8 {
            byte(6)? as f32 / 255.0
        } else {
            1.0
        };
        Ok(Rgba {
            red: byte(0)?,
            green: byte(2)?,
            blue: byte(4)?,
            alpha,
        })
    }

    pub fn from_keyword(keyword: &str) -> Option<Rgba> {
        let lower = keyword.to_ascii_lowercase();
        if lower == "transparent" {
            return Some(Rgba { red: 0, green: 0, blue: 0, alpha: 0.0 });
        }
        NAMED_COLORS.get(lower.as_str()).map(|rgb| Rgba {
            red: (rgb >> 16) as u8,
            green: (rgb >> 8) as u8,
            blue: *rgb as u8,
            alpha: 1.0,
        })
    }

    /// `None` when the value is not color-shaped at all.
    pub fn from_value(value: &ArbitraryValue) -> Option<Result<Rgba, CompilerError>> {
        match value {
            ArbitraryValue::Function(call) if call.is_color() => Some(Rgba::from_function(call)),
            ArbitraryValue::Hex(hex) => Some(Rgba::from_hex(hex)),
            ArbitraryValue::Keyword(keyword) => Rgba::from_keyword(keyword).map(Ok),
            _ => None,
        }
    }

    /// Validates every color in `value`, including colors inside lists and
    /// the arguments of other functions.
    pub fn check_all(value: &ArbitraryValue) -> Result<(), CompilerError> {
        if let Some(Err(e)) = Rgba::from_value(value) {
            return Err(e);
        }
        match value {
            ArbitraryValue::List(items) => items.iter().try_for_each(Rgba::check_all),
            ArbitraryValue::Function(call) if !call.is_color() => {
                call.args.iter().try_for_each(Rgba::check_all)
            }
            _ => Ok(()),
        }
    }

    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        } else {
            let alpha = (self.alpha * 255.0).round() as u8;
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                self.red, self.green, self.blue, alpha
            )
        }
    }

    pub fn to_css(&self) -> String {
        if self.is_opaque() {
            format!("rgb({},{},{})", self.red, self.green, self.blue)
        } else {
            format!("rgba({},{},{},{})", self.red, self.green, self.blue, self.alpha)
        }
    }

    pub fn format(&self, format: ColorFormat) -> String {
        match format {
            ColorFormat::Hex => self.to_hex(),
            ColorFormat::Rgba => self.to_css(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::parse_value;

    fn color(input: &str) -> Result<Rgba, CompilerError> {
        Rgba::from_value(&parse_value(input).unwrap()).expect("color-shaped value")
    }

    #[test]
    fn test_translucent_black() {
        let c = color("rgba(0,0,0,0.5)").unwrap();
        assert_eq!((c.red, c.green, c.blue), (0, 0, 0));
        assert_eq!(c.alpha, 0.5);
        assert_eq!(c.to_hex(), "#00000080");
        assert_eq!(c.to_css(), "rgba(0,0,0,0.5)");
    }

    #[test]
    fn test_opaque_output() {
        let c = color("rgb(255, 128, 0)").unwrap();
        assert_eq!(c.to_hex(), "#ff8000");
        assert_eq!(c.format(ColorFormat::Rgba), "rgb(255,128,0)");
    }

    #[test]
    fn test_percent_channels_and_alpha() {
        let c = color("rgb(100% 0% 0% / 25%)").unwrap();
        assert_eq!(c.red, 255);
        assert_eq!(c.alpha, 0.25);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(color("rgba(256,0,0,1)").unwrap_err().code, ERR_COLOR_RANGE);
        assert_eq!(color("rgba(0,0,0,1.5)").unwrap_err().code, ERR_COLOR_RANGE);
        assert_eq!(color("rgb(-1,0,0)").unwrap_err().code, ERR_COLOR_RANGE);
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(color("rgba(0,0)").unwrap_err().code, ERR_COLOR_ARGUMENTS);
        assert_eq!(color("rgb(0,0,0,0,0)").unwrap_err().code, ERR_COLOR_ARGUMENTS);
        assert_eq!(color("rgb(0px,0,0)").unwrap_err().code, ERR_COLOR_ARGUMENTS);
    }

    #[test]
    fn test_hsl() {
        assert_eq!(color("hsl(0, 100%, 50%)").unwrap().to_hex(), "#ff0000");
        assert_eq!(color("hsl(120deg 100% 25%)").unwrap().to_hex(), "#008000");
        assert_eq!(color("hsla(240,100%,50%,0.5)").unwrap().to_hex(), "#0000ff80");
    }

    #[test]
    fn test_hex_and_keywords() {
        assert_eq!(Rgba::from_hex("#fff").unwrap().to_hex(), "#ffffff");
        assert_eq!(Rgba::from_hex("#0008").unwrap().to_hex(), "#00000088");
        assert!(Rgba::from_hex("#12345").is_err());
        assert_eq!(Rgba::from_keyword("Red").unwrap().to_hex(), "#ff0000");
        assert_eq!(Rgba::from_keyword("transparent").unwrap().to_hex(), "#00000000");
        assert!(Rgba::from_value(&parse_value("12px").unwrap()).is_none());
        assert!(Rgba::from_value(&parse_value("solid").unwrap()).is_none());
    }

    #[test]
    fn test_full_keyword_table() {
        assert_eq!(NAMED_COLOR_TABLE.len(), 148);
        assert_eq!(Rgba::from_keyword("rebeccapurple").unwrap().to_hex(), "#663399");
        assert_eq!(Rgba::from_keyword("LightGoldenrodYellow").unwrap().to_hex(), "#fafad2");
        assert_eq!(Rgba::from_keyword("lightblue").unwrap().to_hex(), "#add8e6");
        assert!(Rgba::from_keyword("currentcolor").is_none());
    }

    #[test]
    fn test_nested_colors_are_checked() {
        let check = |input: &str| Rgba::check_all(&parse_value(input).unwrap());
        assert!(check("0 0 4px rgba(0,0,0,0.5)").is_ok());
        assert!(check("linear-gradient(to right,red,#00f)").is_ok());
        assert_eq!(check("0 0 4px rgba(0,0,0,9)").unwrap_err().code, ERR_COLOR_RANGE);
        assert_eq!(
            check("linear-gradient(rgba(300,0,0,1),red)").unwrap_err().code,
            ERR_COLOR_RANGE
        );
        assert_eq!(
            check("drop-shadow(0 0 2px rgb(0,0))").unwrap_err().code,
            ERR_COLOR_ARGUMENTS
        );
    }
}
