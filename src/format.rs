use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, Result};

lazy_static! {
    static ref HEX_COLOR_REGEX: Regex = Regex::new(r"^(?:#|0[xX])?([0-9a-fA-F]{6})$").unwrap();
}

/// A colour as stored in a format: an expression (`=...`), a variable (`$...`),
/// a decimal RGB integer, or empty when unset
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct DynamicColor {
    pub dvalue: String,
}

impl DynamicColor {
    pub fn unset() -> Self {
        DynamicColor {
            dvalue: String::new(),
        }
    }

    pub fn from_rgb(rgb: u32) -> Self {
        DynamicColor {
            dvalue: (rgb & 0xFF_FFFF).to_string(),
        }
    }

    pub fn from_expression(expr: &str) -> Self {
        DynamicColor {
            dvalue: expr.to_string(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        is_dynamic_value(&self.dvalue)
    }

    pub fn is_unset(&self) -> bool {
        self.dvalue.is_empty()
    }

    /// The literal RGB value, if the colour is neither unset nor dynamic
    pub fn rgb(&self) -> Option<u32> {
        if self.is_dynamic() {
            return None;
        }
        self.dvalue.parse::<u32>().ok()
    }
}

/// Whether a stored value is an expression or a bound variable
pub fn is_dynamic_value(value: &str) -> bool {
    value.starts_with('=') || value.starts_with('$')
}

pub fn to_hex(rgb: u32) -> String {
    format!("#{:06x}", rgb & 0xFF_FFFF)
}

pub fn parse_hex(text: &str) -> Result<u32> {
    let captures = HEX_COLOR_REGEX
        .captures(text.trim())
        .ok_or_else(|| ComposerError::validation(format!("invalid color literal: {}", text)))?;

    u32::from_str_radix(&captures[1], 16)
        .map_err(|e| ComposerError::validation(format!("invalid color literal {}: {}", text, e)))
}

/// How a colour editor presents its value
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Static,
    Expression,
}

/// UI side of a [`DynamicColor`]
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColorModel {
    pub mode: ColorMode,
    /// `#rrggbb` literal, only in static mode
    pub value: Option<String>,
    /// Expression or variable text, only in expression mode
    pub expression: Option<String>,
}

impl ColorModel {
    pub fn from_color(color: &DynamicColor) -> Self {
        if color.is_dynamic() {
            return ColorModel {
                mode: ColorMode::Expression,
                value: None,
                expression: Some(color.dvalue.clone()),
            };
        }

        ColorModel {
            mode: ColorMode::Static,
            value: color.rgb().map(to_hex),
            expression: None,
        }
    }

    pub fn to_color(&self) -> Result<DynamicColor> {
        match self.mode {
            ColorMode::Expression => {
                // stored text must start with the prefix; trailing text is kept as typed
                let expr = self.expression.as_deref().unwrap_or("").trim_start();
                if !is_dynamic_value(expr) {
                    return Err(ComposerError::validation(format!(
                        "color expression must start with '=' or '$': {}",
                        expr
                    )));
                }
                Ok(DynamicColor::from_expression(expr))
            }
            ColorMode::Static => match self.value.as_deref() {
                None | Some("") => Ok(DynamicColor::unset()),
                Some(hex) => parse_hex(hex).map(DynamicColor::from_rgb),
            },
        }
    }
}

/// Border or line style
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum LineStyle {
    None,
    #[default]
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
}

impl LineStyle {
    pub fn width(&self) -> u32 {
        match self {
            LineStyle::None => 0,
            LineStyle::Thin | LineStyle::Dashed | LineStyle::Dotted => 1,
            LineStyle::Medium => 2,
            LineStyle::Thick => 3,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum GradientDirection {
    #[default]
    Linear,
    Radial,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct GradientStop {
    /// 0.0 ..= 1.0
    pub offset: f64,
    pub rgb: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct GradientInfo {
    pub direction: GradientDirection,
    pub angle: i32,
    pub stops: Vec<GradientStop>,
}

impl GradientInfo {
    /// Stops must be ordered by offset and lie within 0..=1
    pub fn validate(&self) -> Result<()> {
        let mut last = 0.0;
        for stop in &self.stops {
            if !(0.0..=1.0).contains(&stop.offset) || stop.offset < last {
                return Err(ComposerError::validation(format!(
                    "gradient stop offset out of order: {}",
                    stop.offset
                )));
            }
            last = stop.offset;
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FontInfo {
    pub name: String,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontInfo {
    fn default() -> Self {
        FontInfo {
            name: "Roboto".to_string(),
            size: 11,
            bold: false,
            italic: false,
        }
    }
}

/// Visual format of one assembly
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FormatInfo {
    pub foreground: DynamicColor,
    pub background: DynamicColor,
    pub border_color: DynamicColor,
    pub line_style: LineStyle,
    /// Percent, 0 ..= 100
    pub alpha: u8,
    pub gradient: Option<GradientInfo>,
    pub font: FontInfo,
}

impl Default for FormatInfo {
    fn default() -> Self {
        FormatInfo {
            foreground: DynamicColor::from_rgb(0x000000),
            background: DynamicColor::unset(),
            border_color: DynamicColor::unset(),
            line_style: LineStyle::Thin,
            alpha: 100,
            gradient: None,
            font: FontInfo::default(),
        }
    }
}

pub fn check_alpha(alpha: u8) -> Result<u8> {
    if alpha > 100 {
        return Err(ComposerError::validation(format!(
            "alpha must be between 0 and 100: {}",
            alpha
        )));
    }
    Ok(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_color_reads_as_hex() {
        let model = ColorModel::from_color(&DynamicColor::from_rgb(0xff0000));
        assert_eq!(model.mode, ColorMode::Static);
        assert_eq!(model.value.as_deref(), Some("#ff0000"));
        assert_eq!(model.expression, None);
    }

    #[test]
    fn expression_and_variable_read_without_literal() {
        for stored in ["=if(x > 1, 'red', 'blue')", "$(colorVar)"] {
            let color = DynamicColor::from_expression(stored);
            let model = ColorModel::from_color(&color);
            assert_eq!(model.mode, ColorMode::Expression);
            assert_eq!(model.value, None);
            assert_eq!(model.to_color().unwrap(), color);
        }
    }

    #[test]
    fn stored_string_survives_round_trip() {
        let stored = DynamicColor {
            dvalue: "16711680".to_string(),
        };
        let back = ColorModel::from_color(&stored).to_color().unwrap();
        assert_eq!(back.dvalue, "16711680");
    }

    #[test]
    fn hex_literal_forms() {
        assert_eq!(parse_hex("#00ff00").unwrap(), 0x00ff00);
        assert_eq!(parse_hex("0x0000FF").unwrap(), 0x0000ff);
        assert_eq!(parse_hex("abcdef").unwrap(), 0xabcdef);
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("red").is_err());
    }

    #[test]
    fn expression_mode_requires_prefix() {
        let model = ColorModel {
            mode: ColorMode::Expression,
            value: None,
            expression: Some("red".to_string()),
        };
        assert!(matches!(model.to_color(), Err(ComposerError::Validation(_))));
    }

    #[test]
    fn unset_color_is_static_without_value() {
        let model = ColorModel::from_color(&DynamicColor::unset());
        assert_eq!(model.mode, ColorMode::Static);
        assert_eq!(model.value, None);
        assert!(model.to_color().unwrap().is_unset());
    }

    #[test]
    fn expression_whitespace_is_written_back_exactly() {
        for stored in ["=accent ", "$(brand)\t", "=if(a,\n 1, 2)  "] {
            let color = DynamicColor::from_expression(stored);
            let written = ColorModel::from_color(&color).to_color().unwrap();
            assert_eq!(written.dvalue, stored);
        }

        let typed = ColorModel {
            mode: ColorMode::Expression,
            value: None,
            expression: Some("  =accent ".to_string()),
        };
        assert_eq!(typed.to_color().unwrap().dvalue, "=accent ");
    }
}
