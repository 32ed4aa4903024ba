use serde::{Deserialize, Serialize};

/// RGBA 颜色，每个通道 0–255，序列化为 `[r, g, b, a]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(255, 255, 255, 0);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.a == 0
    }
}

impl From<Vec<i64>> for Color {
    /// 宽松解析：越界通道被夹到 0–255，缺失的 RGB 通道取 0，缺失的 alpha 取 255。
    fn from(channels: Vec<i64>) -> Self {
        let channel = |index: usize, fallback: u8| {
            channels
                .get(index)
                .map(|value| (*value).clamp(0, 255) as u8)
                .unwrap_or(fallback)
        };
        Self::rgba(channel(0, 0), channel(1, 0), channel(2, 0), channel(3, 255))
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b, color.a]
    }
}

/// 描边样式，整数编码与渲染层的画笔样式一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum StrokeStyle {
    None,
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
}

impl StrokeStyle {
    pub fn code(self) -> i64 {
        match self {
            StrokeStyle::None => 0,
            StrokeStyle::Solid => 1,
            StrokeStyle::Dash => 2,
            StrokeStyle::Dot => 3,
            StrokeStyle::DashDot => 4,
            StrokeStyle::DashDotDot => 5,
        }
    }
}

impl From<i64> for StrokeStyle {
    fn from(code: i64) -> Self {
        match code {
            0 => StrokeStyle::None,
            2 => StrokeStyle::Dash,
            3 => StrokeStyle::Dot,
            4 => StrokeStyle::DashDot,
            5 => StrokeStyle::DashDotDot,
            _ => StrokeStyle::Solid,
        }
    }
}

impl From<StrokeStyle> for i64 {
    fn from(style: StrokeStyle) -> Self {
        style.code()
    }
}

/// 填充样式，整数编码与渲染层的画刷样式一致（未列出的编码回退为无填充）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FillStyle {
    #[default]
    None,
    Solid,
    Horizontal,
    Vertical,
    Cross,
    BackwardDiagonal,
    ForwardDiagonal,
    DiagonalCross,
}

impl FillStyle {
    pub fn code(self) -> i64 {
        match self {
            FillStyle::None => 0,
            FillStyle::Solid => 1,
            FillStyle::Horizontal => 9,
            FillStyle::Vertical => 10,
            FillStyle::Cross => 11,
            FillStyle::BackwardDiagonal => 12,
            FillStyle::ForwardDiagonal => 13,
            FillStyle::DiagonalCross => 14,
        }
    }
}

impl From<i64> for FillStyle {
    fn from(code: i64) -> Self {
        match code {
            1 => FillStyle::Solid,
            9 => FillStyle::Horizontal,
            10 => FillStyle::Vertical,
            11 => FillStyle::Cross,
            12 => FillStyle::BackwardDiagonal,
            13 => FillStyle::ForwardDiagonal,
            14 => FillStyle::DiagonalCross,
            _ => FillStyle::None,
        }
    }
}

impl From<FillStyle> for i64 {
    fn from(style: FillStyle) -> Self {
        style.code()
    }
}

/// 字体样式位标记。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct FontStyle(u8);

impl FontStyle {
    pub const NORMAL: FontStyle = FontStyle(0);
    pub const BOLD: FontStyle = FontStyle(1);
    pub const ITALIC: FontStyle = FontStyle(2);
    pub const UNDERLINE: FontStyle = FontStyle(4);

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, flag: FontStyle) -> bool {
        self.0 & flag.0 == flag.0
    }

    #[inline]
    pub fn with(self, flag: FontStyle) -> Self {
        Self(self.0 | flag.0)
    }
}

impl From<i64> for FontStyle {
    fn from(bits: i64) -> Self {
        Self((bits & 0b111) as u8)
    }
}

impl From<FontStyle> for i64 {
    fn from(style: FontStyle) -> Self {
        i64::from(style.0)
    }
}

/// 渲染层消费的表现属性。按约定视为不可变值，修改时整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub stroke_style: StrokeStyle,
    pub fill_color: Color,
    pub fill_style: FillStyle,
    pub point_size: f64,
    pub font_family: String,
    pub font_size: f64,
    pub font_style: FontStyle,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_color: Color::BLACK,
            stroke_width: 1.0,
            stroke_style: StrokeStyle::Solid,
            fill_color: Color::TRANSPARENT,
            fill_style: FillStyle::None,
            point_size: 6.0,
            font_family: "Arial".to_string(),
            font_size: 12.0,
            font_style: FontStyle::NORMAL,
        }
    }
}

impl Style {
    /// 包围盒为渲染描边预留的外扩量。
    #[inline]
    pub fn half_stroke_width(&self) -> f64 {
        self.stroke_width.max(0.0) / 2.0
    }

    #[inline]
    pub fn has_stroke(&self) -> bool {
        self.stroke_style != StrokeStyle::None && !self.stroke_color.is_transparent()
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.fill_style != FillStyle::None && !self.fill_color.is_transparent()
    }

    #[inline]
    pub fn is_bold(&self) -> bool {
        self.font_style.contains(FontStyle::BOLD)
    }

    #[inline]
    pub fn is_italic(&self) -> bool {
        self.font_style.contains(FontStyle::ITALIC)
    }

    #[inline]
    pub fn is_underline(&self) -> bool {
        self.font_style.contains(FontStyle::UNDERLINE)
    }

    pub fn with_stroke(mut self, color: Color, width: f64) -> Self {
        self.stroke_color = color;
        self.stroke_width = width;
        self
    }

    pub fn with_fill(mut self, color: Color, fill_style: FillStyle) -> Self {
        self.fill_color = color;
        self.fill_style = fill_style;
        self
    }

    pub fn with_font(mut self, family: impl Into<String>, size: f64, font_style: FontStyle) -> Self {
        self.font_family = family.into();
        self.font_size = size;
        self.font_style = font_style;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn style_serializes_to_flat_codes() {
        let style = Style::default()
            .with_stroke(Color::rgb(200, 10, 10), 3.0)
            .with_fill(Color::rgba(0, 0, 255, 128), FillStyle::DiagonalCross)
            .with_font("Noto Serif", 18.0, FontStyle::BOLD.with(FontStyle::ITALIC));
        let value = serde_json::to_value(&style).unwrap();
        assert_eq!(value["stroke_color"], json!([200, 10, 10, 255]));
        assert_eq!(value["fill_color"], json!([0, 0, 255, 128]));
        assert_eq!(value["stroke_style"], json!(1));
        assert_eq!(value["fill_style"], json!(14));
        assert_eq!(value["font_style"], json!(3));

        let restored: Style = serde_json::from_value(value).unwrap();
        assert_eq!(restored, style);
        assert!(restored.is_bold() && restored.is_italic() && !restored.is_underline());
        assert!(restored.is_filled());
    }

    #[test]
    fn partial_style_falls_back_to_defaults() {
        let restored: Style = serde_json::from_value(json!({
            "stroke_width": 4.0,
            "stroke_style": 42,
            "fill_color": [300, -2, 7],
        }))
        .unwrap();
        assert_eq!(restored.stroke_width, 4.0);
        assert_eq!(restored.stroke_style, StrokeStyle::Solid);
        assert_eq!(restored.fill_color, Color::rgba(255, 0, 7, 255));
        assert_eq!(restored.font_family, "Arial");
        assert!((restored.half_stroke_width() - 2.0).abs() < f64::EPSILON);
    }
}
