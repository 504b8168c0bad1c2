//! Drawing primitives and their conky-draw element encoding
//!
//! Widgets describe their backgrounds, graphs and images with the typed
//! structs below. [`encode`] turns one primitive into a Lua table literal
//! understood by the conky-draw plugin (https://github.com/fisadev/conky-draw).
//!
//! Colors are `#rrggbb[aa]` strings. The RGB part becomes an integer field and
//! the optional alpha byte a sibling field named after the color field with
//! `color` replaced by `alpha` (`bar_color` -> `bar_alpha`). Fonts are conky
//! descriptors such as `Ubuntu:bold:size=9`.

use std::fmt;

/// A point in overlay pixel coordinates, `y` growing downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

pub fn pt(x: i64, y: i64) -> Point {
    Point { x, y }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub from: Point,
    pub to: Point,
    pub color: String,
    pub thickness: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub from: Point,
    pub filepath: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarGraph {
    pub conky_value: String,
    pub from: Point,
    pub to: Point,
    pub bar_color: String,
    pub bar_thickness: i64,
    pub background_color: Option<String>,
    pub background_thickness: Option<i64>,
    pub max_value: Option<f64>,
    pub critical_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingGraph {
    pub conky_value: String,
    pub center: Point,
    pub radius: i64,
    pub bar_color: String,
    pub bar_thickness: i64,
    pub background_color: Option<String>,
    pub background_thickness: Option<i64>,
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableText {
    pub conky_value: String,
    pub from: Point,
    pub font: Option<String>,
    pub color: Option<String>,
}

/// One declarative drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    Line(Line),
    Image(Image),
    BarGraph(BarGraph),
    RingGraph(RingGraph),
    VariableText(VariableText),
}

impl DrawPrimitive {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Line(_) => "line",
            Self::Image(_) => "image",
            Self::BarGraph(_) => "bar_graph",
            Self::RingGraph(_) => "ring_graph",
            Self::VariableText(_) => "variable_text",
        }
    }

    /// Horizontal band spanning the full overlay width, used for widget
    /// backgrounds and headers.
    pub fn band(width: i64, top: i64, bottom: i64, color: &str) -> Self {
        Self::Line(Line {
            from: pt(width / 2, top),
            to: pt(width / 2, bottom),
            color: color.to_string(),
            thickness: width,
        })
    }
}

impl From<Line> for DrawPrimitive {
    fn from(value: Line) -> Self {
        Self::Line(value)
    }
}

impl From<Image> for DrawPrimitive {
    fn from(value: Image) -> Self {
        Self::Image(value)
    }
}

impl From<BarGraph> for DrawPrimitive {
    fn from(value: BarGraph) -> Self {
        Self::BarGraph(value)
    }
}

impl From<RingGraph> for DrawPrimitive {
    fn from(value: RingGraph) -> Self {
        Self::RingGraph(value)
    }
}

impl From<VariableText> for DrawPrimitive {
    fn from(value: VariableText) -> Self {
        Self::VariableText(value)
    }
}

/// Encoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum LuaValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Point(Point),
}

impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "'{}'", escape(value)),
            Self::Point(point) => write!(f, "{{x={},y={}}}", point.x, point.y),
        }
    }
}

pub type Fields = Vec<(String, LuaValue)>;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Encode a `#rrggbb[aa]` color under `field`, adding the derived alpha
/// field when an alpha byte is present. Anything that is not six hex digits
/// is passed through as a quoted string.
pub fn encode_color(field: &str, value: &str) -> Fields {
    let hex = value.trim().trim_start_matches('#');
    let rgb = hex.get(..6).filter(|rgb| rgb.chars().all(|c| c.is_ascii_hexdigit()));
    let Some(rgb) = rgb.and_then(|rgb| i64::from_str_radix(rgb, 16).ok()) else {
        return vec![(field.to_string(), LuaValue::Str(value.to_string()))];
    };

    let mut fields = vec![(field.to_string(), LuaValue::Int(rgb))];
    let alpha_field = field.replace("color", "alpha");
    if alpha_field != field {
        if let Some(alpha) = hex.get(6..8).and_then(|a| u8::from_str_radix(a, 16).ok()) {
            fields.push((alpha_field, LuaValue::Float(round1(alpha as f64 / 255.0))));
        }
    }
    fields
}

/// Encode a `name[:bold][:italic][:size=N]` font descriptor. Unknown
/// modifiers are ignored.
pub fn encode_font(value: &str) -> Fields {
    let mut parts = value.split(':');
    let mut fields = Fields::new();
    if let Some(name) = parts.next().map(str::trim).filter(|n| !n.is_empty()) {
        fields.push(("font".to_string(), LuaValue::Str(name.to_string())));
    }
    let mut bold = false;
    let mut italic = false;
    let mut size = None;
    for modifier in parts.map(str::trim) {
        match modifier {
            "bold" => bold = true,
            "italic" => italic = true,
            _ => {
                if let Some(n) = modifier.strip_prefix("size=") {
                    size = n
                        .parse::<i64>()
                        .map(LuaValue::Int)
                        .or_else(|_| n.parse::<f64>().map(LuaValue::Float))
                        .ok();
                }
            }
        }
    }
    if bold {
        fields.push(("bold".to_string(), LuaValue::Bool(true)));
    }
    if italic {
        fields.push(("italic".to_string(), LuaValue::Bool(true)));
    }
    if let Some(size) = size {
        fields.push(("font_size".to_string(), size));
    }
    fields
}

struct FieldList(Fields);

impl FieldList {
    fn new(kind: &str) -> Self {
        Self(vec![("kind".to_string(), LuaValue::Str(kind.to_string()))])
    }

    fn push(&mut self, key: &str, value: LuaValue) {
        self.0.push((key.to_string(), value));
    }

    fn opt_int(&mut self, key: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.push(key, LuaValue::Int(value));
        }
    }

    fn opt_float(&mut self, key: &str, value: Option<f64>) {
        if let Some(value) = value {
            self.push(key, LuaValue::Float(value));
        }
    }

    fn color(&mut self, key: &str, value: &str) {
        self.0.extend(encode_color(key, value));
    }

    fn opt_color(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.color(key, value);
        }
    }

    fn finish(self) -> String {
        let body: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{{{}}}", body.join(", "))
    }
}

/// Encode one primitive as a conky-draw element table.
pub fn encode(primitive: &DrawPrimitive) -> String {
    let mut out = FieldList::new(primitive.kind());
    match primitive {
        DrawPrimitive::Line(line) => {
            out.push("from", LuaValue::Point(line.from));
            out.push("to", LuaValue::Point(line.to));
            out.color("color", &line.color);
            out.push("thickness", LuaValue::Int(line.thickness));
        }
        DrawPrimitive::Image(image) => {
            out.push("from", LuaValue::Point(image.from));
            out.push("filepath", LuaValue::Str(image.filepath.clone()));
            out.opt_int("width", image.width);
            out.opt_int("height", image.height);
        }
        DrawPrimitive::BarGraph(bar) => {
            out.push("conky_value", LuaValue::Str(bar.conky_value.clone()));
            out.push("from", LuaValue::Point(bar.from));
            out.push("to", LuaValue::Point(bar.to));
            out.color("bar_color", &bar.bar_color);
            out.push("bar_thickness", LuaValue::Int(bar.bar_thickness));
            out.opt_color("background_color", bar.background_color.as_deref());
            out.opt_int("background_thickness", bar.background_thickness);
            out.opt_float("max_value", bar.max_value);
            out.opt_float("critical_threshold", bar.critical_threshold);
        }
        DrawPrimitive::RingGraph(ring) => {
            out.push("conky_value", LuaValue::Str(ring.conky_value.clone()));
            out.push("center", LuaValue::Point(ring.center));
            out.push("radius", LuaValue::Int(ring.radius));
            out.color("bar_color", &ring.bar_color);
            out.push("bar_thickness", LuaValue::Int(ring.bar_thickness));
            out.opt_color("background_color", ring.background_color.as_deref());
            out.opt_int("background_thickness", ring.background_thickness);
            out.opt_float("max_value", ring.max_value);
        }
        DrawPrimitive::VariableText(text) => {
            out.push("conky_value", LuaValue::Str(text.conky_value.clone()));
            out.push("from", LuaValue::Point(text.from));
            if let Some(font) = &text.font {
                out.0.extend(encode_font(font));
            }
            out.opt_color("color", text.color.as_deref());
        }
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(fields: &'a Fields, key: &str) -> Option<&'a LuaValue> {
        fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn test_color_with_alpha() {
        let fields = encode_color("color", "AABBCCDD");
        assert_eq!(field(&fields, "color"), Some(&LuaValue::Int(0xAABBCC)));
        assert_eq!(field(&fields, "alpha"), Some(&LuaValue::Float(0.9)));
        assert!(field(&fields, "coloralpha").is_none());
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_color_without_alpha() {
        let fields = encode_color("bgcolor", "112233");
        assert_eq!(fields, vec![("bgcolor".to_string(), LuaValue::Int(0x112233))]);
    }

    #[test]
    fn test_alpha_name_follows_field() {
        let fields = encode_color("background_color", "#00000033");
        assert_eq!(field(&fields, "background_color"), Some(&LuaValue::Int(0)));
        assert_eq!(field(&fields, "background_alpha"), Some(&LuaValue::Float(0.2)));
    }

    #[test]
    fn test_malformed_colors_degrade() {
        assert_eq!(
            encode_color("color", "#abc"),
            vec![("color".to_string(), LuaValue::Str("#abc".to_string()))]
        );
        // bad alpha byte keeps the rgb part
        assert_eq!(encode_color("color", "#112233zz"), vec![("color".to_string(), LuaValue::Int(0x112233))]);
    }

    #[test]
    fn test_font_descriptor() {
        let fields = encode_font("Ubuntu:bold:size=9");
        assert_eq!(field(&fields, "font"), Some(&LuaValue::Str("Ubuntu".to_string())));
        assert_eq!(field(&fields, "bold"), Some(&LuaValue::Bool(true)));
        assert_eq!(field(&fields, "font_size"), Some(&LuaValue::Int(9)));
        assert!(field(&fields, "italic").is_none());
    }

    #[test]
    fn test_font_without_modifiers() {
        assert_eq!(
            encode_font("Ubuntu Mono"),
            vec![("font".to_string(), LuaValue::Str("Ubuntu Mono".to_string()))]
        );
        let fields = encode_font("DejaVu:italic:weird:size=7.5");
        assert_eq!(field(&fields, "italic"), Some(&LuaValue::Bool(true)));
        assert_eq!(field(&fields, "font_size"), Some(&LuaValue::Float(7.5)));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_encode_line() {
        let line = DrawPrimitive::band(200, 40, 125, "#1d2021cc");
        assert_eq!(
            encode(&line),
            "{kind='line', from={x=100,y=40}, to={x=100,y=125}, color=1908769, alpha=0.8, thickness=200}"
        );
    }

    #[test]
    fn test_encode_optional_fields_omitted() {
        let image = DrawPrimitive::from(Image {
            from: pt(140, 48),
            filepath: "/tmp/it's.jpg".to_string(),
            width: Some(50),
            height: None,
        });
        assert_eq!(encode(&image), "{kind='image', from={x=140,y=48}, filepath='/tmp/it\\'s.jpg', width=50}");
    }

    #[test]
    fn test_encode_ring_graph() {
        let ring = DrawPrimitive::from(RingGraph {
            conky_value: "fs_used_perc /".to_string(),
            center: pt(172, 65),
            radius: 8,
            bar_color: "#d79921".to_string(),
            bar_thickness: 4,
            background_color: Some("#00000033".to_string()),
            ..Default::default()
        });
        assert_eq!(
            encode(&ring),
            "{kind='ring_graph', conky_value='fs_used_perc /', center={x=172,y=65}, radius=8, \
             bar_color=14129441, bar_thickness=4, background_color=0, background_alpha=0.2}"
        );
    }

    #[test]
    fn test_encode_variable_text() {
        let text = DrawPrimitive::from(VariableText {
            conky_value: "time %H".to_string(),
            from: pt(10, 20),
            font: Some("Ubuntu:bold:size=9".to_string()),
            color: Some("#ffffff".to_string()),
        });
        assert_eq!(
            encode(&text),
            "{kind='variable_text', conky_value='time %H', from={x=10,y=20}, font='Ubuntu', bold=true, font_size=9, color=16777215}"
        );
    }
}
