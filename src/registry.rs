//! Component type registry.
//!
//! Every region carries a component type key. The registry knows, per type,
//! which fields the region's default values hold, how to seed them and how to
//! check them. The editing core only talks to the [`TypeRegistry`] trait so a
//! host can plug in its own catalogue; [`ComponentTypeRegistry`] is the
//! catalogue the desktop editor ships with.

use eframe::egui;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name -> value, shaped by a component type.
pub type ValueMap = serde_json::Map<String, Value>;

/// Outcome of a validation pass. Errors are human readable.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayInfo {
    pub name: String,
    pub icon: String,
    pub color: Rgba,
}

pub trait TypeRegistry {
    fn generate_default_values(&self, component_type: &str) -> ValueMap;
    fn validate_default_values(&self, component_type: &str, values: &ValueMap) -> Validation;
    fn display_info(&self, component_type: &str) -> Option<DisplayInfo>;
    fn type_keys(&self) -> Vec<String>;

    fn is_known(&self, component_type: &str) -> bool {
        self.display_info(component_type).is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        max_length: Option<usize>,
    },
    Multiline,
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Bool,
    Url,
    Color,
    Choice {
        options: Vec<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub default: Value,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind, required: bool, default: Value) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required,
            default,
        }
    }

    fn check(&self, value: Option<&Value>, errors: &mut Vec<String>) {
        let name = &self.name;
        let value = match value {
            None | Some(Value::Null) => {
                if self.required {
                    errors.push(format!("'{name}' is required"));
                }
                return;
            }
            Some(v) => v,
        };
        if self.required && value.as_str().is_some_and(|s| s.trim().is_empty()) {
            errors.push(format!("'{name}' is required"));
            return;
        }
        match &self.kind {
            FieldKind::Text { max_length } => match value.as_str() {
                Some(s) => {
                    if let Some(max) = max_length {
                        if s.chars().count() > *max {
                            errors.push(format!("'{name}' must be at most {max} characters"));
                        }
                    }
                }
                None => errors.push(format!("'{name}' must be text")),
            },
            FieldKind::Multiline => {
                if !value.is_string() {
                    errors.push(format!("'{name}' must be text"));
                }
            }
            FieldKind::Number { min, max } => match value.as_f64() {
                Some(n) => {
                    if let Some(min) = min {
                        if n < *min {
                            errors.push(format!("'{name}' must be at least {min}"));
                        }
                    }
                    if let Some(max) = max {
                        if n > *max {
                            errors.push(format!("'{name}' must be at most {max}"));
                        }
                    }
                }
                None => errors.push(format!("'{name}' must be a number")),
            },
            FieldKind::Bool => {
                if !value.is_boolean() {
                    errors.push(format!("'{name}' must be true or false"));
                }
            }
            FieldKind::Url => match value.as_str() {
                Some(s) if s.is_empty() || is_url_like(s) => {}
                Some(s) => errors.push(format!("'{name}' is not a valid URL: {s}")),
                None => errors.push(format!("'{name}' must be a URL")),
            },
            FieldKind::Color => match value.as_str() {
                Some(s) if parse_hex_color(s).is_some() => {}
                _ => errors.push(format!("'{name}' must be a hex color like #336699")),
            },
            FieldKind::Choice { options } => match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => {}
                _ => errors.push(format!(
                    "'{name}' must be one of: {}",
                    options.join(", ")
                )),
            },
        }
    }
}

fn is_url_like(s: &str) -> bool {
    ["http://", "https://", "mailto:", "/", "#"]
        .iter()
        .any(|prefix| s.starts_with(prefix))
}

pub fn parse_hex_color(s: &str) -> Option<Rgba> {
    let hex = s.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Rgba::rgb(digit(0)?, digit(1)?, digit(2)?))
        }
        6 | 8 => {
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            let a = if hex.len() == 8 { pair(6)? } else { 255 };
            Some(Rgba {
                a,
                ..Rgba::rgb(pair(0)?, pair(2)?, pair(4)?)
            })
        }
        _ => None,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ComponentType {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_type_color")]
    pub color: Rgba,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

fn default_type_color() -> Rgba {
    Rgba::rgb(120, 120, 120)
}

#[derive(Clone, Debug)]
pub struct ComponentTypeRegistry {
    types: Vec<ComponentType>,
}

impl Default for ComponentTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ComponentTypeRegistry {
    pub fn empty() -> Self {
        Self { types: Vec::new() }
    }

    pub fn builtin() -> Self {
        use serde_json::json;
        let align = || FieldKind::Choice {
            options: vec!["left".into(), "center".into(), "right".into()],
        };
        let types = vec![
            ComponentType {
                key: "text".into(),
                name: "Text".into(),
                icon: "T".into(),
                color: Rgba::rgb(66, 133, 244),
                fields: vec![
                    FieldSpec::new("content", FieldKind::Multiline, true, json!("Lorem ipsum")),
                    FieldSpec::new(
                        "font_size",
                        FieldKind::Number {
                            min: Some(6.0),
                            max: Some(144.0),
                        },
                        false,
                        json!(16),
                    ),
                    FieldSpec::new("align", align(), false, json!("left")),
                    FieldSpec::new("color", FieldKind::Color, false, json!("#222222")),
                ],
            },
            ComponentType {
                key: "heading".into(),
                name: "Heading".into(),
                icon: "H".into(),
                color: Rgba::rgb(103, 58, 183),
                fields: vec![
                    FieldSpec::new(
                        "text",
                        FieldKind::Text {
                            max_length: Some(200),
                        },
                        true,
                        json!("Heading"),
                    ),
                    FieldSpec::new(
                        "level",
                        FieldKind::Choice {
                            options: (1..=6).map(|i| format!("h{i}")).collect(),
                        },
                        false,
                        json!("h2"),
                    ),
                    FieldSpec::new("align", align(), false, json!("left")),
                ],
            },
            ComponentType {
                key: "image".into(),
                name: "Image".into(),
                icon: "🖼".into(),
                color: Rgba::rgb(15, 157, 88),
                fields: vec![
                    FieldSpec::new("src", FieldKind::Url, false, json!("")),
                    FieldSpec::new("alt", FieldKind::Text { max_length: None }, false, json!("")),
                    FieldSpec::new(
                        "fit",
                        FieldKind::Choice {
                            options: vec!["cover".into(), "contain".into(), "fill".into()],
                        },
                        false,
                        json!("cover"),
                    ),
                ],
            },
            ComponentType {
                key: "button".into(),
                name: "Button".into(),
                icon: "▭".into(),
                color: Rgba::rgb(244, 160, 0),
                fields: vec![
                    FieldSpec::new(
                        "text",
                        FieldKind::Text {
                            max_length: Some(60),
                        },
                        true,
                        json!("Click me"),
                    ),
                    FieldSpec::new("href", FieldKind::Url, true, json!("#")),
                    FieldSpec::new("background", FieldKind::Color, false, json!("#3366ff")),
                    FieldSpec::new("color", FieldKind::Color, false, json!("#ffffff")),
                ],
            },
            ComponentType {
                key: "link".into(),
                name: "Link".into(),
                icon: "🔗".into(),
                color: Rgba::rgb(0, 172, 193),
                fields: vec![
                    FieldSpec::new("text", FieldKind::Text { max_length: None }, true, json!("Link")),
                    FieldSpec::new("href", FieldKind::Url, true, json!("https://example.com")),
                    FieldSpec::new("new_tab", FieldKind::Bool, false, json!(false)),
                ],
            },
            ComponentType {
                key: "video".into(),
                name: "Video".into(),
                icon: "▶".into(),
                color: Rgba::rgb(219, 68, 55),
                fields: vec![
                    FieldSpec::new("src", FieldKind::Url, false, json!("")),
                    FieldSpec::new("autoplay", FieldKind::Bool, false, json!(false)),
                    FieldSpec::new("loop", FieldKind::Bool, false, json!(false)),
                    FieldSpec::new("controls", FieldKind::Bool, false, json!(true)),
                ],
            },
            ComponentType {
                key: "html".into(),
                name: "Custom HTML".into(),
                icon: "<>".into(),
                color: Rgba::rgb(96, 125, 139),
                fields: vec![FieldSpec::new("markup", FieldKind::Multiline, false, json!(""))],
            },
        ];
        Self { types }
    }

    /// Adds a type, replacing any existing type with the same key.
    pub fn register(&mut self, component_type: ComponentType) {
        match self.types.iter_mut().find(|t| t.key == component_type.key) {
            Some(existing) => *existing = component_type,
            None => self.types.push(component_type),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ComponentType> {
        self.types.iter().find(|t| t.key == key)
    }

    pub fn types(&self) -> &[ComponentType] {
        &self.types
    }

    /// Types ranked by fuzzy match against key and display name. An empty
    /// query returns every type in registration order.
    pub fn search(&self, query: &str) -> Vec<&ComponentType> {
        let q = query.trim();
        if q.is_empty() {
            return self.types.iter().collect();
        }
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(&ComponentType, i64)> = self
            .types
            .iter()
            .filter_map(|t| {
                let haystack = format!("{} {}", t.key, t.name);
                matcher.fuzzy_match(&haystack, q).map(|score| (t, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));
        scored.into_iter().map(|(t, _)| t).collect()
    }
}

impl TypeRegistry for ComponentTypeRegistry {
    fn generate_default_values(&self, component_type: &str) -> ValueMap {
        let Some(t) = self.get(component_type) else {
            return ValueMap::new();
        };
        t.fields
            .iter()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect()
    }

    fn validate_default_values(&self, component_type: &str, values: &ValueMap) -> Validation {
        let Some(t) = self.get(component_type) else {
            return Validation::from_errors(vec![format!(
                "unknown component type '{component_type}'"
            )]);
        };
        let mut errors = Vec::new();
        for field in &t.fields {
            field.check(values.get(&field.name), &mut errors);
        }
        for key in values.keys() {
            if !t.fields.iter().any(|f| &f.name == key) {
                errors.push(format!("unknown field '{key}' for type '{component_type}'"));
            }
        }
        Validation::from_errors(errors)
    }

    fn display_info(&self, component_type: &str) -> Option<DisplayInfo> {
        self.get(component_type).map(|t| DisplayInfo {
            name: t.name.clone(),
            icon: t.icon.clone(),
            color: t.color,
        })
    }

    fn type_keys(&self) -> Vec<String> {
        self.types.iter().map(|t| t.key.clone()).collect()
    }
}
