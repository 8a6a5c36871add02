use serde::{Deserialize, Serialize};

use crate::controller::ControllerConfig;
use crate::registry::{ComponentType, ComponentTypeRegistry};
use crate::render::RenderOptions;

/// Editor preferences, read from TOML (or JSON) at startup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    pub handle_size: f32,
    pub min_region_size: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub fit_margin: f32,
    pub show_grid: bool,
    pub grid_spacing: f32,
    pub show_overlaps: bool,
    pub nudge_step: f32,
    pub nudge_step_fast: f32,
    pub duplicate_offset: f32,
    pub default_component_type: String,
    pub constrain_to_image: bool,
    pub last_template_path: Option<String>,
    pub last_image_path: Option<String>,
    /// Types added to (or replacing) the built-in catalogue.
    pub component_types: Vec<ComponentType>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        let render = RenderOptions::default();
        Self {
            handle_size: controller.handle_size,
            min_region_size: controller.min_region_size,
            min_zoom: controller.min_zoom,
            max_zoom: controller.max_zoom,
            zoom_step: controller.zoom_step,
            fit_margin: controller.fit_margin,
            show_grid: render.show_grid,
            grid_spacing: render.grid_spacing,
            show_overlaps: render.show_overlaps,
            nudge_step: 1.0,
            nudge_step_fast: 10.0,
            duplicate_offset: controller.duplicate_offset,
            default_component_type: controller.default_component_type,
            constrain_to_image: controller.constrain_to_image,
            last_template_path: None,
            last_image_path: None,
            component_types: Vec::new(),
        }
    }
}

impl EditorSettings {
    pub fn controller_config(&self) -> ControllerConfig {
        let (min_zoom, max_zoom) = if self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            log::warn!(
                "ignoring invalid zoom range {}..{}",
                self.min_zoom,
                self.max_zoom
            );
            let d = ControllerConfig::default();
            (d.min_zoom, d.max_zoom)
        };
        ControllerConfig {
            handle_size: self.handle_size.max(1.0),
            min_region_size: self.min_region_size.max(0.0),
            min_zoom,
            max_zoom,
            zoom_step: if self.zoom_step > 1.0 { self.zoom_step } else { 1.1 },
            fit_margin: self.fit_margin.max(0.0),
            duplicate_offset: self.duplicate_offset,
            default_component_type: self.default_component_type.clone(),
            constrain_to_image: self.constrain_to_image,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_grid: self.show_grid,
            grid_spacing: self.grid_spacing.max(1.0),
            handle_size: self.handle_size.max(1.0),
            show_overlaps: self.show_overlaps,
        }
    }

    /// Built-in catalogue plus the types declared here.
    pub fn build_registry(&self) -> ComponentTypeRegistry {
        let mut registry = ComponentTypeRegistry::builtin();
        for t in &self.component_types {
            log::info!("registering component type '{}' from settings", t.key);
            registry.register(t.clone());
        }
        registry
    }
}

pub fn load_settings(path: &str) -> Option<EditorSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    let parsed = if path.ends_with(".toml") {
        toml::from_str::<EditorSettings>(&s)
            .map_err(|e| e.to_string())
            .or_else(|e| serde_json::from_str::<EditorSettings>(&s).map_err(|_| e))
    } else {
        serde_json::from_str::<EditorSettings>(&s)
            .map_err(|e| e.to_string())
            .or_else(|e| toml::from_str::<EditorSettings>(&s).map_err(|_| e))
    };
    match parsed {
        Ok(settings) => {
            log::info!("loaded settings from {path}");
            Some(settings)
        }
        Err(e) => {
            log::warn!("could not parse settings {path}: {e}");
            None
        }
    }
}

pub fn save_settings(path: &str, settings: &EditorSettings) -> Result<(), String> {
    if path.ends_with(".toml") {
        let toml = toml::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, toml).map_err(|e| e.to_string())
    } else {
        let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("regionsmith-{}-{name}", std::process::id()))
            .display()
            .to_string()
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s: EditorSettings = toml::from_str("handle_size = 14.0\nshow_grid = false\n").unwrap();
        assert_eq!(s.handle_size, 14.0);
        assert!(!s.show_grid);
        assert_eq!(s.min_region_size, EditorSettings::default().min_region_size);
        assert_eq!(s.controller_config().handle_size, 14.0);
        assert!(!s.render_options().show_grid);
    }

    #[test]
    fn bad_zoom_range_falls_back() {
        let s = EditorSettings {
            min_zoom: 3.0,
            max_zoom: 1.0,
            ..EditorSettings::default()
        };
        let c = s.controller_config();
        assert!(c.min_zoom < c.max_zoom);
    }

    #[test]
    fn extra_types_are_registered() {
        let src = r##"
default_component_type = "badge"

[[component_types]]
key = "badge"
name = "Badge"

[[component_types.fields]]
name = "label"
kind = "text"
default = "New"
"##;
        let s: EditorSettings = toml::from_str(src).unwrap();
        let registry = s.build_registry();
        assert!(registry.is_known("badge"));
        assert!(registry.is_known("text"));
        assert_eq!(s.controller_config().default_component_type, "badge");
    }

    #[test]
    fn save_and_load_toml_and_json() {
        for ext in ["toml", "json"] {
            let path = temp_path(&format!("settings.{ext}"));
            let settings = EditorSettings {
                grid_spacing: 25.0,
                last_template_path: Some("home.json".into()),
                ..EditorSettings::default()
            };
            save_settings(&path, &settings).unwrap();
            assert_eq!(load_settings(&path), Some(settings));
            let _ = std::fs::remove_file(&path);
        }
    }

    #[test]
    fn field_without_default_survives_toml_save() {
        let src = r##"
[[component_types]]
key = "badge"
name = "Badge"

[[component_types.fields]]
name = "label"
kind = "text"
required = true
"##;
        let settings: EditorSettings = toml::from_str(src).unwrap();
        assert!(settings.component_types[0].fields[0].default.is_null());

        let path = temp_path("no-default.toml");
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), Some(settings));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_or_broken_file_yields_none() {
        assert!(load_settings(&temp_path("absent.toml")).is_none());
        let path = temp_path("broken.toml");
        std::fs::write(&path, "handle_size = [").unwrap();
        assert!(load_settings(&path).is_none());
        let _ = std::fs::remove_file(&path);
    }
}
