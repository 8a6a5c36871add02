use eframe::egui;
use std::path::PathBuf;
use std::rc::Rc;

use crate::controller::{EditorEvent, InteractionController};
use crate::image_loader::ImageLoader;
use crate::registry::{ComponentTypeRegistry, TypeRegistry};
use crate::render::RenderOptions;
use crate::template::{Template, TemplateValidation};

mod actions;
mod panel;
pub mod settings;
mod update;

pub use settings::EditorSettings;

pub struct RegionEditorApp {
    controller: InteractionController,
    registry: Rc<ComponentTypeRegistry>,
    settings: EditorSettings,
    settings_path: String,
    render_options: RenderOptions,
    texture: Option<egui::TextureHandle>,
    loader: ImageLoader,
    template_path: Option<PathBuf>,
    status: Option<String>,
    /// Filter text of the component type picker.
    type_query: String,
    validation: Option<TemplateValidation>,
    dirty: bool,
}

impl RegionEditorApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = PathBuf::from(home).join(".config").join("regionsmith.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("settings.toml").exists() {
            return Some("settings.toml".to_string());
        }
        None
    }

    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let settings_path = Self::config_path().unwrap_or_else(|| "settings.toml".to_string());
        let settings = settings::load_settings(&settings_path)
            .or_else(|| settings::load_settings("settings.json"))
            .unwrap_or_default();
        let mut app = Self::with_settings(settings, settings_path);

        if let Some(path) = app.settings.last_template_path.clone() {
            let path = PathBuf::from(path);
            if path.exists() {
                app.load_template(path);
            }
        }
        app
    }

    fn with_settings(settings: EditorSettings, settings_path: String) -> Self {
        let registry = Rc::new(settings.build_registry());
        let shared: Rc<dyn TypeRegistry> = registry.clone();
        let controller =
            InteractionController::new(untitled_template(), shared, settings.controller_config());
        Self {
            controller,
            registry,
            render_options: settings.render_options(),
            settings,
            settings_path,
            texture: None,
            loader: ImageLoader::new(),
            template_path: None,
            status: None,
            type_query: String::new(),
            validation: None,
            dirty: false,
        }
    }

    /// Reacts to controller notifications.
    fn apply_events(&mut self, ctx: &egui::Context, events: Vec<EditorEvent>) {
        let mut changed = false;
        for event in events {
            match event {
                EditorEvent::RegionAdded(id) => {
                    log::debug!("region {id} added");
                    changed = true;
                }
                EditorEvent::RegionUpdated(_) => changed = true,
                EditorEvent::RegionRemoved(id) => {
                    log::debug!("region {id} removed");
                    changed = true;
                }
                EditorEvent::SelectionChanged(_) => self.type_query.clear(),
                EditorEvent::Redraw => ctx.request_repaint(),
            }
        }
        if changed {
            self.mark_dirty();
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        // Stale once the document changes.
        self.validation = None;
    }

    fn title(&self) -> String {
        let marker = if self.dirty { "*" } else { "" };
        format!("{}{marker}", self.controller.template().name())
    }
}

fn untitled_template() -> Template {
    Template::new(uuid::Uuid::new_v4().to_string(), "Untitled", "", 0, 0)
}
