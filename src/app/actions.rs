use eframe::egui;
use std::path::{Path, PathBuf};

use crate::template::Template;

use super::{RegionEditorApp, settings, untitled_template};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

impl RegionEditorApp {
    pub(super) fn new_template(&mut self) {
        self.controller.replace_template(untitled_template());
        self.texture = None;
        self.template_path = None;
        self.validation = None;
        self.dirty = false;
        self.status = Some("New template".to_string());
    }

    pub(super) fn open_image_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.request_image(path);
        }
    }

    pub(super) fn request_image(&mut self, path: PathBuf) {
        match self.loader.request(path.clone()) {
            Ok(()) => self.status = Some(format!("Loading {}...", path.display())),
            Err(e) => {
                log::error!("{e}");
                self.status = Some(format!("Image load failed: {e}"));
            }
        }
    }

    /// Picks up images decoded in the background.
    pub(super) fn poll_image_loader(&mut self, ctx: &egui::Context) {
        while let Some(response) = self.loader.poll() {
            match response {
                Ok((path, loaded)) => {
                    let url = path.display().to_string();
                    let (width, height) = (loaded.width, loaded.height);
                    let (old_w, old_h) = self.controller.template().image_size();
                    let same_url = self.controller.template().image_url() == url;
                    if same_url && (old_w, old_h) != (width, height) {
                        log::warn!(
                            "{url} is {width}x{height} but the template recorded {old_w}x{old_h}"
                        );
                    }
                    let max_side = ctx.input(|i| i.max_texture_side);
                    self.texture = Some(ctx.load_texture(
                        "template-image",
                        loaded.into_color_image(max_side),
                        egui::TextureOptions::LINEAR,
                    ));
                    if !same_url || (old_w, old_h) != (width, height) {
                        self.controller.set_image(url.clone(), width, height);
                        self.mark_dirty();
                    }
                    log::info!("loaded image {url} ({width}x{height})");
                    self.status = Some(format!("Loaded {url}"));
                    self.settings.last_image_path = Some(url);
                }
                Err(e) => {
                    log::error!("image load failed: {e}");
                    self.status = Some(format!("Image load failed: {e}"));
                }
            }
            ctx.request_repaint();
        }
        if self.loader.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }

    pub(super) fn open_template_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Template", &["json"])
            .pick_file()
        {
            self.load_template(path);
        }
    }

    pub(super) fn load_template(&mut self, path: PathBuf) {
        match Template::load_from_path(&path) {
            Ok(template) => {
                log::info!(
                    "loaded template '{}' with {} regions from {}",
                    template.name(),
                    template.len(),
                    path.display()
                );
                let image = template.image_url().to_string();
                self.controller.replace_template(template);
                self.texture = None;
                self.validation = None;
                self.dirty = false;
                self.status = Some(format!("Loaded {}", path.display()));
                self.settings.last_template_path = Some(path.display().to_string());
                self.template_path = Some(path);
                self.persist_settings();
                if !image.is_empty() {
                    self.request_image(PathBuf::from(image));
                }
            }
            Err(e) => {
                log::warn!("rejected template {}: {e}", path.display());
                self.status = Some(format!("Open failed: {e}"));
            }
        }
    }

    pub(super) fn save_template(&mut self) {
        match self.template_path.clone() {
            Some(path) => self.save_template_to(&path),
            None => self.save_template_dialog(),
        }
    }

    pub(super) fn save_template_dialog(&mut self) {
        let default_name = format!("{}.json", self.controller.template().name());
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("Template", &["json"])
            .save_file()
        {
            self.save_template_to(&path);
        }
    }

    fn save_template_to(&mut self, path: &Path) {
        let report = self.controller.template().validate_all(self.registry.as_ref());
        match self.controller.template().save_to_path(path) {
            Ok(()) => {
                log::info!("saved template to {}", path.display());
                self.dirty = false;
                self.template_path = Some(path.to_path_buf());
                self.settings.last_template_path = Some(path.display().to_string());
                self.persist_settings();
                self.status = Some(if report.is_valid {
                    format!("Saved {}", path.display())
                } else {
                    format!(
                        "Saved {} with {} validation problem(s)",
                        path.display(),
                        report.errors.len()
                    )
                });
            }
            Err(e) => {
                log::error!("{e}");
                self.status = Some(format!("Save failed: {e}"));
            }
        }
        self.validation = Some(report);
    }

    pub(super) fn validate_template(&mut self) {
        let report = self.controller.template().validate_all(self.registry.as_ref());
        self.status = Some(if report.is_valid {
            "Template is valid".to_string()
        } else {
            format!("{} validation problem(s)", report.errors.len())
        });
        self.validation = Some(report);
    }

    pub(super) fn persist_settings(&mut self) {
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            log::error!("could not save settings to {}: {e}", self.settings_path);
        }
    }

    /// Applies settings edited in the UI to the live session.
    pub(super) fn apply_settings(&mut self) {
        self.controller.set_config(self.settings.controller_config());
        self.render_options = self.settings.render_options();
        self.persist_settings();
    }
}
