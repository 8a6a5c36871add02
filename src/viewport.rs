use eframe::egui;

pub const DEFAULT_MIN_ZOOM: f32 = 0.1;
pub const DEFAULT_MAX_ZOOM: f32 = 5.0;

/// Zoom and pan of the editing surface.
///
/// The render transform scales canvas coordinates by `zoom` and then offsets
/// them by `pan` in screen pixels: `screen = canvas * zoom + pan`. Screen
/// coordinates are relative to the top-left of the viewport widget.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    zoom: f32,
    pan: egui::Vec2,
    min_zoom: f32,
    max_zoom: f32,
    needs_fit: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::with_zoom_range(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

impl Viewport {
    pub fn with_zoom_range(min_zoom: f32, max_zoom: f32) -> Self {
        let min_zoom = if min_zoom.is_finite() && min_zoom > 0.0 {
            min_zoom
        } else {
            DEFAULT_MIN_ZOOM
        };
        let max_zoom = if max_zoom.is_finite() && max_zoom >= min_zoom {
            max_zoom
        } else {
            min_zoom.max(DEFAULT_MAX_ZOOM)
        };
        Self {
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            pan: egui::Vec2::ZERO,
            min_zoom,
            max_zoom,
            needs_fit: true,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> egui::Vec2 {
        self.pan
    }

    pub fn zoom_range(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn screen_to_canvas(&self, screen: egui::Pos2) -> egui::Pos2 {
        ((screen.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    pub fn canvas_to_screen(&self, canvas: egui::Pos2) -> egui::Pos2 {
        (canvas.to_vec2() * self.zoom + self.pan).to_pos2()
    }

    /// Multiplies the zoom by `factor` while keeping the canvas point under
    /// `screen_point` fixed on screen.
    pub fn zoom_by(&mut self, factor: f32, screen_point: egui::Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let before = self.screen_to_canvas(screen_point);
        self.zoom = self.clamp_zoom(self.zoom * factor);
        self.pan = screen_point.to_vec2() - before.to_vec2() * self.zoom;
    }

    /// Sets an absolute zoom around a screen point.
    pub fn set_zoom(&mut self, zoom: f32, screen_point: egui::Pos2) {
        if !zoom.is_finite() || zoom <= 0.0 {
            return;
        }
        self.zoom_by(zoom / self.zoom, screen_point);
    }

    pub fn pan_by(&mut self, delta_screen: egui::Vec2) {
        if delta_screen.x.is_finite() && delta_screen.y.is_finite() {
            self.pan += delta_screen;
        }
    }

    pub fn set_pan(&mut self, pan: egui::Vec2) {
        if pan.x.is_finite() && pan.y.is_finite() {
            self.pan = pan;
        }
    }

    /// Shows the whole content centered, never magnifying past 100%.
    pub fn fit_to_size(
        &mut self,
        content_width: f32,
        content_height: f32,
        viewport_width: f32,
        viewport_height: f32,
        margin: f32,
    ) {
        let margin = if margin.is_finite() { margin.max(0.0) } else { 0.0 };
        let zoom = if content_width > 0.0 && content_height > 0.0 {
            let scale_x = (viewport_width - margin) / content_width;
            let scale_y = (viewport_height - margin) / content_height;
            let fit = scale_x.min(scale_y).min(1.0);
            if fit.is_finite() && fit > 0.0 { fit } else { self.min_zoom }
        } else {
            1.0
        };
        self.zoom = self.clamp_zoom(zoom);
        self.pan = egui::vec2(
            (viewport_width - content_width.max(0.0) * self.zoom) * 0.5,
            (viewport_height - content_height.max(0.0) * self.zoom) * 0.5,
        );
        self.needs_fit = false;
    }

    pub fn reset(&mut self) {
        self.zoom = self.clamp_zoom(1.0);
        self.pan = egui::Vec2::ZERO;
    }

    /// Marks the current fit as stale, e.g. after the backing image changed.
    pub fn invalidate_fit(&mut self) {
        self.needs_fit = true;
    }

    pub fn needs_fit(&self) -> bool {
        self.needs_fit
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
