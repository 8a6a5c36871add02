//! Painting of the editor canvas. Everything here is read-only with respect
//! to the document; positions go through the [`Viewport`] and are offset by
//! the canvas widget's `origin`.

use eframe::egui;

use crate::controller::InteractionController;
use crate::geometry::Bounds;
use crate::region::{Region, ResizeHandle};
use crate::registry::TypeRegistry;
use crate::viewport::Viewport;

const SELECTION_COLOR: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
const HANDLE_FILL: egui::Color32 = egui::Color32::from_rgb(250, 250, 250);
const OVERLAP_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(120, 20, 20, 90);
const FALLBACK_REGION_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    pub show_grid: bool,
    /// Grid spacing in canvas units.
    pub grid_spacing: f32,
    /// Handle side in screen pixels.
    pub handle_size: f32,
    pub show_overlaps: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_grid: true,
            grid_spacing: 50.0,
            handle_size: 10.0,
            show_overlaps: true,
        }
    }
}

/// Screen rectangle of canvas-space `bounds`.
pub fn region_screen_rect(viewport: &Viewport, origin: egui::Pos2, bounds: Bounds) -> egui::Rect {
    let offset = origin.to_vec2();
    let min = viewport.canvas_to_screen(egui::pos2(bounds.left(), bounds.top())) + offset;
    let max = viewport.canvas_to_screen(egui::pos2(bounds.right(), bounds.bottom())) + offset;
    egui::Rect::from_min_max(min, max)
}

/// The eight handle squares of `bounds`, `handle_size` screen pixels wide at
/// any zoom, centered on the corners and edge midpoints.
pub fn handle_screen_rects(
    viewport: &Viewport,
    origin: egui::Pos2,
    bounds: Bounds,
    handle_size: f32,
) -> [(ResizeHandle, egui::Rect); 8] {
    let side = egui::Vec2::splat(handle_size.max(0.0));
    ResizeHandle::ALL.map(|handle| {
        let center = viewport.canvas_to_screen(handle.position(&bounds)) + origin.to_vec2();
        (handle, egui::Rect::from_center_size(center, side))
    })
}

pub fn draw_background(painter: &egui::Painter, rect: egui::Rect) {
    let bg = painter.ctx().style().visuals.extreme_bg_color;
    painter.rect_filled(rect, 0.0, bg);
}

/// Grid lines over the image area. Skipped when lines would be too dense.
pub fn draw_grid(painter: &egui::Painter, rect: egui::Rect, viewport: &Viewport, spacing: f32) {
    let spacing_screen = spacing * viewport.zoom();
    if !(spacing_screen >= 8.0) {
        return;
    }
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_white_alpha(28));
    let start = rect.min + viewport.pan();
    let x0 = ((rect.min.x - start.x) / spacing_screen).floor() * spacing_screen + start.x;
    let y0 = ((rect.min.y - start.y) / spacing_screen).floor() * spacing_screen + start.y;
    let mut x = x0;
    while x < rect.max.x {
        painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
        x += spacing_screen;
    }
    let mut y = y0;
    while y < rect.max.y {
        painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
        y += spacing_screen;
    }
}

/// The template image, or a placeholder frame while it is missing.
pub fn draw_image(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    image_bounds: Bounds,
    texture: Option<&egui::TextureHandle>,
) {
    let rect = region_screen_rect(viewport, origin, image_bounds);
    match texture {
        Some(texture) => {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
        }
        None => {
            painter.rect_filled(rect, 0.0, egui::Color32::from_gray(40));
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No image",
                egui::FontId::proportional(16.0),
                egui::Color32::from_gray(140),
            );
        }
    }
    painter.rect_stroke(
        rect,
        0.0,
        egui::Stroke::new(1.0, egui::Color32::from_gray(90)),
        egui::StrokeKind::Outside,
    );
}

/// Whole canvas for the controller's current state.
pub fn draw_canvas(
    painter: &egui::Painter,
    rect: egui::Rect,
    controller: &InteractionController,
    texture: Option<&egui::TextureHandle>,
    options: &RenderOptions,
) {
    let origin = rect.min;
    let viewport = controller.viewport();
    let template = controller.template();
    draw_background(painter, rect);
    draw_image(painter, origin, viewport, template.image_bounds(), texture);
    if options.show_grid {
        let image_rect = region_screen_rect(viewport, origin, template.image_bounds());
        draw_grid(
            &painter.with_clip_rect(image_rect.intersect(rect)),
            rect,
            viewport,
            options.grid_spacing,
        );
    }

    let hover = controller.hover();
    for region in template.regions() {
        draw_region(
            painter,
            origin,
            viewport,
            region,
            controller.registry(),
            hover.region == Some(region.id()),
        );
    }
    if options.show_overlaps {
        for overlap in template.overlapping_regions() {
            let r = region_screen_rect(viewport, origin, overlap.intersection);
            painter.rect_filled(r, 0.0, OVERLAP_COLOR);
        }
    }
    if let Some(selected) = controller.selected_region().filter(|r| r.is_visible()) {
        draw_handles(painter, origin, viewport, selected.bounds(), options.handle_size);
    }
    if let Some(draw) = controller.draw_rect() {
        draw_in_progress(painter, region_screen_rect(viewport, origin, draw));
    }
}

fn region_color(region: &Region, registry: &dyn TypeRegistry) -> egui::Color32 {
    registry
        .display_info(region.component_type())
        .map(|info| info.color.to_color32())
        .unwrap_or(FALLBACK_REGION_COLOR)
}

fn draw_region(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    region: &Region,
    registry: &dyn TypeRegistry,
    hovered: bool,
) {
    let rect = region_screen_rect(viewport, origin, region.bounds());
    let mut color = region_color(region, registry);
    if !region.is_visible() {
        color = color.gamma_multiply(0.3);
    }
    let fill_alpha = if hovered || region.is_selected() { 0.28 } else { 0.16 };
    painter.rect_filled(rect, 0.0, color.gamma_multiply(fill_alpha));

    let stroke = if region.is_selected() {
        egui::Stroke::new(2.0, SELECTION_COLOR)
    } else if hovered {
        egui::Stroke::new(2.0, color)
    } else {
        egui::Stroke::new(1.0, color)
    };
    if region.is_visible() {
        painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Middle);
    } else {
        draw_dashed_rect(painter, rect, stroke, 6.0, 4.0);
    }

    // Caption only when there is room for it.
    if rect.width() >= 40.0 && rect.height() >= 16.0 {
        let icon = registry
            .display_info(region.component_type())
            .map(|info| info.icon)
            .unwrap_or_default();
        let caption = format!("{icon} {}", region.display_name(registry));
        painter.with_clip_rect(rect).text(
            rect.min + egui::vec2(4.0, 3.0),
            egui::Align2::LEFT_TOP,
            caption.trim_start(),
            egui::FontId::proportional(12.0),
            egui::Color32::WHITE.gamma_multiply(if region.is_visible() { 0.95 } else { 0.5 }),
        );
    }
}

fn draw_handles(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    bounds: Bounds,
    handle_size: f32,
) {
    let stroke = egui::Stroke::new(1.0, SELECTION_COLOR);
    for (_, r) in handle_screen_rects(viewport, origin, bounds, handle_size) {
        painter.rect_filled(r, 0.0, HANDLE_FILL);
        painter.rect_stroke(r, 0.0, stroke, egui::StrokeKind::Middle);
    }
}

fn draw_in_progress(painter: &egui::Painter, rect: egui::Rect) {
    painter.rect_filled(rect, 0.0, SELECTION_COLOR.gamma_multiply(0.15));
    draw_dashed_rect(painter, rect, egui::Stroke::new(1.0, SELECTION_COLOR), 6.0, 4.0);
}

fn draw_dashed_rect(painter: &egui::Painter, rect: egui::Rect, stroke: egui::Stroke, dash: f32, gap: f32) {
    let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
    for i in 0..4 {
        draw_dashed_line(painter, corners[i], corners[(i + 1) % 4], stroke, dash, gap);
    }
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let v = b - a;
    let len = v.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = v / len;
    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let next = (pos + if drawing { dash_len } else { gap_len }).min(len);
        if drawing {
            painter.line_segment([a + dir * pos, a + dir * next], stroke);
        }
        pos = next;
        drawing = !drawing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn approx(a: egui::Pos2, b: egui::Pos2) -> bool {
        (a - b).length() < EPS
    }

    #[test]
    fn region_rect_identity_view() {
        let viewport = Viewport::default();
        let r = region_screen_rect(&viewport, egui::Pos2::ZERO, Bounds::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(r, egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(30.0, 40.0)));
    }

    #[test]
    fn region_rect_applies_zoom_pan_and_origin() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(2.0, egui::Pos2::ZERO);
        viewport.set_pan(egui::vec2(5.0, -5.0));
        let origin = egui::pos2(100.0, 50.0);
        let r = region_screen_rect(&viewport, origin, Bounds::new(10.0, 20.0, 30.0, 40.0));
        assert!(approx(r.min, egui::pos2(125.0, 85.0)));
        assert!(approx(r.max, egui::pos2(185.0, 165.0)));
    }

    #[test]
    fn handles_keep_screen_size_when_zoomed() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(4.0, egui::Pos2::ZERO);
        let bounds = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let rects = handle_screen_rects(&viewport, egui::Pos2::ZERO, bounds, 8.0);
        for (_, r) in rects {
            assert!((r.width() - 8.0).abs() < EPS && (r.height() - 8.0).abs() < EPS);
        }
        let se = rects
            .iter()
            .find(|(h, _)| *h == ResizeHandle::SE)
            .map(|(_, r)| r.center());
        assert!(approx(se.unwrap_or_default(), egui::pos2(400.0, 200.0)));
        let n = rects
            .iter()
            .find(|(h, _)| *h == ResizeHandle::N)
            .map(|(_, r)| r.center());
        assert!(approx(n.unwrap_or_default(), egui::pos2(200.0, 0.0)));
    }

    #[test]
    fn handle_rects_cover_every_handle_once() {
        let rects = handle_screen_rects(
            &Viewport::default(),
            egui::pos2(3.0, 4.0),
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            6.0,
        );
        for handle in ResizeHandle::ALL {
            assert_eq!(rects.iter().filter(|(h, _)| *h == handle).count(), 1);
        }
        let nw = rects[0].1;
        assert!(nw.contains(egui::pos2(3.0, 4.0)));
    }
}
