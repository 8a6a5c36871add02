//! Pointer-driven editing of a [`Template`].
//!
//! The controller owns the template and the viewport for the duration of an
//! editing session. Hosts feed it [`PointerEvent`]s (in screen coordinates,
//! relative to the canvas widget) and [`KeyCommand`]s, and react to the
//! [`EditorEvent`]s it returns. Exactly one gesture can be in flight at a
//! time; it is tracked by the [`Gesture`] enum rather than by independent
//! flags.

use std::rc::Rc;

use eframe::egui;

use crate::geometry::Bounds;
use crate::region::{Region, RegionId, ResizeHandle, handle_at, resized_bounds};
use crate::registry::{TypeRegistry, ValueMap};
use crate::template::Template;
use crate::viewport::Viewport;

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Draw,
    Pan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Raw pointer input. Positions are screen pixels relative to the canvas
/// widget's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down {
        pos: egui::Pos2,
        button: PointerButton,
    },
    Move {
        pos: egui::Pos2,
    },
    Up {
        pos: egui::Pos2,
    },
    /// Positive `notches` zoom in.
    Wheel {
        pos: egui::Pos2,
        notches: f32,
    },
    Leave,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyCommand {
    Escape,
    DeleteSelected,
    Nudge { dx: f32, dy: f32 },
    DuplicateSelected,
    BringToFront,
    SendToBack,
    SetTool(ToolMode),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    FitToView,
}

/// Notifications for the host (property panel, persistence, repaint).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditorEvent {
    RegionAdded(RegionId),
    RegionUpdated(RegionId),
    RegionRemoved(RegionId),
    SelectionChanged(Option<RegionId>),
    Redraw,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        anchor: egui::Pos2,
        current: egui::Pos2,
    },
    Dragging {
        region: RegionId,
        last: egui::Pos2,
        origin: Bounds,
    },
    Resizing {
        region: RegionId,
        handle: ResizeHandle,
        start_pointer: egui::Pos2,
        origin: Bounds,
    },
    Panning {
        last: egui::Pos2,
        origin_pan: egui::Vec2,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    fn region(&self) -> Option<RegionId> {
        match self {
            Gesture::Dragging { region, .. } | Gesture::Resizing { region, .. } => Some(*region),
            _ => None,
        }
    }
}

/// What the pointer rests on while no button is held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hover {
    pub region: Option<RegionId>,
    pub handle: Option<ResizeHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Side of a resize handle's hit zone, in screen pixels.
    pub handle_size: f32,
    /// Draws at or below this size (canvas px) in either dimension are
    /// discarded; resizes never go below it.
    pub min_region_size: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom multiplier per wheel notch and per zoom command.
    pub zoom_step: f32,
    pub fit_margin: f32,
    pub duplicate_offset: f32,
    pub default_component_type: String,
    /// Keep dragged regions inside the image.
    pub constrain_to_image: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            handle_size: 10.0,
            min_region_size: 10.0,
            min_zoom: crate::viewport::DEFAULT_MIN_ZOOM,
            max_zoom: crate::viewport::DEFAULT_MAX_ZOOM,
            zoom_step: 1.1,
            fit_margin: 40.0,
            duplicate_offset: 10.0,
            default_component_type: "text".to_string(),
            constrain_to_image: false,
        }
    }
}

pub struct InteractionController {
    template: Template,
    viewport: Viewport,
    registry: Rc<dyn TypeRegistry>,
    config: ControllerConfig,
    tool: ToolMode,
    gesture: Gesture,
    selected: Option<RegionId>,
    hover: Hover,
    viewport_size: egui::Vec2,
    draw_type: String,
}

impl InteractionController {
    pub fn new(template: Template, registry: Rc<dyn TypeRegistry>, config: ControllerConfig) -> Self {
        let viewport = Viewport::with_zoom_range(config.min_zoom, config.max_zoom);
        let selected = template.selected_id();
        let draw_type = config.default_component_type.clone();
        Self {
            template,
            viewport,
            registry,
            config,
            tool: ToolMode::Select,
            gesture: Gesture::Idle,
            selected,
            hover: Hover::default(),
            viewport_size: egui::Vec2::ZERO,
            draw_type,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn registry(&self) -> &dyn TypeRegistry {
        self.registry.as_ref()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Swaps the tuning. A new zoom range rebuilds the viewport and keeps
    /// the canvas origin where it was on screen.
    pub fn set_config(&mut self, config: ControllerConfig) {
        if self.viewport.zoom_range() != (config.min_zoom, config.max_zoom) {
            let (zoom, pan) = (self.viewport.zoom(), self.viewport.pan());
            self.viewport = Viewport::with_zoom_range(config.min_zoom, config.max_zoom);
            self.viewport.set_pan(pan);
            self.viewport.set_zoom(zoom, pan.to_pos2());
        }
        self.config = config;
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolMode) {
        self.tool = tool;
        self.hover = Hover::default();
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn hover(&self) -> Hover {
        self.hover
    }

    pub fn selected_id(&self) -> Option<RegionId> {
        self.selected
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.selected.and_then(|id| self.template.region(id))
    }

    /// Component type given to newly drawn regions.
    pub fn draw_type(&self) -> &str {
        &self.draw_type
    }

    pub fn set_draw_type(&mut self, component_type: impl Into<String>) {
        self.draw_type = component_type.into();
    }

    /// Normalized rectangle of an in-progress draw, in canvas space.
    pub fn draw_rect(&self) -> Option<Bounds> {
        match &self.gesture {
            Gesture::Drawing { anchor, current } => Some(Bounds::from_corners(*anchor, *current)),
            _ => None,
        }
    }

    /// Size of the canvas widget in screen pixels; used to center zoom
    /// commands and to fit the image.
    pub fn set_viewport_size(&mut self, size: egui::Vec2) {
        self.viewport_size = size;
    }

    pub fn needs_fit(&self) -> bool {
        self.viewport.needs_fit()
    }

    pub fn fit_to_view(&mut self) {
        let (w, h) = self.template.image_size();
        self.viewport.fit_to_size(
            w as f32,
            h as f32,
            self.viewport_size.x,
            self.viewport_size.y,
            self.config.fit_margin,
        );
    }

    /// Replaces the whole document, dropping any gesture and selection.
    pub fn replace_template(&mut self, template: Template) {
        self.template = template;
        self.template.clear_selection();
        self.gesture = Gesture::Idle;
        self.selected = None;
        self.hover = Hover::default();
        self.viewport.invalidate_fit();
    }

    /// Changes the backing image; the viewport must be fitted again.
    pub fn set_image(&mut self, image_url: impl Into<String>, width: u32, height: u32) {
        self.template.set_image(image_url, width, height);
        self.viewport.invalidate_fit();
    }

    pub fn set_template_name(&mut self, name: impl Into<String>) -> String {
        self.template.set_name(name)
    }

    /// Current cursor affordance, derived from scratch on every call.
    pub fn cursor(&self) -> egui::CursorIcon {
        cursor_for(&self.gesture, self.tool, self.hover)
    }

    // ---------------------------------------------------------------------
    // Pointer input
    // ---------------------------------------------------------------------

    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        match event {
            PointerEvent::Down { pos, button } => self.pointer_down(pos, button, &mut events),
            PointerEvent::Move { pos } => self.pointer_move(pos, &mut events),
            PointerEvent::Up { pos } => self.pointer_up(pos, &mut events),
            PointerEvent::Wheel { pos, notches } => {
                if self.gesture.is_idle() && notches.is_finite() && notches != 0.0 {
                    self.viewport.zoom_by(self.config.zoom_step.powf(notches), pos);
                    emit(&mut events, EditorEvent::Redraw);
                }
            }
            PointerEvent::Leave => {
                if self.gesture.is_idle() && self.hover != Hover::default() {
                    self.hover = Hover::default();
                    emit(&mut events, EditorEvent::Redraw);
                }
            }
        }
        events
    }

    fn pointer_down(
        &mut self,
        pos: egui::Pos2,
        button: PointerButton,
        events: &mut Vec<EditorEvent>,
    ) {
        if !self.gesture.is_idle() {
            return;
        }
        if button == PointerButton::Middle || (button == PointerButton::Primary && self.tool == ToolMode::Pan) {
            self.gesture = Gesture::Panning {
                last: pos,
                origin_pan: self.viewport.pan(),
            };
            return;
        }
        if button != PointerButton::Primary {
            return;
        }
        let canvas = self.viewport.screen_to_canvas(pos);
        match self.tool {
            ToolMode::Draw => {
                self.gesture = Gesture::Drawing {
                    anchor: canvas,
                    current: canvas,
                };
                emit(events, EditorEvent::Redraw);
            }
            ToolMode::Select => {
                let zone = self.handle_zone();
                if let Some((id, bounds, handle)) = self.selected_handle_at(canvas, zone) {
                    self.begin_resize(id, bounds, handle, canvas);
                    return;
                }
                let Some((id, bounds)) = self.hit_test(canvas).map(|r| (r.id(), r.bounds())) else {
                    self.clear_selection(events);
                    return;
                };
                self.select(id, events);
                match handle_at(&bounds, canvas, zone) {
                    Some(handle) => self.begin_resize(id, bounds, handle, canvas),
                    None => {
                        self.gesture = Gesture::Dragging {
                            region: id,
                            last: canvas,
                            origin: bounds,
                        };
                    }
                }
            }
            ToolMode::Pan => {}
        }
    }

    fn pointer_move(&mut self, pos: egui::Pos2, events: &mut Vec<EditorEvent>) {
        let canvas = self.viewport.screen_to_canvas(pos);
        if self.gesture.is_idle() {
            self.update_hover(canvas, events);
            return;
        }
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Drawing { current, .. } => {
                *current = canvas;
                emit(events, EditorEvent::Redraw);
            }
            Gesture::Dragging { region, last, .. } => {
                let id = *region;
                let delta = canvas - *last;
                *last = canvas;
                let image = self.template.image_bounds();
                let constrain = self.config.constrain_to_image;
                if let Some(r) = self.template.region_mut(id) {
                    let delta = if constrain {
                        constrained_delta(r.bounds(), delta, image)
                    } else {
                        delta
                    };
                    r.move_by(delta.x, delta.y);
                }
                emit(events, EditorEvent::Redraw);
            }
            Gesture::Resizing {
                region,
                handle,
                start_pointer,
                origin,
            } => {
                let delta = canvas - *start_pointer;
                let next = resized_bounds(*origin, *handle, delta.x, delta.y, self.config.min_region_size);
                if let Some(r) = self.template.region_mut(*region) {
                    r.update_bounds(next);
                }
                emit(events, EditorEvent::Redraw);
            }
            Gesture::Panning { last, .. } => {
                let delta = pos - *last;
                *last = pos;
                self.viewport.pan_by(delta);
                emit(events, EditorEvent::Redraw);
            }
        }
    }

    fn pointer_up(&mut self, pos: egui::Pos2, events: &mut Vec<EditorEvent>) {
        if self.gesture.is_idle() {
            return;
        }
        self.pointer_move(pos, events);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Drawing { anchor, current } => {
                let rect = Bounds::from_corners(anchor, current);
                let min = self.config.min_region_size;
                if rect.width > min && rect.height > min {
                    let region = Region::create(self.registry.as_ref(), rect, self.draw_type.clone());
                    let id = region.id();
                    if self.template.add_region(region) {
                        log::debug!("added {} region {id} at {rect:?}", self.draw_type);
                        emit(events, EditorEvent::RegionAdded(id));
                        self.select(id, events);
                    }
                } else {
                    log::debug!("discarded draw below minimum size: {rect:?}");
                }
                emit(events, EditorEvent::Redraw);
            }
            Gesture::Dragging { region, origin, .. } | Gesture::Resizing { region, origin, .. } => {
                let changed = self
                    .template
                    .region(region)
                    .is_some_and(|r| r.bounds() != origin);
                if changed {
                    emit(events, EditorEvent::RegionUpdated(region));
                }
                emit(events, EditorEvent::Redraw);
            }
            Gesture::Panning { .. } | Gesture::Idle => {}
        }
        let canvas = self.viewport.screen_to_canvas(pos);
        self.update_hover(canvas, events);
    }

    fn begin_resize(&mut self, id: RegionId, bounds: Bounds, handle: ResizeHandle, canvas: egui::Pos2) {
        self.gesture = Gesture::Resizing {
            region: id,
            handle,
            start_pointer: canvas,
            origin: bounds,
        };
    }

    /// Handle zone side in canvas units; constant on screen at any zoom.
    fn handle_zone(&self) -> f32 {
        self.config.handle_size / self.viewport.zoom()
    }

    fn selected_handle_at(
        &self,
        canvas: egui::Pos2,
        zone: f32,
    ) -> Option<(RegionId, Bounds, ResizeHandle)> {
        let region = self.selected_region().filter(|r| r.is_visible())?;
        let handle = handle_at(&region.bounds(), canvas, zone)?;
        Some((region.id(), region.bounds(), handle))
    }

    /// Topmost visible region under a canvas point.
    fn hit_test(&self, canvas: egui::Pos2) -> Option<&Region> {
        self.template
            .regions_at_point(canvas)
            .into_iter()
            .rev()
            .find(|r| r.is_visible())
    }

    fn update_hover(&mut self, canvas: egui::Pos2, events: &mut Vec<EditorEvent>) {
        let next = match self.tool {
            ToolMode::Select => {
                let zone = self.handle_zone();
                if let Some((id, _, handle)) = self.selected_handle_at(canvas, zone) {
                    Hover {
                        region: Some(id),
                        handle: Some(handle),
                    }
                } else if let Some(r) = self.hit_test(canvas) {
                    Hover {
                        region: Some(r.id()),
                        handle: handle_at(&r.bounds(), canvas, zone),
                    }
                } else {
                    Hover::default()
                }
            }
            ToolMode::Draw | ToolMode::Pan => Hover::default(),
        };
        if next != self.hover {
            self.hover = next;
            emit(events, EditorEvent::Redraw);
        }
    }

    fn select(&mut self, id: RegionId, events: &mut Vec<EditorEvent>) {
        self.template.select_region(id);
        if self.selected != Some(id) {
            self.selected = Some(id);
            emit(events, EditorEvent::SelectionChanged(Some(id)));
            emit(events, EditorEvent::Redraw);
        }
    }

    fn clear_selection(&mut self, events: &mut Vec<EditorEvent>) {
        self.template.clear_selection();
        if self.selected.take().is_some() {
            emit(events, EditorEvent::SelectionChanged(None));
            emit(events, EditorEvent::Redraw);
        }
    }

    // ---------------------------------------------------------------------
    // Keyboard / commands
    // ---------------------------------------------------------------------

    pub fn handle_key(&mut self, command: KeyCommand) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        if command == KeyCommand::Escape {
            if self.gesture.is_idle() {
                self.clear_selection(&mut events);
            } else {
                self.cancel_gesture(&mut events);
            }
            return events;
        }
        if !self.gesture.is_idle() {
            return events;
        }
        match command {
            KeyCommand::Escape => {}
            KeyCommand::DeleteSelected => {
                if let Some(id) = self.selected {
                    events.extend(self.remove_region(id));
                }
            }
            KeyCommand::Nudge { dx, dy } => {
                let image = self.template.image_bounds();
                let constrain = self.config.constrain_to_image;
                if let Some(r) = self.selected.and_then(|id| self.template.region_mut(id)) {
                    let delta = egui::vec2(dx, dy);
                    let delta = if constrain {
                        constrained_delta(r.bounds(), delta, image)
                    } else {
                        delta
                    };
                    r.move_by(delta.x, delta.y);
                    emit(&mut events, EditorEvent::RegionUpdated(r.id()));
                    emit(&mut events, EditorEvent::Redraw);
                }
            }
            KeyCommand::DuplicateSelected => {
                let offset = egui::vec2(self.config.duplicate_offset, self.config.duplicate_offset);
                if let Some(copy) = self
                    .selected
                    .and_then(|id| self.template.duplicate_region(id, offset))
                {
                    emit(&mut events, EditorEvent::RegionAdded(copy));
                    self.select(copy, &mut events);
                }
            }
            KeyCommand::BringToFront => {
                if let Some(id) = self.selected {
                    if self.template.bring_to_front(id) {
                        emit(&mut events, EditorEvent::RegionUpdated(id));
                        emit(&mut events, EditorEvent::Redraw);
                    }
                }
            }
            KeyCommand::SendToBack => {
                if let Some(id) = self.selected {
                    if self.template.send_to_back(id) {
                        emit(&mut events, EditorEvent::RegionUpdated(id));
                        emit(&mut events, EditorEvent::Redraw);
                    }
                }
            }
            KeyCommand::SetTool(tool) => {
                self.set_tool(tool);
                emit(&mut events, EditorEvent::Redraw);
            }
            KeyCommand::ZoomIn | KeyCommand::ZoomOut => {
                let factor = if command == KeyCommand::ZoomIn {
                    self.config.zoom_step
                } else {
                    1.0 / self.config.zoom_step
                };
                let center = (self.viewport_size * 0.5).to_pos2();
                self.viewport.zoom_by(factor, center);
                emit(&mut events, EditorEvent::Redraw);
            }
            KeyCommand::ResetZoom => {
                self.viewport.reset();
                emit(&mut events, EditorEvent::Redraw);
            }
            KeyCommand::FitToView => {
                self.fit_to_view();
                emit(&mut events, EditorEvent::Redraw);
            }
        }
        events
    }

    /// Aborts the in-flight gesture and restores what it changed.
    pub fn cancel_gesture(&mut self, events: &mut Vec<EditorEvent>) {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => return,
            Gesture::Drawing { .. } => {}
            Gesture::Dragging { region, origin, .. } | Gesture::Resizing { region, origin, .. } => {
                if let Some(r) = self.template.region_mut(region) {
                    r.update_bounds(origin);
                }
            }
            Gesture::Panning { origin_pan, .. } => self.viewport.set_pan(origin_pan),
        }
        emit(events, EditorEvent::Redraw);
    }

    // ---------------------------------------------------------------------
    // Region edits from the property panel
    // ---------------------------------------------------------------------

    /// Removes a region, dropping every cached reference to it.
    pub fn remove_region(&mut self, id: RegionId) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        if self.gesture.region() == Some(id) {
            self.gesture = Gesture::Idle;
        }
        if !self.template.remove_region(id) {
            return events;
        }
        if self.hover.region == Some(id) {
            self.hover = Hover::default();
        }
        emit(&mut events, EditorEvent::RegionRemoved(id));
        if self.selected == Some(id) {
            self.selected = None;
            emit(&mut events, EditorEvent::SelectionChanged(None));
        }
        emit(&mut events, EditorEvent::Redraw);
        events
    }

    /// Selects a region from outside the canvas (e.g. a region list).
    /// Unknown ids clear the selection.
    pub fn select_region(&mut self, id: RegionId) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        if self.template.region(id).is_some() {
            self.select(id, &mut events);
        } else {
            self.clear_selection(&mut events);
        }
        events
    }

    pub fn set_region_label(&mut self, id: RegionId, label: Option<String>) -> Option<Option<String>> {
        self.template.region_mut(id).map(|r| r.set_label(label))
    }

    pub fn set_region_visible(&mut self, id: RegionId, visible: bool) -> Option<bool> {
        let previous = self.template.region_mut(id).map(|r| r.set_visible(visible));
        if !visible && self.hover.region == Some(id) {
            self.hover = Hover::default();
        }
        previous
    }

    pub fn update_region_component_type(
        &mut self,
        id: RegionId,
        component_type: impl Into<String>,
    ) -> Option<String> {
        let registry = Rc::clone(&self.registry);
        self.template
            .region_mut(id)
            .map(|r| r.update_component_type(registry.as_ref(), component_type))
    }

    pub fn update_region_default_values(&mut self, id: RegionId, values: ValueMap) -> Option<ValueMap> {
        self.template
            .region_mut(id)
            .map(|r| r.update_default_values(values))
    }

    pub fn set_region_default_value(
        &mut self,
        id: RegionId,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<Option<serde_json::Value>> {
        self.template
            .region_mut(id)
            .map(|r| r.set_default_value(field, value))
    }

    /// Sets bounds typed into the property panel. Negative sizes are
    /// normalized and sizes are kept at or above the minimum.
    pub fn set_region_bounds(&mut self, id: RegionId, bounds: Bounds) -> Option<Bounds> {
        if !bounds.is_finite() || self.gesture.region() == Some(id) {
            return None;
        }
        let min = self.config.min_region_size;
        let normalized = Bounds::from_corners(
            egui::pos2(bounds.x, bounds.y),
            egui::pos2(bounds.x + bounds.width, bounds.y + bounds.height),
        );
        let clamped = Bounds {
            width: normalized.width.max(min),
            height: normalized.height.max(min),
            ..normalized
        };
        self.template.region_mut(id).map(|r| r.update_bounds(clamped))
    }
}

/// Cursor for a given interaction state.
pub fn cursor_for(gesture: &Gesture, tool: ToolMode, hover: Hover) -> egui::CursorIcon {
    match gesture {
        Gesture::Drawing { .. } => egui::CursorIcon::Crosshair,
        Gesture::Dragging { .. } | Gesture::Panning { .. } => egui::CursorIcon::Grabbing,
        Gesture::Resizing { handle, .. } => handle.cursor(),
        Gesture::Idle => match tool {
            ToolMode::Draw => egui::CursorIcon::Crosshair,
            ToolMode::Pan => egui::CursorIcon::Grab,
            ToolMode::Select => match (hover.handle, hover.region) {
                (Some(handle), _) => handle.cursor(),
                (None, Some(_)) => egui::CursorIcon::Move,
                (None, None) => egui::CursorIcon::Default,
            },
        },
    }
}

/// Shrinks a move so `bounds` stays inside `image` where it fits.
fn constrained_delta(bounds: Bounds, delta: egui::Vec2, image: Bounds) -> egui::Vec2 {
    let clamp_axis = |pos: f32, size: f32, d: f32, limit: f32| {
        let max = (limit - size).max(0.0);
        let target = (pos + d).clamp(0.0_f32.min(pos), max.max(pos));
        target - pos
    };
    egui::vec2(
        clamp_axis(bounds.x, bounds.width, delta.x, image.width),
        clamp_axis(bounds.y, bounds.height, delta.y, image.height),
    )
}

/// Pushes `event`, skipping repeated redraw requests.
fn emit(events: &mut Vec<EditorEvent>, event: EditorEvent) {
    if event == EditorEvent::Redraw && events.contains(&EditorEvent::Redraw) {
        return;
    }
    events.push(event);
}
