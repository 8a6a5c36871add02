use chrono::{DateTime, Utc};
use eframe::egui;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Bounds;
use crate::registry::{TypeRegistry, Validation, ValueMap};

pub type RegionId = Uuid;

/// One of the eight grab points on a region's outline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    NW,
    N,
    NE,
    W,
    E,
    SW,
    S,
    SE,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::W,
        ResizeHandle::E,
        ResizeHandle::SW,
        ResizeHandle::S,
        ResizeHandle::SE,
    ];

    /// Position on the outline as (-1|0|1, -1|0|1) relative to the center.
    pub fn offset(self) -> (f32, f32) {
        match self {
            ResizeHandle::NW => (-1.0, -1.0),
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::NE => (1.0, -1.0),
            ResizeHandle::W => (-1.0, 0.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::SW => (-1.0, 1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::SE => (1.0, 1.0),
        }
    }

    pub fn position(self, bounds: &Bounds) -> egui::Pos2 {
        let (sx, sy) = self.offset();
        let c = bounds.center();
        egui::pos2(
            c.x + sx * bounds.width * 0.5,
            c.y + sy * bounds.height * 0.5,
        )
    }

    pub fn opposite(self) -> ResizeHandle {
        match self {
            ResizeHandle::NW => ResizeHandle::SE,
            ResizeHandle::N => ResizeHandle::S,
            ResizeHandle::NE => ResizeHandle::SW,
            ResizeHandle::W => ResizeHandle::E,
            ResizeHandle::E => ResizeHandle::W,
            ResizeHandle::SW => ResizeHandle::NE,
            ResizeHandle::S => ResizeHandle::N,
            ResizeHandle::SE => ResizeHandle::NW,
        }
    }

    pub fn cursor(self) -> egui::CursorIcon {
        match self {
            ResizeHandle::N | ResizeHandle::S => egui::CursorIcon::ResizeVertical,
            ResizeHandle::E | ResizeHandle::W => egui::CursorIcon::ResizeHorizontal,
            ResizeHandle::NE | ResizeHandle::SW => egui::CursorIcon::ResizeNeSw,
            ResizeHandle::NW | ResizeHandle::SE => egui::CursorIcon::ResizeNwSe,
        }
    }
}

/// Which handle zone of `bounds` contains `p`, if any. `zone_size` is the
/// side of each square zone in canvas units. Corners win over edges when
/// zones overlap on tiny regions.
pub fn handle_at(bounds: &Bounds, p: egui::Pos2, zone_size: f32) -> Option<ResizeHandle> {
    let half = zone_size.max(0.0) * 0.5;
    let hit = |h: ResizeHandle| {
        let c = h.position(bounds);
        (p.x - c.x).abs() <= half && (p.y - c.y).abs() <= half
    };
    const CORNERS_FIRST: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::NE,
        ResizeHandle::SW,
        ResizeHandle::SE,
        ResizeHandle::N,
        ResizeHandle::W,
        ResizeHandle::E,
        ResizeHandle::S,
    ];
    CORNERS_FIRST.into_iter().find(|h| hit(*h))
}

/// A typed rectangle laid over the template image.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    id: RegionId,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    component_type: String,
    #[serde(default)]
    default_values: ValueMap,
    #[serde(default)]
    label: Option<String>,
    #[serde(default = "default_visible")]
    is_visible: bool,
    #[serde(skip)]
    is_selected: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn default_visible() -> bool {
    true
}

impl Region {
    /// Factory: new id, timestamps, and default values seeded from the registry.
    pub fn create(
        registry: &dyn TypeRegistry,
        bounds: Bounds,
        component_type: impl Into<String>,
    ) -> Self {
        let component_type = component_type.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            default_values: registry.generate_default_values(&component_type),
            component_type,
            label: None,
            is_visible: true,
            is_selected: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deep copy under a fresh id, unselected. Use this instead of `clone`
    /// whenever the copy is going to live in a template.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            is_selected: false,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn default_values(&self) -> &ValueMap {
        &self.default_values
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn contains_point(&self, p: egui::Pos2) -> bool {
        self.bounds().contains(p)
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
        self.touch();
    }

    /// Replaces the rectangle as a whole. Callers pass normalized values.
    pub fn update_bounds(&mut self, bounds: Bounds) -> Bounds {
        let previous = self.bounds();
        self.x = bounds.x;
        self.y = bounds.y;
        self.width = bounds.width;
        self.height = bounds.height;
        self.touch();
        previous
    }

    /// Drags `handle` by (dx, dy) keeping the opposite side(s) fixed. A
    /// dimension that would drop below `min_size` is clamped to `min_size`
    /// instead of flipping the rectangle.
    pub fn resize_from_handle(&mut self, handle: ResizeHandle, dx: f32, dy: f32, min_size: f32) {
        let next = resized_bounds(self.bounds(), handle, dx, dy, min_size);
        self.update_bounds(next);
    }

    /// Switches type and resets default values to the new type's defaults.
    pub fn update_component_type(
        &mut self,
        registry: &dyn TypeRegistry,
        component_type: impl Into<String>,
    ) -> String {
        let component_type = component_type.into();
        self.default_values = registry.generate_default_values(&component_type);
        let previous = std::mem::replace(&mut self.component_type, component_type);
        self.touch();
        previous
    }

    pub fn update_default_values(&mut self, values: ValueMap) -> ValueMap {
        let previous = std::mem::replace(&mut self.default_values, values);
        self.touch();
        previous
    }

    /// Sets one field of the default values, returning the old value.
    pub fn set_default_value(
        &mut self,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        let previous = self.default_values.insert(field.into(), value);
        self.touch();
        previous
    }

    /// Blank labels are stored as no label.
    pub fn set_label(&mut self, label: Option<String>) -> Option<String> {
        let label = label.filter(|l| !l.trim().is_empty());
        let previous = std::mem::replace(&mut self.label, label);
        self.touch();
        previous
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        let previous = std::mem::replace(&mut self.is_visible, visible);
        self.touch();
        previous
    }

    // Selection is a template-wide singleton; only Template flips this.
    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }

    pub fn validate(&self, registry: &dyn TypeRegistry) -> Validation {
        let mut errors = Vec::new();
        if !self.bounds().is_finite() {
            errors.push("position and size must be finite numbers".to_string());
        }
        if !(self.width > 0.0) {
            errors.push(format!("width must be positive (got {})", self.width));
        }
        if !(self.height > 0.0) {
            errors.push(format!("height must be positive (got {})", self.height));
        }
        if self.x < 0.0 {
            errors.push(format!("x must not be negative (got {})", self.x));
        }
        if self.y < 0.0 {
            errors.push(format!("y must not be negative (got {})", self.y));
        }
        if registry.is_known(&self.component_type) {
            let values =
                registry.validate_default_values(&self.component_type, &self.default_values);
            errors.extend(values.errors);
        } else {
            errors.push(format!("unknown component type '{}'", self.component_type));
        }
        Validation::from_errors(errors)
    }

    /// Short text for lists and canvas captions.
    pub fn display_name(&self, registry: &dyn TypeRegistry) -> String {
        if let Some(label) = self.label() {
            return label.to_string();
        }
        registry
            .display_info(&self.component_type)
            .map(|info| info.name)
            .unwrap_or_else(|| self.component_type.clone())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Pure form of [`Region::resize_from_handle`].
pub fn resized_bounds(
    start: Bounds,
    handle: ResizeHandle,
    dx: f32,
    dy: f32,
    min_size: f32,
) -> Bounds {
    let min_size = if min_size.is_finite() { min_size.max(0.0) } else { 0.0 };
    let dx = if dx.is_finite() { dx } else { 0.0 };
    let dy = if dy.is_finite() { dy } else { 0.0 };
    let mut left = start.left();
    let mut top = start.top();
    let mut right = start.right();
    let mut bottom = start.bottom();
    let (sx, sy) = handle.offset();

    if sx < 0.0 {
        left = (left + dx).min(right - min_size);
    } else if sx > 0.0 {
        right = (right + dx).max(left + min_size);
    }
    if sy < 0.0 {
        top = (top + dy).min(bottom - min_size);
    } else if sy > 0.0 {
        bottom = (bottom + dy).max(top + min_size);
    }
    Bounds::new(left, top, right - left, bottom - top)
}
