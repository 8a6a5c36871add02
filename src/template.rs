use std::collections::HashSet;
use std::path::Path;

use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::region::{Region, RegionId};
use crate::registry::TypeRegistry;

/// Two regions whose rectangles share a positive area.
#[derive(Clone, Copy, Debug)]
pub struct Overlap<'a> {
    pub region1: &'a Region,
    pub region2: &'a Region,
    pub intersection: Bounds,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub per_region_errors: Vec<(RegionId, Vec<String>)>,
}

/// The document: one background image and the regions laid over it.
///
/// Region order is z-order; the last region is drawn on top and wins
/// hit-tests. At most one region is selected at any time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    id: String,
    name: String,
    image_url: String,
    image_width: u32,
    image_height: u32,
    #[serde(default)]
    regions: Vec<Region>,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        image_url: impl Into<String>,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: image_url.into(),
            image_width,
            image_height,
            regions: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> String {
        std::mem::replace(&mut self.name, name.into())
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn image_bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.image_width as f32, self.image_height as f32)
    }

    /// Swaps the backing image. Regions keep their canvas coordinates.
    pub fn set_image(&mut self, image_url: impl Into<String>, width: u32, height: u32) {
        self.image_url = image_url.into();
        self.image_width = width;
        self.image_height = height;
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn index_of(&self, id: RegionId) -> Option<usize> {
        self.regions.iter().position(|r| r.id() == id)
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id() == id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id() == id)
    }

    /// Appends on top. Refuses a region whose id is already present.
    pub fn add_region(&mut self, mut region: Region) -> bool {
        if self.index_of(region.id()).is_some() {
            return false;
        }
        region.set_selected(false);
        self.regions.push(region);
        true
    }

    pub fn remove_region(&mut self, id: RegionId) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                self.regions.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Every region containing `p`, bottom to top.
    pub fn regions_at_point(&self, p: egui::Pos2) -> Vec<&Region> {
        self.regions.iter().filter(|r| r.contains_point(p)).collect()
    }

    pub fn top_region_at_point(&self, p: egui::Pos2) -> Option<&Region> {
        self.regions.iter().rev().find(|r| r.contains_point(p))
    }

    /// Clears every selection, then selects `id` if it exists.
    pub fn select_region(&mut self, id: RegionId) {
        for region in &mut self.regions {
            let selected = region.id() == id;
            region.set_selected(selected);
        }
    }

    pub fn clear_selection(&mut self) {
        for region in &mut self.regions {
            region.set_selected(false);
        }
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.regions.iter().find(|r| r.is_selected())
    }

    pub fn selected_id(&self) -> Option<RegionId> {
        self.selected_region().map(Region::id)
    }

    pub fn overlapping_regions(&self) -> Vec<Overlap<'_>> {
        let mut out = Vec::new();
        for (i, a) in self.regions.iter().enumerate() {
            for b in &self.regions[i + 1..] {
                if let Some(intersection) = a.bounds().intersection(&b.bounds()) {
                    out.push(Overlap {
                        region1: a,
                        region2: b,
                        intersection,
                    });
                }
            }
        }
        out
    }

    pub fn validate_all(&self, registry: &dyn TypeRegistry) -> TemplateValidation {
        let mut errors = Vec::new();
        let mut per_region_errors = Vec::new();
        for (idx, region) in self.regions.iter().enumerate() {
            let v = region.validate(registry);
            if v.is_valid {
                continue;
            }
            let name = region.display_name(registry);
            for e in &v.errors {
                errors.push(format!("Region {} ({name}): {e}", idx + 1));
            }
            per_region_errors.push((region.id(), v.errors));
        }
        TemplateValidation {
            is_valid: errors.is_empty(),
            errors,
            per_region_errors,
        }
    }

    /// Moves a region to the top of the z-order.
    pub fn bring_to_front(&mut self, id: RegionId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let region = self.regions.remove(idx);
        self.regions.push(region);
        true
    }

    pub fn send_to_back(&mut self, id: RegionId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let region = self.regions.remove(idx);
        self.regions.insert(0, region);
        true
    }

    /// Copies a region under a new id, offset by `offset`, on top of the stack.
    pub fn duplicate_region(&mut self, id: RegionId, offset: egui::Vec2) -> Option<RegionId> {
        let mut copy = self.region(id)?.duplicate();
        copy.move_by(offset.x, offset.y);
        let new_id = copy.id();
        self.regions.push(copy);
        Some(new_id)
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// Parses a template document. Documents repeating a region id are
    /// rejected so the loaded template upholds the same invariants as one
    /// built through [`Template::add_region`].
    pub fn from_json(s: &str) -> Result<Self, String> {
        let template: Template = serde_json::from_str(s).map_err(|e| e.to_string())?;
        let mut seen = HashSet::new();
        for region in &template.regions {
            if !seen.insert(region.id()) {
                return Err(format!("duplicate region id {}", region.id()));
            }
        }
        Ok(template)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        Self::from_json(&s)
    }
}
