use eframe::egui;
use serde_json::Value;

use crate::controller::{InteractionController, KeyCommand};
use crate::geometry::Bounds;
use crate::region::{Region, RegionId};
use crate::registry::{ComponentTypeRegistry, FieldKind, FieldSpec, Rgba, TypeRegistry, parse_hex_color};
use crate::template::TemplateValidation;

/// Edits requested by the side panel, applied after the panel is drawn.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum PanelAction {
    Select(RegionId),
    SetVisible(RegionId, bool),
    SetLabel(RegionId, Option<String>),
    SetType(RegionId, String),
    SetField(RegionId, String, Value),
    SetBounds(RegionId, Bounds),
    Remove(RegionId),
    RenameTemplate(String),
    Command(KeyCommand),
}

pub(super) fn properties_panel(
    ui: &mut egui::Ui,
    controller: &InteractionController,
    registry: &ComponentTypeRegistry,
    type_query: &mut String,
    validation: Option<&TemplateValidation>,
) -> Vec<PanelAction> {
    let mut actions = Vec::new();
    let template = controller.template();

    ui.heading("Template");
    let mut name = template.name().to_string();
    if ui.text_edit_singleline(&mut name).changed() {
        actions.push(PanelAction::RenameTemplate(name));
    }
    let (w, h) = template.image_size();
    if template.image_url().is_empty() {
        ui.weak("No image");
    } else {
        ui.small(format!("{} ({w}x{h})", template.image_url()));
    }
    ui.separator();

    ui.heading("Regions");
    egui::ScrollArea::vertical()
        .id_salt("region_list")
        .max_height(180.0)
        .show(ui, |ui| {
            // Topmost first, like a layer list.
            for region in template.regions().iter().rev() {
                region_row(ui, region, registry, &mut actions);
            }
            if template.is_empty() {
                ui.weak("Draw on the canvas to add a region.");
            }
        });

    let overlaps = template.overlapping_regions();
    if !overlaps.is_empty() {
        ui.colored_label(
            egui::Color32::from_rgb(230, 120, 80),
            format!("{} overlapping pair(s)", overlaps.len()),
        );
    }
    ui.separator();

    match controller.selected_region() {
        Some(region) => selected_region_editor(ui, region, registry, type_query, validation, &mut actions),
        None => {
            ui.weak("Nothing selected");
        }
    }

    if let Some(report) = validation.filter(|r| !r.is_valid) {
        ui.separator();
        ui.label(egui::RichText::new("Validation").strong());
        for e in &report.errors {
            ui.colored_label(egui::Color32::from_rgb(220, 80, 80), e);
        }
    }
    actions
}

fn region_row(
    ui: &mut egui::Ui,
    region: &Region,
    registry: &ComponentTypeRegistry,
    actions: &mut Vec<PanelAction>,
) {
    ui.horizontal(|ui| {
        let mut visible = region.is_visible();
        if ui.checkbox(&mut visible, "").on_hover_text("Visible").changed() {
            actions.push(PanelAction::SetVisible(region.id(), visible));
        }
        let icon = registry
            .get(region.component_type())
            .map(|t| t.icon.as_str())
            .unwrap_or("?");
        let text = format!("{icon} {}", region.display_name(registry));
        if ui.selectable_label(region.is_selected(), text).clicked() {
            actions.push(PanelAction::Select(region.id()));
        }
    });
}

fn selected_region_editor(
    ui: &mut egui::Ui,
    region: &Region,
    registry: &ComponentTypeRegistry,
    type_query: &mut String,
    validation: Option<&TemplateValidation>,
    actions: &mut Vec<PanelAction>,
) {
    let id = region.id();
    ui.heading("Region");

    ui.horizontal(|ui| {
        ui.label("Label:");
        let mut label = region.label().unwrap_or_default().to_string();
        if ui.text_edit_singleline(&mut label).changed() {
            actions.push(PanelAction::SetLabel(id, Some(label)));
        }
    });

    let current = registry
        .display_info(region.component_type())
        .map(|d| d.name)
        .unwrap_or_else(|| format!("{} (unknown)", region.component_type()));
    ui.label(format!("Type: {current}"));
    ui.add(egui::TextEdit::singleline(type_query).hint_text("Change type..."));
    if !type_query.trim().is_empty() {
        for t in registry.search(type_query).into_iter().take(6) {
            let active = t.key == region.component_type();
            if ui
                .selectable_label(active, format!("{} {}", t.icon, t.name))
                .clicked()
                && !active
            {
                actions.push(PanelAction::SetType(id, t.key.clone()));
            }
        }
    }
    ui.separator();

    ui.label(egui::RichText::new("Default values").strong());
    match registry.get(region.component_type()) {
        Some(t) if !t.fields.is_empty() => {
            egui::Grid::new("field_grid").num_columns(2).show(ui, |ui| {
                for field in &t.fields {
                    let label = if field.required {
                        format!("{}*", field.name)
                    } else {
                        field.name.clone()
                    };
                    ui.label(label);
                    if let Some(value) = field_editor(ui, field, region.default_values().get(&field.name)) {
                        actions.push(PanelAction::SetField(id, field.name.clone(), value));
                    }
                    ui.end_row();
                }
            });
        }
        _ => {
            ui.weak("No fields");
        }
    }
    ui.separator();

    let b = region.bounds();
    let mut edited = b;
    egui::Grid::new("bounds_grid").num_columns(4).show(ui, |ui| {
        ui.label("x");
        ui.add(egui::DragValue::new(&mut edited.x).speed(1.0));
        ui.label("y");
        ui.add(egui::DragValue::new(&mut edited.y).speed(1.0));
        ui.end_row();
        ui.label("w");
        ui.add(egui::DragValue::new(&mut edited.width).speed(1.0));
        ui.label("h");
        ui.add(egui::DragValue::new(&mut edited.height).speed(1.0));
        ui.end_row();
    });
    if edited != b {
        actions.push(PanelAction::SetBounds(id, edited));
    }

    let mut visible = region.is_visible();
    if ui.checkbox(&mut visible, "Visible").changed() {
        actions.push(PanelAction::SetVisible(id, visible));
    }

    ui.horizontal(|ui| {
        if ui.button("Duplicate").clicked() {
            actions.push(PanelAction::Command(KeyCommand::DuplicateSelected));
        }
        if ui.button("Front").clicked() {
            actions.push(PanelAction::Command(KeyCommand::BringToFront));
        }
        if ui.button("Back").clicked() {
            actions.push(PanelAction::Command(KeyCommand::SendToBack));
        }
        if ui.button("Delete").clicked() {
            actions.push(PanelAction::Remove(id));
        }
    });

    if let Some((_, errors)) = validation
        .into_iter()
        .flat_map(|r| r.per_region_errors.iter())
        .find(|(rid, _)| *rid == id)
    {
        for e in errors {
            ui.colored_label(egui::Color32::from_rgb(220, 80, 80), e);
        }
    }

    ui.small(format!(
        "Created {} / updated {}",
        region.created_at().format("%Y-%m-%d %H:%M"),
        region.updated_at().format("%H:%M:%S")
    ));
}

/// One widget per field kind. Returns the new value when it was edited.
fn field_editor(ui: &mut egui::Ui, field: &FieldSpec, value: Option<&Value>) -> Option<Value> {
    let as_text = || match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    match &field.kind {
        FieldKind::Text { .. } | FieldKind::Url => {
            let mut s = as_text();
            let edit = egui::TextEdit::singleline(&mut s).desired_width(160.0);
            ui.add(edit).changed().then(|| Value::String(s))
        }
        FieldKind::Multiline => {
            let mut s = as_text();
            let edit = egui::TextEdit::multiline(&mut s)
                .desired_rows(3)
                .desired_width(160.0);
            ui.add(edit).changed().then(|| Value::String(s))
        }
        FieldKind::Number { min, max } => {
            let mut n = value.and_then(Value::as_f64).unwrap_or(0.0);
            let mut drag = egui::DragValue::new(&mut n).speed(1.0);
            if let (Some(lo), Some(hi)) = (min, max) {
                drag = drag.range(*lo..=*hi);
            }
            if !ui.add(drag).changed() {
                return None;
            }
            serde_json::Number::from_f64(n).map(Value::Number)
        }
        FieldKind::Bool => {
            let mut b = value.and_then(Value::as_bool).unwrap_or(false);
            ui.checkbox(&mut b, "").changed().then_some(Value::Bool(b))
        }
        FieldKind::Color => {
            let current = value.and_then(Value::as_str).and_then(parse_hex_color);
            let mut edited = None;
            ui.horizontal(|ui| {
                let rgba = current.unwrap_or(Rgba::rgb(0, 0, 0));
                let mut arr = [rgba.r, rgba.g, rgba.b, rgba.a];
                if ui.color_edit_button_srgba_unmultiplied(&mut arr).changed() {
                    edited = Some(Value::String(hex_color(arr)));
                }
                let mut s = as_text();
                let edit = egui::TextEdit::singleline(&mut s).desired_width(80.0);
                if ui.add(edit).changed() {
                    edited = Some(Value::String(s));
                }
            });
            edited
        }
        FieldKind::Choice { options } => {
            let current = as_text();
            let mut picked = None;
            egui::ComboBox::from_id_salt(("choice", &field.name))
                .selected_text(current.as_str())
                .show_ui(ui, |ui| {
                    for option in options {
                        if ui.selectable_label(*option == current, option).clicked() {
                            picked = Some(Value::String(option.clone()));
                        }
                    }
                });
            picked
        }
    }
}

fn hex_color([r, g, b, a]: [u8; 4]) -> String {
    if a == 255 {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}
