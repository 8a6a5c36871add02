use eframe::egui;

use crate::controller::{KeyCommand, PointerButton, PointerEvent, ToolMode};
use crate::render;

use super::RegionEditorApp;
use super::panel::{PanelAction, properties_panel};

/// Scroll distance (points) treated as one wheel notch.
const SCROLL_PER_NOTCH: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileCommand {
    New,
    Open,
    OpenImage,
    Save,
    SaveAs,
}

impl eframe::App for RegionEditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_image_loader(ctx);
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| self.top_bar(ui, ctx));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status.as_deref().unwrap_or("Ready"));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.controller.viewport().zoom() * 100.0));
                    ui.separator();
                    ui.label(format!("Regions: {}", self.controller.template().len()));
                    ui.separator();
                    ui.label(self.title());
                });
            });
        });

        let actions = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .show(ui, |ui| {
                        properties_panel(
                            ui,
                            &self.controller,
                            self.registry.as_ref(),
                            &mut self.type_query,
                            self.validation.as_ref(),
                        )
                    })
                    .inner
            })
            .inner;
        self.apply_panel_actions(ctx, actions);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.canvas(ui, ctx));
    }
}

impl RegionEditorApp {
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let wants_keyboard = ctx.wants_keyboard_input();
        let nudge = (self.settings.nudge_step, self.settings.nudge_step_fast);
        let mut commands = Vec::new();
        let mut file = None;
        ctx.input_mut(|i| {
            if i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S) {
                file = Some(FileCommand::SaveAs);
            } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                file = Some(FileCommand::Save);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                file = Some(FileCommand::Open);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::I) {
                file = Some(FileCommand::OpenImage);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::N) {
                file = Some(FileCommand::New);
            }
            if wants_keyboard {
                return;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                commands.push(KeyCommand::Escape);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
            {
                commands.push(KeyCommand::DeleteSelected);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::D) {
                commands.push(KeyCommand::DuplicateSelected);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::CloseBracket) {
                commands.push(KeyCommand::BringToFront);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::OpenBracket) {
                commands.push(KeyCommand::SendToBack);
            }
            for (key, tool) in [
                (egui::Key::V, ToolMode::Select),
                (egui::Key::R, ToolMode::Draw),
                (egui::Key::H, ToolMode::Pan),
            ] {
                if i.consume_key(egui::Modifiers::NONE, key) {
                    commands.push(KeyCommand::SetTool(tool));
                }
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Plus)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Equals)
            {
                commands.push(KeyCommand::ZoomIn);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Minus) {
                commands.push(KeyCommand::ZoomOut);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Num0) {
                commands.push(KeyCommand::ResetZoom);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F) {
                commands.push(KeyCommand::FitToView);
            }

            let step = if i.modifiers.shift { nudge.1 } else { nudge.0 };
            for (key, dx, dy) in [
                (egui::Key::ArrowLeft, -step, 0.0),
                (egui::Key::ArrowRight, step, 0.0),
                (egui::Key::ArrowUp, 0.0, -step),
                (egui::Key::ArrowDown, 0.0, step),
            ] {
                if i.consume_key(egui::Modifiers::NONE, key) || i.consume_key(egui::Modifiers::SHIFT, key) {
                    commands.push(KeyCommand::Nudge { dx, dy });
                }
            }
        });

        for command in commands {
            let events = self.controller.handle_key(command);
            self.apply_events(ctx, events);
        }
        if let Some(file) = file {
            self.run_file_command(file);
        }
    }

    fn run_file_command(&mut self, command: FileCommand) {
        match command {
            FileCommand::New => self.new_template(),
            FileCommand::Open => self.open_template_dialog(),
            FileCommand::OpenImage => self.open_image_dialog(),
            FileCommand::Save => self.save_template(),
            FileCommand::SaveAs => self.save_template_dialog(),
        }
    }

    fn top_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let mut file = None;
        let mut commands = Vec::new();
        let mut settings_changed = false;
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                for (label, command) in [
                    ("New (⌘N)", FileCommand::New),
                    ("Open template... (⌘O)", FileCommand::Open),
                    ("Open image... (⌘I)", FileCommand::OpenImage),
                    ("Save (⌘S)", FileCommand::Save),
                    ("Save as... (⌘⇧S)", FileCommand::SaveAs),
                ] {
                    if ui.button(label).clicked() {
                        file = Some(command);
                        ui.close_menu();
                    }
                }
            });
            ui.menu_button("View", |ui| {
                settings_changed |= ui.checkbox(&mut self.settings.show_grid, "Grid").changed();
                settings_changed |= ui
                    .checkbox(&mut self.settings.show_overlaps, "Highlight overlaps")
                    .changed();
                settings_changed |= ui
                    .checkbox(&mut self.settings.constrain_to_image, "Keep regions inside image")
                    .changed();
                ui.separator();
                if ui.button("Fit (F)").clicked() {
                    commands.push(KeyCommand::FitToView);
                    ui.close_menu();
                }
                if ui.button("Actual size (0)").clicked() {
                    commands.push(KeyCommand::ResetZoom);
                    ui.close_menu();
                }
            });
            ui.separator();

            let tool = self.controller.tool();
            for (label, mode) in [
                ("Select (V)", ToolMode::Select),
                ("Draw (R)", ToolMode::Draw),
                ("Pan (H)", ToolMode::Pan),
            ] {
                if ui.selectable_label(tool == mode, label).clicked() {
                    commands.push(KeyCommand::SetTool(mode));
                }
            }
            ui.separator();

            ui.label("New region:");
            let current = self.controller.draw_type().to_string();
            let current_name = self
                .registry
                .get(&current)
                .map(|t| format!("{} {}", t.icon, t.name))
                .unwrap_or_else(|| current.clone());
            let mut picked = None;
            egui::ComboBox::from_id_salt("draw_type")
                .selected_text(current_name)
                .show_ui(ui, |ui| {
                    for t in self.registry.types() {
                        if ui
                            .selectable_label(t.key == current, format!("{} {}", t.icon, t.name))
                            .clicked()
                        {
                            picked = Some(t.key.clone());
                        }
                    }
                });
            if let Some(key) = picked {
                self.controller.set_draw_type(key);
            }
            ui.separator();

            if ui.button("Validate").clicked() {
                self.validate_template();
            }
        });

        if settings_changed {
            self.apply_settings();
        }
        for command in commands {
            let events = self.controller.handle_key(command);
            self.apply_events(ctx, events);
        }
        if let Some(file) = file {
            self.run_file_command(file);
        }
    }

    fn apply_panel_actions(&mut self, ctx: &egui::Context, actions: Vec<PanelAction>) {
        for action in actions {
            let events = match action {
                PanelAction::Select(id) => self.controller.select_region(id),
                PanelAction::SetVisible(id, visible) => {
                    self.controller.set_region_visible(id, visible);
                    self.mark_dirty();
                    Vec::new()
                }
                PanelAction::SetLabel(id, label) => {
                    self.controller.set_region_label(id, label);
                    self.mark_dirty();
                    Vec::new()
                }
                PanelAction::SetType(id, key) => {
                    if let Some(previous) = self.controller.update_region_component_type(id, key) {
                        log::debug!("region {id} was '{previous}', default values reset");
                    }
                    self.type_query.clear();
                    self.mark_dirty();
                    Vec::new()
                }
                PanelAction::SetField(id, field, value) => {
                    self.controller.set_region_default_value(id, field, value);
                    self.mark_dirty();
                    Vec::new()
                }
                PanelAction::SetBounds(id, bounds) => {
                    if self.controller.set_region_bounds(id, bounds).is_some() {
                        self.mark_dirty();
                    }
                    Vec::new()
                }
                PanelAction::Remove(id) => self.controller.remove_region(id),
                PanelAction::RenameTemplate(name) => {
                    self.controller.set_template_name(name);
                    self.mark_dirty();
                    Vec::new()
                }
                PanelAction::Command(command) => self.controller.handle_key(command),
            };
            self.apply_events(ctx, events);
            ctx.request_repaint();
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.controller.set_viewport_size(rect.size());
        if self.controller.needs_fit() && rect.width() > 0.0 && rect.height() > 0.0 {
            let (w, h) = self.controller.template().image_size();
            if w > 0 && h > 0 {
                self.controller.fit_to_view();
            }
        }

        for event in collect_pointer_events(ctx, &response, !self.controller.gesture().is_idle()) {
            let events = self.controller.handle_pointer_event(event);
            self.apply_events(ctx, events);
        }

        render::draw_canvas(
            &painter,
            rect,
            &self.controller,
            self.texture.as_ref(),
            &self.render_options,
        );

        if response.hovered() || !self.controller.gesture().is_idle() {
            ctx.set_cursor_icon(self.controller.cursor());
        }
    }
}

/// Translates this frame's raw input into controller events, with positions
/// made relative to the canvas rectangle. Presses, hover moves and wheel
/// input only count while the canvas is the widget under the pointer, so
/// clicks on menus and popups drawn above it never reach the controller.
/// While a gesture is running, moves and releases anywhere are delivered.
fn collect_pointer_events(
    ctx: &egui::Context,
    response: &egui::Response,
    capturing: bool,
) -> Vec<PointerEvent> {
    let over_canvas = response.hovered();
    ctx.input(|i| {
        translate_pointer_input(
            &i.events,
            i.pointer.hover_pos(),
            i.raw_scroll_delta.y,
            response.rect,
            capturing,
            over_canvas,
        )
    })
}

fn translate_pointer_input(
    events: &[egui::Event],
    hover_pos: Option<egui::Pos2>,
    scroll: f32,
    rect: egui::Rect,
    capturing: bool,
    over_canvas: bool,
) -> Vec<PointerEvent> {
    let origin = rect.min.to_vec2();
    let mut out = Vec::new();
    for event in events {
        match event {
            egui::Event::PointerMoved(pos) => {
                if capturing || (over_canvas && rect.contains(*pos)) {
                    out.push(PointerEvent::Move { pos: *pos - origin });
                } else {
                    out.push(PointerEvent::Leave);
                }
            }
            egui::Event::PointerButton {
                pos,
                button,
                pressed,
                ..
            } => {
                let button = match button {
                    egui::PointerButton::Primary => PointerButton::Primary,
                    egui::PointerButton::Secondary => PointerButton::Secondary,
                    egui::PointerButton::Middle => PointerButton::Middle,
                    _ => continue,
                };
                if !*pressed {
                    out.push(PointerEvent::Up { pos: *pos - origin });
                } else if over_canvas && rect.contains(*pos) {
                    out.push(PointerEvent::Down {
                        pos: *pos - origin,
                        button,
                    });
                }
            }
            egui::Event::PointerGone => out.push(PointerEvent::Leave),
            _ => {}
        }
    }
    if over_canvas && scroll.abs() > 0.0 {
        if let Some(pos) = hover_pos.filter(|p| rect.contains(*p)) {
            out.push(PointerEvent::Wheel {
                pos: pos - origin,
                notches: scroll / SCROLL_PER_NOTCH,
            });
        }
    }
    out
}
