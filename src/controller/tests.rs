//! Unit tests for the interaction controller.

use std::rc::Rc;

use eframe::egui;

use super::*;
use crate::registry::ComponentTypeRegistry;

fn controller_with(rects: &[Bounds], config: ControllerConfig) -> (InteractionController, Vec<RegionId>) {
    let registry = ComponentTypeRegistry::builtin();
    let mut template = Template::new("t1", "Home", "bg.png", 800, 600);
    let ids = rects
        .iter()
        .map(|b| {
            let region = Region::create(&registry, *b, "text");
            let id = region.id();
            template.add_region(region);
            id
        })
        .collect();
    let controller = InteractionController::new(template, Rc::new(registry), config);
    (controller, ids)
}

fn controller(rects: &[Bounds]) -> (InteractionController, Vec<RegionId>) {
    controller_with(rects, ControllerConfig::default())
}

fn down(c: &mut InteractionController, x: f32, y: f32) -> Vec<EditorEvent> {
    c.handle_pointer_event(PointerEvent::Down {
        pos: egui::pos2(x, y),
        button: PointerButton::Primary,
    })
}

fn drag_to(c: &mut InteractionController, x: f32, y: f32) -> Vec<EditorEvent> {
    c.handle_pointer_event(PointerEvent::Move { pos: egui::pos2(x, y) })
}

fn up(c: &mut InteractionController, x: f32, y: f32) -> Vec<EditorEvent> {
    c.handle_pointer_event(PointerEvent::Up { pos: egui::pos2(x, y) })
}

fn bounds_of(c: &InteractionController, id: RegionId) -> Bounds {
    c.template().region(id).map(Region::bounds).unwrap_or_default()
}

#[test]
fn drawing_in_any_direction_yields_normalized_region() {
    let pairs = [
        ((10.0, 10.0), (110.0, 60.0)),
        ((110.0, 60.0), (10.0, 10.0)),
        ((110.0, 10.0), (10.0, 60.0)),
        ((10.0, 60.0), (110.0, 10.0)),
    ];
    for ((x0, y0), (x1, y1)) in pairs {
        let (mut c, _) = controller(&[]);
        c.set_tool(ToolMode::Draw);
        down(&mut c, x0, y0);
        drag_to(&mut c, (x0 + x1) / 2.0, (y0 + y1) / 2.0);
        let events = up(&mut c, x1, y1);

        assert_eq!(c.template().len(), 1);
        let region = &c.template().regions()[0];
        assert_eq!(region.bounds(), Bounds::new(10.0, 10.0, 100.0, 50.0));
        assert!(events.contains(&EditorEvent::RegionAdded(region.id())));
        assert!(events.contains(&EditorEvent::SelectionChanged(Some(region.id()))));
        assert_eq!(c.selected_id(), Some(region.id()));
        assert!(region.is_selected());
        assert!(c.gesture().is_idle());
    }
}

#[test]
fn draw_below_minimum_size_is_discarded() {
    let config = ControllerConfig {
        min_region_size: 20.0,
        ..ControllerConfig::default()
    };
    let (mut c, _) = controller_with(&[], config);
    c.set_tool(ToolMode::Draw);
    down(&mut c, 0.0, 0.0);
    let events = up(&mut c, 5.0, 5.0);
    assert_eq!(c.template().len(), 0);
    assert!(!events.iter().any(|e| matches!(e, EditorEvent::RegionAdded(_))));

    // One dimension large enough is still not enough.
    down(&mut c, 0.0, 0.0);
    up(&mut c, 300.0, 15.0);
    assert_eq!(c.template().len(), 0);
}

#[test]
fn drawn_region_uses_draw_type_and_registry_defaults() {
    let (mut c, _) = controller(&[]);
    c.set_tool(ToolMode::Draw);
    c.set_draw_type("button");
    down(&mut c, 0.0, 0.0);
    up(&mut c, 50.0, 40.0);
    let region = &c.template().regions()[0];
    assert_eq!(region.component_type(), "button");
    assert_eq!(
        region.default_values().get("text"),
        Some(&serde_json::json!("Click me"))
    );
}

#[test]
fn drawing_respects_viewport_transform() {
    let (mut c, _) = controller(&[]);
    c.set_tool(ToolMode::Draw);
    c.handle_pointer_event(PointerEvent::Wheel {
        pos: egui::pos2(0.0, 0.0),
        notches: 2.0f32.ln() / 1.1f32.ln(),
    });
    assert!((c.viewport().zoom() - 2.0).abs() < 1e-3);
    down(&mut c, 20.0, 40.0);
    up(&mut c, 220.0, 140.0);
    let b = c.template().regions()[0].bounds();
    assert!((b.x - 10.0).abs() < 1e-2 && (b.y - 20.0).abs() < 1e-2);
    assert!((b.width - 100.0).abs() < 1e-2 && (b.height - 50.0).abs() < 1e-2);
}

#[test]
fn pointer_down_mid_gesture_is_ignored() {
    let (mut c, _) = controller(&[]);
    c.set_tool(ToolMode::Draw);
    down(&mut c, 10.0, 10.0);
    down(&mut c, 500.0, 500.0);
    up(&mut c, 60.0, 60.0);
    assert_eq!(c.template().regions()[0].bounds(), Bounds::new(10.0, 10.0, 50.0, 50.0));
}

#[test]
fn dragging_moves_by_successive_deltas() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 50.0)]);
    let events = down(&mut c, 150.0, 120.0);
    assert!(events.contains(&EditorEvent::SelectionChanged(Some(ids[0]))));
    assert!(matches!(c.gesture(), Gesture::Dragging { .. }));

    drag_to(&mut c, 160.0, 125.0);
    drag_to(&mut c, 170.0, 130.0);
    let events = up(&mut c, 175.0, 140.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(125.0, 120.0, 100.0, 50.0));
    assert!(events.contains(&EditorEvent::RegionUpdated(ids[0])));
}

#[test]
fn click_without_movement_does_not_report_update() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 50.0)]);
    down(&mut c, 150.0, 120.0);
    let events = up(&mut c, 150.0, 120.0);
    assert!(!events.contains(&EditorEvent::RegionUpdated(ids[0])));
    assert_eq!(c.selected_id(), Some(ids[0]));
}

#[test]
fn clicking_empty_canvas_clears_selection() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 50.0)]);
    down(&mut c, 150.0, 120.0);
    up(&mut c, 150.0, 120.0);
    assert_eq!(c.selected_id(), Some(ids[0]));

    let events = down(&mut c, 600.0, 500.0);
    assert!(events.contains(&EditorEvent::SelectionChanged(None)));
    assert!(c.gesture().is_idle());
    assert!(c.template().selected_region().is_none());
    assert_eq!(c.selected_id(), None);
}

#[test]
fn topmost_region_wins_the_click() {
    let (mut c, ids) = controller(&[
        Bounds::new(0.0, 0.0, 200.0, 200.0),
        Bounds::new(50.0, 50.0, 200.0, 200.0),
    ]);
    down(&mut c, 100.0, 100.0);
    up(&mut c, 100.0, 100.0);
    assert_eq!(c.selected_id(), Some(ids[1]));
}

#[test]
fn hidden_regions_are_not_hit() {
    let (mut c, ids) = controller(&[
        Bounds::new(0.0, 0.0, 200.0, 200.0),
        Bounds::new(50.0, 50.0, 200.0, 200.0),
    ]);
    c.set_region_visible(ids[1], false);
    down(&mut c, 100.0, 100.0);
    up(&mut c, 100.0, 100.0);
    assert_eq!(c.selected_id(), Some(ids[0]));
}

#[test]
fn resizing_from_corner_handle() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 100.0)]);
    down(&mut c, 200.0, 200.0);
    assert!(matches!(
        c.gesture(),
        Gesture::Resizing {
            handle: ResizeHandle::SE,
            ..
        }
    ));
    drag_to(&mut c, 240.0, 230.0);
    let events = up(&mut c, 250.0, 260.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(100.0, 100.0, 150.0, 160.0));
    assert!(events.contains(&EditorEvent::RegionUpdated(ids[0])));
}

#[test]
fn resize_clamps_at_minimum_size() {
    let config = ControllerConfig {
        min_region_size: 20.0,
        ..ControllerConfig::default()
    };
    let (mut c, ids) = controller_with(&[Bounds::new(100.0, 100.0, 100.0, 100.0)], config);
    down(&mut c, 100.0, 150.0);
    assert!(matches!(
        c.gesture(),
        Gesture::Resizing {
            handle: ResizeHandle::W,
            ..
        }
    ));
    // Past the right edge and back again: no drift from the clamp.
    drag_to(&mut c, 400.0, 150.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(180.0, 100.0, 20.0, 100.0));
    up(&mut c, 120.0, 150.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(120.0, 100.0, 80.0, 100.0));
}

#[test]
fn handle_zone_is_constant_on_screen() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 100.0)]);
    // Select first.
    down(&mut c, 150.0, 150.0);
    up(&mut c, 150.0, 150.0);

    // Zoom 1: 3 canvas px outside the corner is within the 10px zone.
    down(&mut c, 203.0, 203.0);
    assert!(matches!(c.gesture(), Gesture::Resizing { .. }));
    c.handle_key(KeyCommand::Escape);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(100.0, 100.0, 100.0, 100.0));

    // Zoom 4: the same canvas offset is 12 screen px away, outside the zone.
    c.handle_pointer_event(PointerEvent::Wheel {
        pos: egui::pos2(0.0, 0.0),
        notches: 4.0f32.ln() / 1.1f32.ln(),
    });
    assert!((c.viewport().zoom() - 4.0).abs() < 1e-3);
    down(&mut c, 203.0 * 4.0, 203.0 * 4.0);
    assert!(c.gesture().is_idle());
    // ...while 1 canvas px (4 screen px) is inside it.
    down(&mut c, 150.0 * 4.0, 150.0 * 4.0);
    up(&mut c, 150.0 * 4.0, 150.0 * 4.0);
    down(&mut c, 201.0 * 4.0, 201.0 * 4.0);
    assert!(matches!(c.gesture(), Gesture::Resizing { .. }));
}

#[test]
fn escape_restores_region_after_drag() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 50.0)]);
    down(&mut c, 150.0, 120.0);
    drag_to(&mut c, 300.0, 300.0);
    assert_ne!(bounds_of(&c, ids[0]), Bounds::new(100.0, 100.0, 100.0, 50.0));
    let events = c.handle_key(KeyCommand::Escape);
    assert!(events.contains(&EditorEvent::Redraw));
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(100.0, 100.0, 100.0, 50.0));
    assert!(c.gesture().is_idle());

    // The release after a cancel is a no-op.
    let events = up(&mut c, 300.0, 300.0);
    assert!(!events.contains(&EditorEvent::RegionUpdated(ids[0])));
    assert_eq!(c.selected_id(), Some(ids[0]));
}

#[test]
fn escape_restores_region_after_resize() {
    let start = Bounds::new(100.0, 100.0, 100.0, 100.0);
    let (mut c, ids) = controller(&[start]);
    down(&mut c, 200.0, 200.0);
    assert!(matches!(
        c.gesture(),
        Gesture::Resizing {
            handle: ResizeHandle::SE,
            ..
        }
    ));
    drag_to(&mut c, 260.0, 280.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(100.0, 100.0, 160.0, 180.0));

    let events = c.handle_key(KeyCommand::Escape);
    assert!(events.contains(&EditorEvent::Redraw));
    assert_eq!(bounds_of(&c, ids[0]), start);
    assert!(c.gesture().is_idle());
    assert_eq!(c.selected_id(), Some(ids[0]));

    let events = up(&mut c, 260.0, 280.0);
    assert!(!events.contains(&EditorEvent::RegionUpdated(ids[0])));
    assert_eq!(bounds_of(&c, ids[0]), start);
}

#[test]
fn escape_discards_draw_and_then_clears_selection() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 50.0)]);
    c.select_region(ids[0]);
    c.set_tool(ToolMode::Draw);
    down(&mut c, 300.0, 300.0);
    drag_to(&mut c, 400.0, 400.0);
    assert!(c.draw_rect().is_some());
    c.handle_key(KeyCommand::Escape);
    up(&mut c, 400.0, 400.0);
    assert_eq!(c.template().len(), 1);
    assert_eq!(c.selected_id(), Some(ids[0]));

    let events = c.handle_key(KeyCommand::Escape);
    assert!(events.contains(&EditorEvent::SelectionChanged(None)));
    assert_eq!(c.selected_id(), None);
}

#[test]
fn escape_restores_pan() {
    let (mut c, _) = controller(&[]);
    c.set_tool(ToolMode::Pan);
    down(&mut c, 10.0, 10.0);
    drag_to(&mut c, 60.0, 30.0);
    assert_eq!(c.viewport().pan(), egui::vec2(50.0, 20.0));
    c.handle_key(KeyCommand::Escape);
    assert_eq!(c.viewport().pan(), egui::Vec2::ZERO);
}

#[test]
fn pan_tool_moves_viewport_in_screen_units() {
    let (mut c, _) = controller(&[]);
    c.set_tool(ToolMode::Pan);
    down(&mut c, 10.0, 10.0);
    drag_to(&mut c, 30.0, 15.0);
    up(&mut c, 40.0, 5.0);
    assert_eq!(c.viewport().pan(), egui::vec2(30.0, -5.0));
    assert!(c.gesture().is_idle());
}

#[test]
fn middle_button_pans_in_any_tool() {
    let (mut c, _) = controller(&[]);
    c.set_tool(ToolMode::Draw);
    c.handle_pointer_event(PointerEvent::Down {
        pos: egui::pos2(0.0, 0.0),
        button: PointerButton::Middle,
    });
    assert!(matches!(c.gesture(), Gesture::Panning { .. }));
    up(&mut c, 12.0, 7.0);
    assert_eq!(c.viewport().pan(), egui::vec2(12.0, 7.0));
    assert_eq!(c.template().len(), 0);
}

#[test]
fn wheel_zoom_keeps_point_under_pointer() {
    let (mut c, _) = controller(&[]);
    let pos = egui::pos2(321.0, 123.0);
    let before = c.viewport().screen_to_canvas(pos);
    c.handle_pointer_event(PointerEvent::Wheel { pos, notches: 3.0 });
    let after = c.viewport().screen_to_canvas(pos);
    assert!((before - after).length() < 1e-3);
    assert!(c.viewport().zoom() > 1.0);
}

#[test]
fn deleting_selected_clears_cached_selection() {
    let (mut c, ids) = controller(&[
        Bounds::new(0.0, 0.0, 50.0, 50.0),
        Bounds::new(100.0, 0.0, 50.0, 50.0),
    ]);
    c.select_region(ids[1]);
    let events = c.handle_key(KeyCommand::DeleteSelected);
    assert!(events.contains(&EditorEvent::RegionRemoved(ids[1])));
    assert!(events.contains(&EditorEvent::SelectionChanged(None)));
    assert_eq!(c.selected_id(), None);
    assert!(c.selected_region().is_none());
    assert_eq!(c.template().len(), 1);

    let events = c.handle_key(KeyCommand::DeleteSelected);
    assert!(events.is_empty());
}

#[test]
fn removing_region_mid_drag_drops_the_gesture() {
    let (mut c, ids) = controller(&[Bounds::new(0.0, 0.0, 50.0, 50.0)]);
    down(&mut c, 25.0, 25.0);
    drag_to(&mut c, 30.0, 30.0);
    c.remove_region(ids[0]);
    assert!(c.gesture().is_idle());
    let events = up(&mut c, 40.0, 40.0);
    assert!(events.is_empty());
}

#[test]
fn hover_redraws_only_on_target_change() {
    let (mut c, ids) = controller(&[Bounds::new(100.0, 100.0, 100.0, 100.0)]);
    let events = drag_to(&mut c, 150.0, 150.0);
    assert_eq!(events, vec![EditorEvent::Redraw]);
    assert_eq!(c.hover().region, Some(ids[0]));
    assert_eq!(c.cursor(), egui::CursorIcon::Move);

    let events = drag_to(&mut c, 151.0, 152.0);
    assert!(events.is_empty());

    let events = drag_to(&mut c, 500.0, 500.0);
    assert_eq!(events, vec![EditorEvent::Redraw]);
    assert_eq!(c.cursor(), egui::CursorIcon::Default);

    drag_to(&mut c, 150.0, 150.0);
    let events = c.handle_pointer_event(PointerEvent::Leave);
    assert_eq!(events, vec![EditorEvent::Redraw]);
    assert_eq!(c.hover(), Hover::default());
}

#[test]
fn cursor_follows_state() {
    let (mut c, _) = controller(&[Bounds::new(100.0, 100.0, 100.0, 100.0)]);
    drag_to(&mut c, 200.0, 150.0);
    assert_eq!(c.cursor(), egui::CursorIcon::ResizeHorizontal);
    drag_to(&mut c, 100.0, 100.0);
    assert_eq!(c.cursor(), egui::CursorIcon::ResizeNwSe);

    down(&mut c, 150.0, 150.0);
    assert_eq!(c.cursor(), egui::CursorIcon::Grabbing);
    up(&mut c, 150.0, 150.0);

    c.set_tool(ToolMode::Draw);
    assert_eq!(c.cursor(), egui::CursorIcon::Crosshair);
    c.set_tool(ToolMode::Pan);
    assert_eq!(c.cursor(), egui::CursorIcon::Grab);

    assert_eq!(
        cursor_for(
            &Gesture::Resizing {
                region: RegionId::nil(),
                handle: ResizeHandle::N,
                start_pointer: egui::Pos2::ZERO,
                origin: Bounds::default(),
            },
            ToolMode::Select,
            Hover::default(),
        ),
        egui::CursorIcon::ResizeVertical
    );
}

#[test]
fn duplicate_selects_the_copy() {
    let (mut c, ids) = controller(&[Bounds::new(10.0, 10.0, 50.0, 50.0)]);
    c.select_region(ids[0]);
    let events = c.handle_key(KeyCommand::DuplicateSelected);
    assert_eq!(c.template().len(), 2);
    let copy = c.selected_id().unwrap();
    assert_ne!(copy, ids[0]);
    assert!(events.contains(&EditorEvent::RegionAdded(copy)));
    assert_eq!(bounds_of(&c, copy), Bounds::new(20.0, 20.0, 50.0, 50.0));
    assert_eq!(
        c.template().regions().iter().filter(|r| r.is_selected()).count(),
        1
    );
}

#[test]
fn nudge_and_reorder_selected() {
    let (mut c, ids) = controller(&[
        Bounds::new(10.0, 10.0, 50.0, 50.0),
        Bounds::new(10.0, 10.0, 50.0, 50.0),
    ]);
    c.select_region(ids[0]);
    let events = c.handle_key(KeyCommand::Nudge { dx: 1.0, dy: -2.0 });
    assert!(events.contains(&EditorEvent::RegionUpdated(ids[0])));
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(11.0, 8.0, 50.0, 50.0));

    c.handle_key(KeyCommand::BringToFront);
    assert_eq!(c.template().regions().last().map(Region::id), Some(ids[0]));
    c.handle_key(KeyCommand::SendToBack);
    assert_eq!(c.template().regions().first().map(Region::id), Some(ids[0]));
}

#[test]
fn commands_are_ignored_mid_gesture() {
    let (mut c, ids) = controller(&[Bounds::new(10.0, 10.0, 50.0, 50.0)]);
    down(&mut c, 20.0, 20.0);
    let events = c.handle_key(KeyCommand::DeleteSelected);
    assert!(events.is_empty());
    assert!(c.template().region(ids[0]).is_some());
}

#[test]
fn constrain_to_image_keeps_drag_inside() {
    let config = ControllerConfig {
        constrain_to_image: true,
        ..ControllerConfig::default()
    };
    let (mut c, ids) = controller_with(&[Bounds::new(10.0, 10.0, 50.0, 50.0)], config);
    down(&mut c, 20.0, 20.0);
    drag_to(&mut c, -100.0, 2000.0);
    up(&mut c, -100.0, 2000.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(0.0, 550.0, 50.0, 50.0));
}

#[test]
fn unconstrained_drag_may_leave_the_image() {
    let (mut c, ids) = controller(&[Bounds::new(10.0, 10.0, 50.0, 50.0)]);
    down(&mut c, 20.0, 20.0);
    up(&mut c, -20.0, 20.0);
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(-30.0, 10.0, 50.0, 50.0));
    assert!(!c.template().validate_all(c.registry()).is_valid);
}

#[test]
fn set_image_requires_refit() {
    let (mut c, _) = controller(&[]);
    c.set_viewport_size(egui::vec2(800.0, 600.0));
    c.fit_to_view();
    assert!(!c.needs_fit());
    c.set_image("wide.png", 1000, 500);
    assert!(c.needs_fit());
    assert_eq!(c.template().image_size(), (1000, 500));
    c.handle_key(KeyCommand::FitToView);
    assert!(!c.needs_fit());
    assert!((c.viewport().zoom() - 0.76).abs() < 1e-3);
}

#[test]
fn property_edits_go_through_region_mutators() {
    let (mut c, ids) = controller(&[Bounds::new(10.0, 10.0, 50.0, 50.0)]);
    assert_eq!(c.set_region_label(ids[0], Some("Hero".into())), Some(None));
    assert_eq!(c.update_region_component_type(ids[0], "image"), Some("text".to_string()));
    assert_eq!(
        c.template().region(ids[0]).unwrap().default_values().get("fit"),
        Some(&serde_json::json!("cover"))
    );
    let previous = c.set_region_bounds(ids[0], Bounds::new(100.0, 100.0, -40.0, 2.0));
    assert_eq!(previous, Some(Bounds::new(10.0, 10.0, 50.0, 50.0)));
    assert_eq!(bounds_of(&c, ids[0]), Bounds::new(60.0, 100.0, 40.0, 10.0));
    assert_eq!(c.set_region_label(RegionId::new_v4(), None), None);
}

#[test]
fn replace_template_resets_session_state() {
    let (mut c, ids) = controller(&[Bounds::new(10.0, 10.0, 50.0, 50.0)]);
    c.select_region(ids[0]);
    c.set_viewport_size(egui::vec2(800.0, 600.0));
    c.fit_to_view();
    c.replace_template(Template::new("t2", "Other", "other.png", 100, 100));
    assert_eq!(c.selected_id(), None);
    assert!(c.template().is_empty());
    assert!(c.needs_fit());
}

#[test]
fn set_config_keeps_view_unless_zoom_range_changes() {
    let (mut c, _) = controller(&[]);
    c.set_viewport_size(egui::vec2(800.0, 600.0));
    c.fit_to_view();
    let zoom = c.viewport().zoom();
    c.set_config(ControllerConfig {
        handle_size: 16.0,
        ..ControllerConfig::default()
    });
    assert!(!c.needs_fit());
    assert_eq!(c.viewport().zoom(), zoom);

    c.set_config(ControllerConfig {
        min_zoom: 0.5,
        max_zoom: 2.0,
        ..ControllerConfig::default()
    });
    assert_eq!(c.viewport().zoom_range(), (0.5, 2.0));
    assert!((c.viewport().zoom() - zoom).abs() < 1e-5);
}
