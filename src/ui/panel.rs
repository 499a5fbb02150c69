// src/ui/panel.rs
//! The side panel left of the 3D viewport
//!
//! Holds the upload surface, the paint color picker, the status line and
//! statistics about the loaded model.

use imgui::{Condition, Ui, WindowFlags};

use crate::{
    paint::{PaintColor, Selection},
    viewer::Viewer,
};

/// Something the panel asks the app to do after the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    /// Show a file picker and load the chosen archive
    OpenArchive,
    /// Paint the last picked triangle with the current color
    PaintSelection,
    SetPaintColor(PaintColor),
}

/// Draws the panel, pinned to the window's left edge at the configured width
///
/// The viewer is only read here; changes come back as actions.
pub fn side_panel(ui: &Ui, viewer: &Viewer) -> Vec<PanelAction> {
    let mut actions = Vec::new();
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return actions;
    }
    let width = viewer.config().panel_width.min(display_size[0]);
    if width <= 0.0 {
        return actions;
    }

    ui.window("meshpaint")
        .position([0.0, 0.0], Condition::Always)
        .size([width, display_size[1]], Condition::Always)
        .flags(WindowFlags::NO_MOVE | WindowFlags::NO_RESIZE | WindowFlags::NO_COLLAPSE)
        .build(|| {
            if ui.button("Open archive...") {
                actions.push(PanelAction::OpenArchive);
            }
            ui.text_disabled("or drop a .zip onto the window");

            ui.separator();
            render_color_controls(ui, viewer, &mut actions);

            ui.separator();
            ui.text_wrapped(viewer.status());
            render_selection(ui, viewer);

            ui.separator();
            render_model_info(ui, viewer);
        });
    actions
}

fn render_color_controls(ui: &Ui, viewer: &Viewer, actions: &mut Vec<PanelAction>) {
    ui.text("Paint color");
    let mut color = viewer.paint_color().to_array();
    if ui.color_edit3("##paint_color", &mut color) {
        actions.push(PanelAction::SetPaintColor(PaintColor::from(color)));
    }
    ui.text(format!("{}", PaintColor::from(color)));

    let has_selection = viewer.selection() != Selection::Unselected;
    ui.disabled(!has_selection, || {
        if ui.button("Apply to last pick") {
            actions.push(PanelAction::PaintSelection);
        }
    });
}

fn render_selection(ui: &Ui, viewer: &Viewer) {
    match viewer.selection() {
        Selection::Unselected => ui.text_disabled("No triangle selected"),
        Selection::Selected(picked) => {
            let name = viewer
                .scene()
                .model()
                .and_then(|m| m.node(picked.node))
                .map_or("?", |n| n.name.as_str());
            ui.text(format!("Selected: {} face {}", name, picked.face_index));
            ui.text(format!(
                "Vertices: {} {} {}",
                picked.face[0], picked.face[1], picked.face[2]
            ));
        }
    }
}

fn render_model_info(ui: &Ui, viewer: &Viewer) {
    let Some(stats) = viewer.statistics() else {
        ui.text_disabled("No model loaded");
        return;
    };

    if ui.collapsing_header("Model", imgui::TreeNodeFlags::DEFAULT_OPEN) {
        ui.text(format!("Nodes: {}", stats.node_count));
        ui.text(format!("Meshes: {}", stats.mesh_count));
        ui.text(format!("Materials: {}", stats.material_count));
        ui.text(format!("Triangles: {}", stats.total_triangles));
        ui.text(format!("Vertices: {}", stats.total_vertices));
    }

    let Some(report) = viewer.report() else {
        return;
    };
    if !report.meshes_without_material.is_empty() || !report.unresolved_references.is_empty() {
        if ui.collapsing_header("Warnings", imgui::TreeNodeFlags::empty()) {
            for mesh in &report.meshes_without_material {
                ui.text_wrapped(format!("No material: {}", mesh));
            }
            for reference in &report.unresolved_references {
                ui.text_wrapped(format!("Unresolved: {}", reference));
            }
        }
    }
}
