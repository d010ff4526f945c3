//! The todo list view.
//!
//! Rows are laid out top to bottom at fixed positions; every row reports its
//! allocated (untransformed) rect to the drag engine before any visual offset
//! is applied. During a drag the dragged row is painted on the engine's own
//! layer so the post-layout transform can move it, while every other row is
//! laid out at its allocated rect plus the engine's shift offset.

use egui::{
    Align, Color32, CornerRadius, CursorIcon, Key, Label, Layout, RichText, Sense, TextEdit,
    UiBuilder, vec2,
};

use crate::model::{CategoryId, Priority, SubtaskId, Todo, TodoId};
use crate::reorder::ListDrag;
use crate::store::TodoStore;

use super::forms::{EditForm, parse_hex_color};

pub const ROW_HEIGHT: f32 = 44.0;
const SUBTASK_ROW_HEIGHT: f32 = 22.0;
const SUBTASK_INPUT_HEIGHT: f32 = 26.0;
const EDIT_ROW_HEIGHT: f32 = 86.0;

/// Store mutations requested by the view this frame. Pure view state
/// (expansion, drafts, the open edit form) lives in [`ListState`] and is
/// mutated in place instead.
#[derive(Debug)]
pub enum ListAction {
    Toggle(TodoId),
    Delete(TodoId),
    SaveEdit {
        id: TodoId,
        title: String,
        priority: Priority,
        category_id: Option<CategoryId>,
        due_date: Option<chrono::NaiveDate>,
    },
    AddSubtask(TodoId, String),
    ToggleSubtask(SubtaskId),
    DeleteSubtask(SubtaskId),
}

#[derive(Debug, Default)]
pub struct ListState {
    expanded: ahash::HashSet<TodoId>,
    subtask_drafts: ahash::HashMap<TodoId, String>,
    edit: Option<EditForm>,
}

pub fn show(
    ui: &mut egui::Ui,
    store: &TodoStore,
    drag: &mut ListDrag,
    state: &mut ListState,
) -> Vec<ListAction> {
    let mut actions = Vec::new();

    drag.begin_frame();
    let visible = store.visible();
    if visible.is_empty() {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("Nothing here").weak());
        });
        return actions;
    }

    let dragged = drag.dragged_index();
    for (index, &todo) in visible.iter().enumerate() {
        let editing = state.edit.as_ref().is_some_and(|e| e.id == todo.id);
        let height = if editing {
            EDIT_ROW_HEIGHT
        } else {
            row_height(todo, state.expanded.contains(&todo.id))
        };
        let (_, rect) = ui.allocate_space(vec2(ui.available_width(), height));
        drag.observe_row(todo.id, rect);

        let is_dragged = dragged == Some(index);
        let offset = if is_dragged { 0.0 } else { drag.row_offset(index) };
        let visual = rect.translate(vec2(0.0, offset));

        let mut builder = UiBuilder::new()
            .max_rect(visual.shrink2(vec2(4.0, 2.0)))
            .layout(Layout::top_down(Align::Min));
        if is_dragged {
            builder = builder.layer_id(drag.drag_layer());
        }
        let mut row_ui = ui.new_child(builder);
        if is_dragged {
            row_ui.painter().rect_filled(
                visual,
                CornerRadius::same(6),
                row_ui.visuals().extreme_bg_color,
            );
        }

        if editing {
            edit_row(&mut row_ui, store, state, &mut actions);
        } else {
            todo_row(&mut row_ui, index, todo, store, drag, state, &mut actions, is_dragged);
        }
    }

    actions
}

fn row_height(todo: &Todo, expanded: bool) -> f32 {
    let mut height = ROW_HEIGHT;
    if expanded {
        height += todo.subtasks.len() as f32 * SUBTASK_ROW_HEIGHT + SUBTASK_INPUT_HEIGHT;
    }
    height
}

#[allow(clippy::too_many_arguments)]
fn todo_row(
    ui: &mut egui::Ui,
    index: usize,
    todo: &Todo,
    store: &TodoStore,
    drag: &mut ListDrag,
    state: &mut ListState,
    actions: &mut Vec<ListAction>,
    is_dragged: bool,
) {
    ui.horizontal(|ui| {
        let handle = ui.add(Label::new(RichText::new("⠿").weak()).sense(Sense::drag()));
        if handle.hovered() || is_dragged {
            ui.ctx().set_cursor_icon(if is_dragged {
                CursorIcon::Grabbing
            } else {
                CursorIcon::Grab
            });
        }
        if handle.drag_started() {
            let pointer_y = handle
                .interact_pointer_pos()
                .map_or(handle.rect.center().y, |p| p.y);
            drag.request_drag(index, pointer_y);
        }

        let mut done = todo.done;
        if ui.checkbox(&mut done, "").changed() {
            actions.push(ListAction::Toggle(todo.id));
        }

        let (dot, _) = ui.allocate_exact_size(vec2(8.0, 8.0), Sense::hover());
        ui.painter()
            .circle_filled(dot.center(), 4.0, priority_color(todo.priority));

        let title = if todo.done {
            RichText::new(&todo.title).strikethrough().weak()
        } else {
            RichText::new(&todo.title)
        };
        ui.label(title);

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.small_button("🗑").clicked() {
                if state.edit.as_ref().is_some_and(|e| e.id == todo.id) {
                    state.edit = None;
                }
                actions.push(ListAction::Delete(todo.id));
            }
            if ui.small_button("✏").clicked() {
                state.edit = Some(EditForm::for_todo(todo));
            }
            let expand_label = if state.expanded.contains(&todo.id) {
                "⏷"
            } else {
                "⏵"
            };
            if ui.small_button(expand_label).clicked() && !state.expanded.remove(&todo.id) {
                state.expanded.insert(todo.id);
            }
        });
    });

    meta_line(ui, todo, store);

    if state.expanded.contains(&todo.id) {
        subtask_section(ui, todo, state, actions);
    }
}

fn meta_line(ui: &mut egui::Ui, todo: &Todo, store: &TodoStore) {
    ui.horizontal(|ui| {
        ui.add_space(22.0);
        if let Some(due) = todo.due_date {
            let overdue = !todo.done && due < chrono::Local::now().date_naive();
            let text = RichText::new(due.format("%b %d").to_string()).small();
            if overdue {
                ui.colored_label(ui.visuals().error_fg_color, text);
            } else {
                ui.label(text.weak());
            }
        }
        if let Some(category) = todo.category_id.and_then(|id| store.category(id)) {
            let (dot, _) = ui.allocate_exact_size(vec2(8.0, 8.0), Sense::hover());
            ui.painter()
                .circle_filled(dot.center(), 4.0, parse_hex_color(&category.color));
            ui.label(RichText::new(&category.name).small().weak());
        }
        if !todo.subtasks.is_empty() {
            ui.label(
                RichText::new(format!("{}/{}", todo.subtasks_done(), todo.subtasks.len()))
                    .small()
                    .weak(),
            );
        }
    });
}

fn subtask_section(
    ui: &mut egui::Ui,
    todo: &Todo,
    state: &mut ListState,
    actions: &mut Vec<ListAction>,
) {
    for subtask in &todo.subtasks {
        ui.horizontal(|ui| {
            ui.add_space(24.0);
            let mut done = subtask.done;
            let text = if subtask.done {
                RichText::new(&subtask.title).small().strikethrough().weak()
            } else {
                RichText::new(&subtask.title).small()
            };
            if ui.checkbox(&mut done, text).changed() {
                actions.push(ListAction::ToggleSubtask(subtask.id));
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.small_button("✕").clicked() {
                    actions.push(ListAction::DeleteSubtask(subtask.id));
                }
            });
        });
    }

    ui.horizontal(|ui| {
        ui.add_space(24.0);
        let draft = state.subtask_drafts.entry(todo.id).or_default();
        let response = ui.add(
            TextEdit::singleline(draft)
                .hint_text("Add subtask")
                .desired_width(160.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
        if (submitted || ui.small_button("＋").clicked()) && !draft.trim().is_empty() {
            actions.push(ListAction::AddSubtask(todo.id, draft.trim().to_owned()));
            draft.clear();
        }
    });
}

fn edit_row(
    ui: &mut egui::Ui,
    store: &TodoStore,
    state: &mut ListState,
    actions: &mut Vec<ListAction>,
) {
    let Some(edit) = state.edit.as_mut() else {
        return;
    };
    let submitted_by_enter = edit.fields.show(ui, store.categories());
    let mut outcome: Option<bool> = if submitted_by_enter { Some(true) } else { None };
    ui.horizontal(|ui| {
        if ui.button("Save").clicked() {
            outcome = Some(true);
        }
        if ui.button("Cancel").clicked() {
            outcome = Some(false);
        }
    });

    if let Some(save) = outcome {
        if save && !edit.fields.title.trim().is_empty() {
            actions.push(ListAction::SaveEdit {
                id: edit.id,
                title: edit.fields.title.trim().to_owned(),
                priority: edit.fields.priority,
                category_id: edit.fields.category_id,
                due_date: edit.fields.parsed_due_date(),
            });
        }
        state.edit = None;
    }
}

fn priority_color(priority: Priority) -> Color32 {
    match priority {
        Priority::Low => Color32::from_rgb(0x10, 0xb9, 0x81),
        Priority::Medium => Color32::from_rgb(0xf5, 0x9e, 0x0b),
        Priority::High => Color32::from_rgb(0xef, 0x44, 0x44),
    }
}
