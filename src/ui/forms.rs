//! Form state for adding and editing todos, and the category manager.
//!
//! These are plain state structs driven from the app each frame; they emit
//! their result once (submit/cancel) and the app applies it to the store.

use egui::{Color32, ComboBox, TextEdit, Ui};

use crate::model::{Category, CategoryId, Priority, Todo, TodoId};

/// Shared field set for the add form and the inline edit form.
#[derive(Clone, Debug, Default)]
pub struct TodoFields {
    pub title: String,
    pub priority: Priority,
    pub category_id: Option<CategoryId>,
    /// Free-text due date, parsed as `YYYY-MM-DD` on submit; anything else
    /// means "no due date".
    pub due_date: String,
}

impl TodoFields {
    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            priority: todo.priority,
            category_id: todo.category_id,
            due_date: todo
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }

    pub fn parsed_due_date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d").ok()
    }

    /// Render the shared fields. Returns true when the title field
    /// submitted (Enter).
    pub fn show(&mut self, ui: &mut Ui, categories: &[Category]) -> bool {
        let title_response = ui.add(
            TextEdit::singleline(&mut self.title)
                .hint_text("What needs doing?")
                .desired_width(f32::INFINITY),
        );
        let submitted = title_response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        ui.horizontal(|ui| {
            ComboBox::from_id_salt(ui.id().with("priority"))
                .selected_text(self.priority.label())
                .width(64.0)
                .show_ui(ui, |ui| {
                    for priority in Priority::ALL {
                        ui.selectable_value(&mut self.priority, priority, priority.label());
                    }
                });

            let selected_name = self
                .category_id
                .and_then(|id| categories.iter().find(|c| c.id == id))
                .map_or("No category", |c| c.name.as_str());
            ComboBox::from_id_salt(ui.id().with("category"))
                .selected_text(selected_name)
                .width(110.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.category_id, None, "No category");
                    for category in categories {
                        ui.selectable_value(
                            &mut self.category_id,
                            Some(category.id),
                            &category.name,
                        );
                    }
                });

            ui.add(
                TextEdit::singleline(&mut self.due_date)
                    .hint_text("YYYY-MM-DD")
                    .desired_width(90.0),
            );
        });

        submitted
    }
}

/// The "new todo" form at the bottom of the window.
#[derive(Debug, Default)]
pub struct AddForm {
    pub open: bool,
    pub fields: TodoFields,
}

pub struct NewTodo {
    pub title: String,
    pub priority: Priority,
    pub category_id: Option<CategoryId>,
    pub due_date: Option<chrono::NaiveDate>,
}

impl AddForm {
    /// Returns the submitted todo, if any. Closing the form discards it.
    pub fn show(&mut self, ui: &mut Ui, categories: &[Category]) -> Option<NewTodo> {
        if !self.open {
            if ui.button("➕ Add todo").clicked() {
                self.open = true;
            }
            return None;
        }

        let submitted_by_enter = self.fields.show(ui, categories);
        let mut submitted = submitted_by_enter;
        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                submitted = true;
            }
            if ui.button("Cancel").clicked() {
                self.open = false;
                self.fields = TodoFields::default();
            }
        });

        if !submitted || self.fields.title.trim().is_empty() {
            return None;
        }
        let new = NewTodo {
            title: self.fields.title.trim().to_owned(),
            priority: self.fields.priority,
            category_id: self.fields.category_id,
            due_date: self.fields.parsed_due_date(),
        };
        self.fields = TodoFields::default();
        self.open = false;
        Some(new)
    }
}

/// Inline edit state for one row.
#[derive(Clone, Debug)]
pub struct EditForm {
    pub id: TodoId,
    pub fields: TodoFields,
}

impl EditForm {
    pub fn for_todo(todo: &Todo) -> Self {
        Self {
            id: todo.id,
            fields: TodoFields::from_todo(todo),
        }
    }
}

#[derive(Debug)]
pub enum CategoryAction {
    Add { name: String, color: String },
    Delete(CategoryId),
}

/// Contents of the floating category manager window.
#[derive(Debug)]
pub struct CategoryManager {
    pub open: bool,
    name: String,
    color: Color32,
}

impl Default for CategoryManager {
    fn default() -> Self {
        Self {
            open: false,
            name: String::new(),
            // Schema default color.
            color: Color32::from_rgb(0x63, 0x66, 0xf1),
        }
    }
}

impl CategoryManager {
    pub fn show(&mut self, ui: &mut Ui, categories: &[Category]) -> Vec<CategoryAction> {
        let mut actions = Vec::new();

        for category in categories {
            ui.horizontal(|ui| {
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                ui.painter()
                    .circle_filled(rect.center(), 5.0, parse_hex_color(&category.color));
                ui.label(&category.name);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").clicked() {
                        actions.push(CategoryAction::Delete(category.id));
                    }
                });
            });
        }
        if !categories.is_empty() {
            ui.separator();
        }

        ui.horizontal(|ui| {
            ui.color_edit_button_srgba(&mut self.color);
            ui.add(
                TextEdit::singleline(&mut self.name)
                    .hint_text("New category")
                    .desired_width(120.0),
            );
            if ui.button("Add").clicked() && !self.name.trim().is_empty() {
                actions.push(CategoryAction::Add {
                    name: self.name.trim().to_owned(),
                    color: hex_color(self.color),
                });
                self.name.clear();
            }
        });

        actions
    }
}

pub fn parse_hex_color(hex: &str) -> Color32 {
    let hex = hex.trim_start_matches('#');
    let parse = |range: std::ops::Range<usize>| {
        hex.get(range).and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    match (parse(0..2), parse(2..4), parse(4..6)) {
        (Some(r), Some(g), Some(b)) => Color32::from_rgb(r, g, b),
        _ => Color32::GRAY,
    }
}

pub fn hex_color(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_round_trips() {
        let color = Color32::from_rgb(0x63, 0x66, 0xf1);
        assert_eq!(parse_hex_color(&hex_color(color)), color);
        assert_eq!(parse_hex_color("#ff0000"), Color32::from_rgb(255, 0, 0));
        // Malformed input degrades to a neutral color instead of failing.
        assert_eq!(parse_hex_color("nope"), Color32::GRAY);
        assert_eq!(parse_hex_color("#abc"), Color32::GRAY);
    }

    #[test]
    fn due_date_parsing_is_forgiving() {
        let mut fields = TodoFields::default();
        fields.due_date = " 2026-03-14 ".to_owned();
        assert_eq!(
            fields.parsed_due_date(),
            chrono::NaiveDate::from_ymd_opt(2026, 3, 14)
        );
        fields.due_date = "next tuesday".to_owned();
        assert_eq!(fields.parsed_due_date(), None);
    }
}
