//! Application shell: frameless window chrome, toolbar, the list itself,
//! and the compact always-on-top "bubble" the window can collapse into.

use egui::{
    Align, Align2, CentralPanel, Color32, Context, FontId, Frame, Layout, PointerButton, RichText,
    ScrollArea, Sense, TextEdit, TopBottomPanel, UiBuilder, ViewportCommand, WindowLevel, vec2,
};

use crate::model::StatusFilter;
use crate::reorder::ListDrag;
use crate::storage::{Database, StorageError, StorageHandle};
use crate::store::TodoStore;
use crate::ui::forms::{AddForm, CategoryAction, CategoryManager};
use crate::ui::list::{self, ListAction, ListState};

const FULL_SIZE: egui::Vec2 = egui::Vec2::new(380.0, 560.0);
const BUBBLE_SIZE: egui::Vec2 = egui::Vec2::new(72.0, 72.0);
const TITLEBAR_HEIGHT: f32 = 28.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WindowMode {
    Full,
    /// Collapsed to a small always-on-top circle showing the active count.
    /// A click restores the full window; a drag moves it.
    Bubble,
}

pub struct QuickdoApp {
    store: TodoStore,
    drag: ListDrag,
    mode: WindowMode,
    list: ListState,
    add_form: AddForm,
    category_manager: CategoryManager,
}

impl QuickdoApp {
    /// Opens (and migrates) the database, loads state, and hands the
    /// connection off to the storage worker.
    pub fn new() -> Result<Self, StorageError> {
        let db = Database::open_default()?;
        let (todos, categories) = db.load_all()?;
        log::info!("loaded {} todos, {} categories", todos.len(), categories.len());
        let handle = StorageHandle::spawn(db);
        Ok(Self {
            store: TodoStore::new(handle, todos, categories),
            drag: ListDrag::new("todo_list"),
            mode: WindowMode::Full,
            list: ListState::default(),
            add_form: AddForm::default(),
            category_manager: CategoryManager::default(),
        })
    }

    #[cfg(test)]
    fn with_store(store: TodoStore) -> Self {
        Self {
            store,
            drag: ListDrag::new("todo_list"),
            mode: WindowMode::Full,
            list: ListState::default(),
            add_form: AddForm::default(),
            category_manager: CategoryManager::default(),
        }
    }

    fn enter_bubble(&mut self, ctx: &Context) {
        self.mode = WindowMode::Bubble;
        ctx.send_viewport_cmd(ViewportCommand::InnerSize(BUBBLE_SIZE));
        ctx.send_viewport_cmd(ViewportCommand::WindowLevel(WindowLevel::AlwaysOnTop));
    }

    fn leave_bubble(&mut self, ctx: &Context) {
        self.mode = WindowMode::Full;
        ctx.send_viewport_cmd(ViewportCommand::InnerSize(FULL_SIZE));
        ctx.send_viewport_cmd(ViewportCommand::WindowLevel(WindowLevel::Normal));
    }

    // ------------------------------------------------------------------
    // Full window

    fn show_full(&mut self, ctx: &Context) {
        TopBottomPanel::top("titlebar").show(ctx, |ui| self.titlebar(ui));

        if let Some(message) = self.store.last_error().map(str::to_owned) {
            TopBottomPanel::top("error_banner").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(ui.visuals().error_fg_color, message);
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.small_button("Dismiss").clicked() {
                            self.store.dismiss_error();
                        }
                    });
                });
            });
        }

        TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        TopBottomPanel::bottom("add_form").show(ctx, |ui| {
            ui.add_space(4.0);
            if let Some(new) = self.add_form.show(ui, self.store.categories()) {
                self.store
                    .add(new.title, new.priority, new.category_id, new.due_date);
            }
            ui.add_space(4.0);
        });

        CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let actions = list::show(ui, &self.store, &mut self.drag, &mut self.list);
                    for action in actions {
                        self.apply_list_action(action);
                    }
                });
        });

        if self.category_manager.open {
            let mut open = true;
            egui::Window::new("Categories")
                .open(&mut open)
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    for action in self.category_manager.show(ui, self.store.categories()) {
                        match action {
                            CategoryAction::Add { name, color } => {
                                self.store.add_category(name, color);
                            }
                            CategoryAction::Delete(id) => self.store.delete_category(id),
                        }
                    }
                });
            self.category_manager.open = open;
        }

        // After the rows have painted: move the dragged layer, resolve the
        // target, and land any finished gesture in the store.
        if let Some(commit) = self.drag.update(ctx) {
            self.store.commit_reorder(commit);
        }
    }

    fn titlebar(&mut self, ui: &mut egui::Ui) {
        let (_, bar_rect) = ui.allocate_space(vec2(ui.available_width(), TITLEBAR_HEIGHT));
        let response = ui.interact(bar_rect, ui.id().with("drag_region"), Sense::click_and_drag());
        if response.drag_started_by(PointerButton::Primary) {
            ui.ctx().send_viewport_cmd(ViewportCommand::StartDrag);
        }

        let mut bar = ui.new_child(
            UiBuilder::new()
                .max_rect(bar_rect)
                .layout(Layout::left_to_right(Align::Center)),
        );
        bar.label(RichText::new("quickdo").strong());
        bar.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.small_button("✕").clicked() {
                ui.ctx().send_viewport_cmd(ViewportCommand::Close);
            }
            if ui.small_button("◎").on_hover_text("Collapse to bubble").clicked() {
                self.enter_bubble(ui.ctx());
            }
            if ui.small_button("🏷").on_hover_text("Categories").clicked() {
                self.category_manager.open = !self.category_manager.open;
            }
        });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.add(
            TextEdit::singleline(&mut self.store.search_query)
                .hint_text("🔍 Search")
                .desired_width(f32::INFINITY),
        );
        ui.horizontal(|ui| {
            for filter in StatusFilter::ALL {
                if ui
                    .selectable_label(self.store.filter == filter, filter.label())
                    .clicked()
                {
                    self.store.filter = filter;
                }
            }

            ui.separator();

            let selected = self
                .store
                .selected_category
                .and_then(|id| self.store.category(id))
                .map_or("All categories".to_owned(), |c| c.name.clone());
            let mut choice = self.store.selected_category;
            egui::ComboBox::from_id_salt("category_filter")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut choice, None, "All categories");
                    for category in self.store.categories() {
                        ui.selectable_value(&mut choice, Some(category.id), &category.name);
                    }
                });
            self.store.selected_category = choice;
        });
        ui.add_space(4.0);
    }

    fn apply_list_action(&mut self, action: ListAction) {
        match action {
            ListAction::Toggle(id) => self.store.toggle(id),
            ListAction::Delete(id) => self.store.delete(id),
            ListAction::SaveEdit {
                id,
                title,
                priority,
                category_id,
                due_date,
            } => self.store.update(id, title, priority, category_id, due_date),
            ListAction::AddSubtask(todo_id, title) => self.store.add_subtask(todo_id, title),
            ListAction::ToggleSubtask(id) => self.store.toggle_subtask(id),
            ListAction::DeleteSubtask(id) => self.store.delete_subtask(id),
        }
    }

    // ------------------------------------------------------------------
    // Bubble

    fn show_bubble(&mut self, ctx: &Context) {
        CentralPanel::default().frame(Frame::NONE).show(ctx, |ui| {
            let rect = ui.max_rect();
            let response = ui.interact(rect, ui.id().with("bubble"), Sense::click_and_drag());
            if response.drag_started_by(PointerButton::Primary) {
                ui.ctx().send_viewport_cmd(ViewportCommand::StartDrag);
            } else if response.clicked() {
                self.leave_bubble(ctx);
            }

            let radius = rect.width().min(rect.height()) / 2.0 - 4.0;
            let accent = ui.visuals().selection.bg_fill;
            ui.painter().circle_filled(rect.center(), radius, accent);
            ui.painter().text(
                rect.center(),
                Align2::CENTER_CENTER,
                self.store.active_count().to_string(),
                FontId::proportional(22.0),
                Color32::WHITE,
            );
        });
    }
}

impl eframe::App for QuickdoApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.store.poll();
        match self.mode {
            WindowMode::Full => self.show_full(ctx),
            WindowMode::Bubble => self.show_bubble(ctx),
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        // Transparent clear so the bubble renders as a bare circle.
        [0.0, 0.0, 0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TodoId};
    use crate::storage::{Job, JobEnvelope};

    fn app() -> (QuickdoApp, std::sync::mpsc::Receiver<JobEnvelope>) {
        let (jobs_tx, jobs_rx) = std::sync::mpsc::channel();
        let (_events_tx, events_rx) = std::sync::mpsc::channel();
        let handle = StorageHandle::from_channels(jobs_tx, events_rx);
        let store = TodoStore::new(handle, Vec::new(), Vec::new());
        (QuickdoApp::with_store(store), jobs_rx)
    }

    #[test]
    fn list_actions_route_to_the_store() {
        let (mut app, jobs) = app();
        app.store
            .add("buy milk".to_owned(), Priority::High, None, None);
        app.apply_list_action(ListAction::Toggle(TodoId(1)));
        app.apply_list_action(ListAction::AddSubtask(TodoId(1), "oat".to_owned()));
        app.apply_list_action(ListAction::Delete(TodoId(1)));

        let kinds: Vec<&str> = jobs.try_iter().map(|e| e.job.kind()).collect();
        assert_eq!(
            kinds,
            vec!["insert_todo", "set_todo_done", "insert_subtask", "delete_todo"]
        );
        assert!(app.store.todos().is_empty());
    }

    #[test]
    fn save_edit_updates_all_fields() {
        let (mut app, jobs) = app();
        app.store
            .add("draft".to_owned(), Priority::Low, None, None);
        app.apply_list_action(ListAction::SaveEdit {
            id: TodoId(1),
            title: "final".to_owned(),
            priority: Priority::High,
            category_id: None,
            due_date: chrono::NaiveDate::from_ymd_opt(2026, 9, 1),
        });

        let todo = &app.store.todos()[0];
        assert_eq!(todo.title, "final");
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.due_date, chrono::NaiveDate::from_ymd_opt(2026, 9, 1));
        assert!(matches!(
            jobs.try_iter().last().map(|e| e.job),
            Some(Job::UpdateTodo(_))
        ));
    }
}
