//! The list's source of truth.
//!
//! `TodoStore` exclusively owns the canonical order. Every mutation is
//! optimistic: applied to in-memory state synchronously, persisted through
//! the background worker, reconciled on failure. There is one generic
//! discipline rather than one per operation:
//!
//! - before mutating, capture a rollback strategy — either the exact
//!   pre-mutation snapshot, or "reload from storage" for reorders, where a
//!   partially applied batch makes any in-memory guess unsafe;
//! - tag the persistence job with the store's mutation sequence at capture
//!   time;
//! - on a failure event, restore the snapshot only if no later optimistic
//!   mutation has been applied since (and no reload has replaced the state);
//!   otherwise the snapshot is stale and the store reloads canonical truth
//!   instead. A rollback can therefore never resurrect superseded state.

use chrono::{NaiveDate, Utc};

use crate::model::{
    Category, CategoryId, Priority, StatusFilter, Subtask, SubtaskId, Todo, TodoId,
};
use crate::reorder::ReorderCommit;
use crate::storage::{Event, Job, StorageHandle};

#[derive(Clone, Debug)]
struct Snapshot {
    todos: Vec<Todo>,
    categories: Vec<Category>,
}

#[derive(Debug)]
struct Pending {
    /// `None`: reconcile by reloading canonical state (reorder path, or a
    /// snapshot invalidated by a reload that happened after capture).
    snapshot: Option<Snapshot>,
}

#[derive(Clone, Copy, Debug)]
enum Rollback {
    RestoreSnapshot,
    Reload,
}

#[derive(Debug)]
pub struct TodoStore {
    todos: Vec<Todo>,
    categories: Vec<Category>,
    handle: StorageHandle,

    mutation_seq: u64,
    pending: ahash::HashMap<u64, Pending>,
    error: Option<String>,

    next_todo_id: i64,
    next_subtask_id: i64,
    next_category_id: i64,

    pub filter: StatusFilter,
    pub search_query: String,
    pub selected_category: Option<CategoryId>,
}

impl TodoStore {
    pub fn new(handle: StorageHandle, mut todos: Vec<Todo>, categories: Vec<Category>) -> Self {
        todos.sort_by_key(Todo::order_key);
        let mut store = Self {
            todos,
            categories,
            handle,
            mutation_seq: 0,
            pending: ahash::HashMap::default(),
            error: None,
            next_todo_id: 1,
            next_subtask_id: 1,
            next_category_id: 1,
            filter: StatusFilter::default(),
            search_query: String::new(),
            selected_category: None,
        };
        store.seed_id_counters();
        store
    }

    fn seed_id_counters(&mut self) {
        let max_todo = self.todos.iter().map(|t| t.id.0).max().unwrap_or(0);
        let max_subtask = self
            .todos
            .iter()
            .flat_map(|t| t.subtasks.iter())
            .map(|s| s.id.0)
            .max()
            .unwrap_or(0);
        let max_category = self.categories.iter().map(|c| c.id.0).max().unwrap_or(0);
        // Counters only ever move forward, even across a reload.
        self.next_todo_id = self.next_todo_id.max(max_todo + 1);
        self.next_subtask_id = self.next_subtask_id.max(max_subtask + 1);
        self.next_category_id = self.next_category_id.max(max_category + 1);
    }

    // ------------------------------------------------------------------
    // Reads

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|t| !t.done).count()
    }

    /// The render sequence: canonical order filtered by status tab,
    /// selected category, and the case-insensitive search query. Render
    /// positions index into *this*, not into [`Self::todos`].
    pub fn visible(&self) -> Vec<&Todo> {
        let query = self.search_query.trim().to_lowercase();
        self.todos
            .iter()
            .filter(|t| self.filter.matches(t))
            .filter(|t| match self.selected_category {
                Some(category) => t.category_id == Some(category),
                None => true,
            })
            .filter(|t| query.is_empty() || t.title.to_lowercase().contains(&query))
            .collect()
    }

    pub fn storage_index_of(&self, id: TodoId) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // ------------------------------------------------------------------
    // The one optimistic discipline

    fn apply(&mut self, rollback: Rollback, mutate: impl FnOnce(&mut Self) -> Job) {
        let snapshot = match rollback {
            Rollback::RestoreSnapshot => Some(Snapshot {
                todos: self.todos.clone(),
                categories: self.categories.clone(),
            }),
            Rollback::Reload => None,
        };

        let job = mutate(self);

        self.mutation_seq += 1;
        self.pending.insert(self.mutation_seq, Pending { snapshot });
        self.handle.submit(self.mutation_seq, job);
    }

    fn request_reload(&self) {
        // Reload is queued behind every in-flight write, so it reads truth.
        self.handle.submit(0, Job::Reload);
    }

    /// Drain worker events. Call once per frame; the store's state only ever
    /// changes on the UI thread, inside mutating calls or here.
    pub fn poll(&mut self) {
        while let Some(event) = self.handle.try_event() {
            match event {
                Event::Completed { seq } => {
                    self.pending.remove(&seq);
                    self.error = None;
                }
                Event::Failed { seq, kind, error } => {
                    log::error!("persistence failed for {kind} (seq {seq}): {error}");
                    self.error = Some(error);
                    let snapshot = self.pending.remove(&seq).and_then(|p| p.snapshot);
                    match snapshot {
                        Some(snapshot) if self.mutation_seq == seq => {
                            self.todos = snapshot.todos;
                            self.categories = snapshot.categories;
                        }
                        _ => self.request_reload(),
                    }
                }
                Event::Reloaded { mut todos, categories } => {
                    todos.sort_by_key(Todo::order_key);
                    self.todos = todos;
                    self.categories = categories;
                    self.seed_id_counters();
                    // Snapshots captured before this point no longer
                    // describe the store; push later failures onto the
                    // reload path instead of restoring them.
                    for pending in self.pending.values_mut() {
                        pending.snapshot = None;
                    }
                }
                Event::ReloadFailed { error } => {
                    self.error = Some(error);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Reordering (storage-position space)

    /// Move the item at `from` to `to` in canonical order. The in-memory
    /// order and the dense `sort_order` values change synchronously; the
    /// full `(id, sort_order)` batch persists in the background. On failure
    /// the store discards its guess and refetches — a partial write of N
    /// updates may have partially succeeded, so only a fresh read is safe.
    pub fn reorder(&mut self, from: usize, to: usize) {
        let len = self.todos.len();
        if from == to || from >= len || to >= len {
            return;
        }
        self.apply(Rollback::Reload, |store| {
            let item = store.todos.remove(from);
            store.todos.insert(to, item);
            for (position, todo) in store.todos.iter_mut().enumerate() {
                todo.sort_order = position as i64 + 1;
            }
            Job::PersistOrder(store.todos.iter().map(|t| (t.id, t.sort_order)).collect())
        });
    }

    /// Commit a drag gesture: translate the gesture's stable ids back to
    /// storage positions. Render positions never reach this point, because
    /// an active filter or search can make them diverge from storage
    /// positions.
    pub fn commit_reorder(&mut self, commit: ReorderCommit) {
        let Some(from) = self.storage_index_of(commit.moved) else {
            return;
        };
        let Some(to) = self.storage_index_of(commit.displaced) else {
            return;
        };
        self.reorder(from, to);
    }

    // ------------------------------------------------------------------
    // Todo CRUD

    pub fn add(
        &mut self,
        title: String,
        priority: Priority,
        category_id: Option<CategoryId>,
        due_date: Option<NaiveDate>,
    ) {
        let title = title.trim().to_owned();
        if title.is_empty() {
            return;
        }
        let id = TodoId(self.next_todo_id);
        self.next_todo_id += 1;
        let sort_order = self.todos.iter().map(|t| t.sort_order).max().unwrap_or(0) + 1;
        let todo = Todo {
            id,
            title,
            done: false,
            priority,
            category_id,
            due_date,
            sort_order,
            created_at: Utc::now(),
            subtasks: Vec::new(),
        };
        self.apply(Rollback::RestoreSnapshot, move |store| {
            store.todos.push(todo.clone());
            Job::InsertTodo(todo)
        });
    }

    pub fn update(
        &mut self,
        id: TodoId,
        title: String,
        priority: Priority,
        category_id: Option<CategoryId>,
        due_date: Option<NaiveDate>,
    ) {
        if self.storage_index_of(id).is_none() {
            return;
        }
        self.apply(Rollback::RestoreSnapshot, move |store| {
            let mut updated = None;
            if let Some(todo) = store.todos.iter_mut().find(|t| t.id == id) {
                todo.title = title;
                todo.priority = priority;
                todo.category_id = category_id;
                todo.due_date = due_date;
                updated = Some(todo.clone());
            }
            // Existence was checked above; the unwrap_or keeps this total.
            Job::UpdateTodo(updated.unwrap_or_else(|| placeholder_todo(id)))
        });
    }

    pub fn toggle(&mut self, id: TodoId) {
        let Some(index) = self.storage_index_of(id) else {
            return;
        };
        let done = !self.todos[index].done;
        self.apply(Rollback::RestoreSnapshot, move |store| {
            if let Some(todo) = store.todos.iter_mut().find(|t| t.id == id) {
                todo.done = done;
            }
            Job::SetTodoDone(id, done)
        });
    }

    pub fn delete(&mut self, id: TodoId) {
        if self.storage_index_of(id).is_none() {
            return;
        }
        self.apply(Rollback::RestoreSnapshot, move |store| {
            store.todos.retain(|t| t.id != id);
            Job::DeleteTodo(id)
        });
    }

    // ------------------------------------------------------------------
    // Subtasks

    pub fn add_subtask(&mut self, todo_id: TodoId, title: String) {
        let title = title.trim().to_owned();
        if title.is_empty() || self.storage_index_of(todo_id).is_none() {
            return;
        }
        let id = SubtaskId(self.next_subtask_id);
        self.next_subtask_id += 1;
        self.apply(Rollback::RestoreSnapshot, move |store| {
            let mut subtask = Subtask {
                id,
                todo_id,
                title,
                done: false,
                sort_order: 1,
                created_at: Utc::now(),
            };
            if let Some(todo) = store.todos.iter_mut().find(|t| t.id == todo_id) {
                subtask.sort_order =
                    todo.subtasks.iter().map(|s| s.sort_order).max().unwrap_or(0) + 1;
                todo.subtasks.push(subtask.clone());
            }
            Job::InsertSubtask(subtask)
        });
    }

    pub fn toggle_subtask(&mut self, id: SubtaskId) {
        let Some(done) = self
            .todos
            .iter()
            .flat_map(|t| t.subtasks.iter())
            .find(|s| s.id == id)
            .map(|s| !s.done)
        else {
            return;
        };
        self.apply(Rollback::RestoreSnapshot, move |store| {
            for todo in &mut store.todos {
                if let Some(subtask) = todo.subtasks.iter_mut().find(|s| s.id == id) {
                    subtask.done = done;
                }
            }
            Job::SetSubtaskDone(id, done)
        });
    }

    pub fn delete_subtask(&mut self, id: SubtaskId) {
        let exists = self
            .todos
            .iter()
            .flat_map(|t| t.subtasks.iter())
            .any(|s| s.id == id);
        if !exists {
            return;
        }
        self.apply(Rollback::RestoreSnapshot, move |store| {
            for todo in &mut store.todos {
                todo.subtasks.retain(|s| s.id != id);
            }
            Job::DeleteSubtask(id)
        });
    }

    // ------------------------------------------------------------------
    // Categories

    pub fn add_category(&mut self, name: String, color: String) {
        let name = name.trim().to_owned();
        if name.is_empty() || self.categories.iter().any(|c| c.name == name) {
            return;
        }
        let id = CategoryId(self.next_category_id);
        self.next_category_id += 1;
        let category = Category { id, name, color };
        self.apply(Rollback::RestoreSnapshot, move |store| {
            store.categories.push(category.clone());
            store.categories.sort_by(|a, b| a.name.cmp(&b.name));
            Job::InsertCategory(category)
        });
    }

    /// Deleting a category detaches its todos (they keep existing with no
    /// category), mirroring the storage layer's behavior.
    pub fn delete_category(&mut self, id: CategoryId) {
        if self.category(id).is_none() {
            return;
        }
        if self.selected_category == Some(id) {
            self.selected_category = None;
        }
        self.apply(Rollback::RestoreSnapshot, move |store| {
            store.categories.retain(|c| c.id != id);
            for todo in &mut store.todos {
                if todo.category_id == Some(id) {
                    todo.category_id = None;
                }
            }
            Job::DeleteCategory(id)
        });
    }
}

/// Only reachable if a todo disappears between the existence check and the
/// mutation closure, which cannot happen on the single UI thread; keeps
/// [`TodoStore::update`] free of panics regardless.
fn placeholder_todo(id: TodoId) -> Todo {
    Todo {
        id,
        title: String::new(),
        done: false,
        priority: Priority::default(),
        category_id: None,
        due_date: None,
        sort_order: 0,
        created_at: Utc::now(),
        subtasks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::worker::JobEnvelope;
    use std::sync::mpsc::{Receiver, Sender, channel};

    struct Harness {
        store: TodoStore,
        jobs: Receiver<JobEnvelope>,
        events: Sender<Event>,
    }

    fn sample_todo(id: i64, title: &str, sort_order: i64) -> Todo {
        Todo {
            id: TodoId(id),
            title: title.to_owned(),
            done: false,
            priority: Priority::Medium,
            category_id: None,
            due_date: None,
            sort_order,
            created_at: Utc::now(),
            subtasks: Vec::new(),
        }
    }

    fn harness(todos: Vec<Todo>) -> Harness {
        let (job_tx, job_rx) = channel();
        let (event_tx, event_rx) = channel();
        let handle = StorageHandle::from_channels(job_tx, event_rx);
        Harness {
            store: TodoStore::new(handle, todos, Vec::new()),
            jobs: job_rx,
            events: event_tx,
        }
    }

    fn abc() -> Vec<Todo> {
        vec![
            sample_todo(1, "A", 1),
            sample_todo(2, "B", 2),
            sample_todo(3, "C", 3),
        ]
    }

    fn titles(store: &TodoStore) -> Vec<&str> {
        store.todos().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn reorder_is_applied_synchronously_with_dense_sort_orders() {
        let mut h = harness(abc());
        h.store.reorder(0, 2);

        assert_eq!(titles(&h.store), vec!["B", "C", "A"]);
        let orders: Vec<i64> = h.store.todos().iter().map(|t| t.sort_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);

        let envelope = h.jobs.try_recv().unwrap();
        match envelope.job {
            Job::PersistOrder(pairs) => {
                assert_eq!(pairs, vec![(TodoId(2), 1), (TodoId(3), 2), (TodoId(1), 3)]);
            }
            other => panic!("unexpected job: {other:?}"),
        }
    }

    #[test]
    fn reorder_round_trip_restores_original_order() {
        let mut h = harness(abc());
        h.store.reorder(0, 2);
        // A now sits at index 2; moving it back to index 0 undoes the move.
        let from = h.store.storage_index_of(TodoId(1)).unwrap();
        h.store.reorder(from, 0);
        assert_eq!(titles(&h.store), vec!["A", "B", "C"]);
    }

    #[test]
    fn reorder_failure_reloads_canonical_order() {
        let mut h = harness(abc());
        let original = h.store.todos().to_vec();
        h.store.reorder(0, 2);
        assert_eq!(titles(&h.store), vec!["B", "C", "A"]);

        // Persistence fails: the store must ask storage for truth rather
        // than attempt a partial rollback.
        h.events
            .send(Event::Failed {
                seq: 1,
                kind: "persist_order",
                error: "disk full".to_owned(),
            })
            .unwrap();
        h.store.poll();
        assert!(h.store.last_error().is_some());

        let envelope = h.jobs.iter().nth(1).unwrap();
        assert!(matches!(envelope.job, Job::Reload));

        h.events
            .send(Event::Reloaded {
                todos: original.clone(),
                categories: Vec::new(),
            })
            .unwrap();
        h.store.poll();
        assert_eq!(h.store.todos(), &original[..]);
    }

    #[test]
    fn failed_mutation_restores_the_exact_pre_mutation_snapshot() {
        let mut h = harness(abc());
        let before = h.store.todos().to_vec();

        h.store.toggle(TodoId(2));
        assert!(h.store.todos()[1].done);

        h.events
            .send(Event::Failed {
                seq: 1,
                kind: "set_todo_done",
                error: "db locked".to_owned(),
            })
            .unwrap();
        h.store.poll();

        assert_eq!(h.store.todos(), &before[..]);
        assert_eq!(h.store.last_error(), Some("db locked"));
        // No reload was requested: the snapshot was still current.
        assert!(h.jobs.try_recv().unwrap().seq == 1 && h.jobs.try_recv().is_err());
    }

    #[test]
    fn stale_snapshot_never_resurrects_superseded_state() {
        let mut h = harness(abc());
        h.store.toggle(TodoId(2)); // seq 1
        h.store.delete(TodoId(3)); // seq 2 supersedes seq 1's snapshot

        h.events
            .send(Event::Failed {
                seq: 1,
                kind: "set_todo_done",
                error: "db locked".to_owned(),
            })
            .unwrap();
        h.store.poll();

        // Restoring seq 1's snapshot would bring C back; instead the store
        // reloads.
        assert_eq!(titles(&h.store), vec!["A", "B"]);
        let kinds: Vec<&'static str> = h.jobs.try_iter().map(|e| e.job.kind()).collect();
        assert_eq!(kinds, vec!["set_todo_done", "delete_todo", "reload"]);
    }

    #[test]
    fn snapshots_are_invalidated_by_a_reload() {
        let mut h = harness(abc());
        h.store.toggle(TodoId(1)); // seq 1
        h.store.toggle(TodoId(2)); // seq 2

        // seq 1 fails; seq 2's snapshot (which still contains seq 1's
        // optimistic flip) must not be restored after the reload below.
        h.events
            .send(Event::Failed {
                seq: 1,
                kind: "set_todo_done",
                error: "oops".to_owned(),
            })
            .unwrap();
        h.events
            .send(Event::Reloaded {
                todos: abc(),
                categories: Vec::new(),
            })
            .unwrap();
        h.events
            .send(Event::Failed {
                seq: 2,
                kind: "set_todo_done",
                error: "oops".to_owned(),
            })
            .unwrap();
        h.store.poll();

        // Second failure went down the reload path, not snapshot restore.
        let kinds: Vec<&'static str> = h.jobs.try_iter().map(|e| e.job.kind()).collect();
        assert_eq!(
            kinds,
            vec!["set_todo_done", "set_todo_done", "reload", "reload"]
        );
        assert!(!h.store.todos()[0].done);
    }

    #[test]
    fn add_appends_with_next_sort_order_and_fresh_id() {
        let mut h = harness(abc());
        h.store.add("D".to_owned(), Priority::Low, None, None);

        let added = h.store.todos().last().unwrap();
        assert_eq!(added.id, TodoId(4));
        assert_eq!(added.sort_order, 4);
        assert_eq!(titles(&h.store), vec!["A", "B", "C", "D"]);

        // Whitespace-only titles are rejected before any job is submitted.
        h.store.add("   ".to_owned(), Priority::Low, None, None);
        assert_eq!(h.store.todos().len(), 4);
        assert_eq!(h.jobs.try_iter().count(), 1);
    }

    #[test]
    fn commit_reorder_translates_ids_under_an_active_filter() {
        let mut todos = abc();
        todos[1].done = true; // B is done and filtered out below.
        let mut h = harness(todos);
        h.store.filter = StatusFilter::Active;

        let visible: Vec<TodoId> = h.store.visible().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![TodoId(1), TodoId(3)]);

        // Dragging A below C in the rendered list: storage positions are
        // 0 and 2 even though render positions were 0 and 1.
        h.store.commit_reorder(ReorderCommit {
            moved: TodoId(1),
            displaced: TodoId(3),
        });
        assert_eq!(titles(&h.store), vec!["B", "C", "A"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut h = harness(vec![
            sample_todo(1, "買い物 Groceries", 1),
            sample_todo(2, "Email", 2),
        ]);
        h.store.search_query = "grocer".to_owned();
        let visible = h.store.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, TodoId(1));
    }

    #[test]
    fn successful_completion_clears_the_error_banner() {
        let mut h = harness(abc());
        h.store.toggle(TodoId(1));
        h.events
            .send(Event::Failed {
                seq: 1,
                kind: "set_todo_done",
                error: "transient".to_owned(),
            })
            .unwrap();
        h.store.poll();
        assert!(h.store.last_error().is_some());

        h.store.toggle(TodoId(2));
        h.events.send(Event::Completed { seq: 2 }).unwrap();
        h.store.poll();
        assert_eq!(h.store.last_error(), None);
    }

    #[test]
    fn subtask_lifecycle_is_optimistic() {
        let mut h = harness(abc());
        h.store.add_subtask(TodoId(1), "step one".to_owned());
        h.store.add_subtask(TodoId(1), "step two".to_owned());

        let subtasks = &h.store.todos()[0].subtasks;
        assert_eq!(subtasks.len(), 2);
        assert_eq!(subtasks[1].sort_order, 2);
        let first = subtasks[0].id;

        h.store.toggle_subtask(first);
        assert!(h.store.todos()[0].subtasks[0].done);

        h.store.delete_subtask(first);
        assert_eq!(h.store.todos()[0].subtasks.len(), 1);
    }

    #[test]
    fn deleting_a_category_detaches_and_clears_selection() {
        let mut h = harness(abc());
        h.store.add_category("Work".to_owned(), "#ff0000".to_owned());
        let category = h.store.categories()[0].id;
        h.store
            .update(TodoId(1), "A".to_owned(), Priority::Medium, Some(category), None);
        h.store.selected_category = Some(category);

        h.store.delete_category(category);
        assert!(h.store.categories().is_empty());
        assert_eq!(h.store.todos()[0].category_id, None);
        assert_eq!(h.store.selected_category, None);
    }
}
