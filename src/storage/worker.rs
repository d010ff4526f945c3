//! Background persistence worker.
//!
//! One thread owns the [`Database`] (a `rusqlite::Connection` is not
//! `Sync`) and drains a FIFO job channel, so persistence calls always hit
//! the database in the order the optimistic mutations were applied. Results
//! come back as [`Event`]s tagged with the submitting mutation's sequence
//! number; the UI thread polls them once per frame. Nothing here blocks the
//! UI: commits are fire-and-forget from the store's point of view.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread;

use crate::model::{Category, CategoryId, Subtask, SubtaskId, Todo, TodoId};

use super::Database;

#[derive(Clone, Debug)]
pub enum Job {
    InsertTodo(Todo),
    UpdateTodo(Todo),
    SetTodoDone(TodoId, bool),
    DeleteTodo(TodoId),
    PersistOrder(Vec<(TodoId, i64)>),
    InsertSubtask(Subtask),
    SetSubtaskDone(SubtaskId, bool),
    DeleteSubtask(SubtaskId),
    InsertCategory(Category),
    DeleteCategory(CategoryId),
    /// Read the canonical state back. Queued behind every previously
    /// submitted write, so the result reflects all of them.
    Reload,
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsertTodo(_) => "insert_todo",
            Self::UpdateTodo(_) => "update_todo",
            Self::SetTodoDone(..) => "set_todo_done",
            Self::DeleteTodo(_) => "delete_todo",
            Self::PersistOrder(_) => "persist_order",
            Self::InsertSubtask(_) => "insert_subtask",
            Self::SetSubtaskDone(..) => "set_subtask_done",
            Self::DeleteSubtask(_) => "delete_subtask",
            Self::InsertCategory(_) => "insert_category",
            Self::DeleteCategory(_) => "delete_category",
            Self::Reload => "reload",
        }
    }
}

#[derive(Debug)]
pub struct JobEnvelope {
    pub seq: u64,
    pub job: Job,
}

#[derive(Debug)]
pub enum Event {
    Completed {
        seq: u64,
    },
    Failed {
        seq: u64,
        kind: &'static str,
        error: String,
    },
    Reloaded {
        todos: Vec<Todo>,
        categories: Vec<Category>,
    },
    ReloadFailed {
        error: String,
    },
}

/// The UI side of the worker: submit jobs, poll events.
#[derive(Debug)]
pub struct StorageHandle {
    jobs: Sender<JobEnvelope>,
    events: Receiver<Event>,
}

impl StorageHandle {
    /// Move `db` onto a worker thread and return the UI-side handle.
    pub fn spawn(db: Database) -> Self {
        let (job_tx, job_rx) = channel::<JobEnvelope>();
        let (event_tx, event_rx) = channel::<Event>();

        // The thread exits when the handle (and with it the job sender) is
        // dropped. A send error on the event side means the UI is gone too.
        let builder = thread::Builder::new().name("quickdo-storage".to_owned());
        let spawned = builder.spawn(move || {
            let mut db = db;
            while let Ok(envelope) = job_rx.recv() {
                let event = run_job(&mut db, envelope);
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            log::debug!("storage worker shutting down");
        });
        if let Err(err) = spawned {
            log::error!("failed to spawn storage worker: {err}");
        }

        Self {
            jobs: job_tx,
            events: event_rx,
        }
    }

    /// Build a handle over raw channel ends. Lets tests stand in for the
    /// worker and script completion/failure events.
    pub fn from_channels(jobs: Sender<JobEnvelope>, events: Receiver<Event>) -> Self {
        Self { jobs, events }
    }

    pub fn submit(&self, seq: u64, job: Job) {
        log::debug!("submit seq={seq} job={}", job.kind());
        if self.jobs.send(JobEnvelope { seq, job }).is_err() {
            log::error!("storage worker is gone; dropping job seq={seq}");
        }
    }

    pub fn try_event(&self) -> Option<Event> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

fn run_job(db: &mut Database, envelope: JobEnvelope) -> Event {
    let JobEnvelope { seq, job } = envelope;
    let kind = job.kind();

    let result = match job {
        Job::InsertTodo(todo) => db.insert_todo(&todo),
        Job::UpdateTodo(todo) => db.update_todo(&todo),
        Job::SetTodoDone(id, done) => db.set_todo_done(id, done),
        Job::DeleteTodo(id) => db.delete_todo(id),
        Job::PersistOrder(pairs) => db.persist_order(&pairs),
        Job::InsertSubtask(subtask) => db.insert_subtask(&subtask),
        Job::SetSubtaskDone(id, done) => db.set_subtask_done(id, done),
        Job::DeleteSubtask(id) => db.delete_subtask(id),
        Job::InsertCategory(category) => db.insert_category(&category),
        Job::DeleteCategory(id) => db.delete_category(id),
        Job::Reload => {
            return match db.load_all() {
                Ok((todos, categories)) => Event::Reloaded { todos, categories },
                Err(err) => {
                    log::error!("reload failed: {err}");
                    Event::ReloadFailed {
                        error: err.to_string(),
                    }
                }
            };
        }
    };

    match result {
        Ok(()) => Event::Completed { seq },
        Err(err) => {
            log::error!("storage job {kind} (seq {seq}) failed: {err}");
            Event::Failed {
                seq,
                kind,
                error: err.to_string(),
            }
        }
    }
}
