//! Embedded SQLite persistence.
//!
//! [`Database`] is a thin, synchronous access layer: schema setup with
//! tolerant migrations, row mapping, and per-operation CRUD. It has no
//! knowledge of optimistic state — ordering and rollback discipline live in
//! [`crate::store::TodoStore`], and all calls from the UI side go through
//! the background worker in [`worker`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::model::{Category, CategoryId, Priority, Subtask, SubtaskId, Todo, TodoId};

pub mod worker;

pub use worker::{Event, Job, JobEnvelope, StorageHandle};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no usable data directory for this platform")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the application database lives (`<platform data dir>/quickdo`).
pub fn default_db_path() -> Result<PathBuf, StorageError> {
    let dirs = directories::ProjectDirs::from("", "", "quickdo").ok_or(StorageError::NoDataDir)?;
    std::fs::create_dir_all(dirs.data_dir())?;
    Ok(dirs.data_dir().join("todo.db"))
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let mut db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(&default_db_path()?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                done INTEGER DEFAULT 0,
                priority TEXT DEFAULT 'medium',
                category_id INTEGER,
                due_date TEXT,
                sort_order INTEGER DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                color TEXT DEFAULT '#6366f1'
            );
            CREATE TABLE IF NOT EXISTS subtasks (
                id INTEGER PRIMARY KEY,
                todo_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                done INTEGER DEFAULT 0,
                sort_order INTEGER DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (todo_id) REFERENCES todos(id) ON DELETE CASCADE
            );",
        )?;

        // Databases written by earlier versions lack these columns.
        self.add_column_if_missing("ALTER TABLE todos ADD COLUMN sort_order INTEGER DEFAULT 0")?;
        self.add_column_if_missing("ALTER TABLE todos ADD COLUMN category_id INTEGER")?;

        // Backfill: rows without an explicit order keep their insertion order.
        self.conn.execute(
            "UPDATE todos SET sort_order = id WHERE sort_order = 0 OR sort_order IS NULL",
            [],
        )?;
        Ok(())
    }

    fn add_column_if_missing(&self, sql: &str) -> Result<(), StorageError> {
        match self.conn.execute(sql, []) {
            Ok(_) => Ok(()),
            Err(err) if err.to_string().contains("duplicate column name") => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Load the complete canonical state: todos in canonical order with
    /// their subtasks attached, and all categories.
    pub fn load_all(&self) -> Result<(Vec<Todo>, Vec<Category>), StorageError> {
        let mut todos = self.load_todos()?;
        let subtasks = self.load_subtasks()?;

        let mut by_id: ahash::HashMap<TodoId, usize> = ahash::HashMap::default();
        for (index, todo) in todos.iter().enumerate() {
            by_id.insert(todo.id, index);
        }
        for subtask in subtasks {
            if let Some(&index) = by_id.get(&subtask.todo_id) {
                todos[index].subtasks.push(subtask);
            }
        }

        Ok((todos, self.load_categories()?))
    }

    fn load_todos(&self) -> Result<Vec<Todo>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, done, priority, category_id, due_date, sort_order, created_at
             FROM todos ORDER BY sort_order ASC, created_at DESC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Todo {
                id: TodoId(row.get(0)?),
                title: row.get(1)?,
                done: row.get(2)?,
                priority: Priority::from_str_lossy(&row.get::<_, String>(3)?),
                category_id: row.get::<_, Option<i64>>(4)?.map(CategoryId),
                due_date: row.get::<_, Option<NaiveDate>>(5)?,
                sort_order: row.get(6)?,
                created_at: row.get::<_, DateTime<Utc>>(7)?,
                subtasks: Vec::new(),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn load_subtasks(&self) -> Result<Vec<Subtask>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, todo_id, title, done, sort_order, created_at
             FROM subtasks ORDER BY sort_order ASC, created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Subtask {
                id: SubtaskId(row.get(0)?),
                todo_id: TodoId(row.get(1)?),
                title: row.get(2)?,
                done: row.get(3)?,
                sort_order: row.get(4)?,
                created_at: row.get::<_, DateTime<Utc>>(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn load_categories(&self) -> Result<Vec<Category>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color FROM categories ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: CategoryId(row.get(0)?),
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn insert_todo(&self, todo: &Todo) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO todos (id, title, done, priority, category_id, due_date, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                todo.id.0,
                todo.title,
                todo.done,
                todo.priority.as_str(),
                todo.category_id.map(|c| c.0),
                todo.due_date,
                todo.sort_order,
                todo.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_todo(&self, todo: &Todo) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE todos SET title = ?1, priority = ?2, category_id = ?3, due_date = ?4 WHERE id = ?5",
            params![
                todo.title,
                todo.priority.as_str(),
                todo.category_id.map(|c| c.0),
                todo.due_date,
                todo.id.0,
            ],
        )?;
        Ok(())
    }

    pub fn set_todo_done(&self, id: TodoId, done: bool) -> Result<(), StorageError> {
        self.conn
            .execute("UPDATE todos SET done = ?1 WHERE id = ?2", params![done, id.0])?;
        Ok(())
    }

    pub fn delete_todo(&mut self, id: TodoId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM subtasks WHERE todo_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM todos WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }

    /// Apply a full set of `(id, sort_order)` pairs in one transaction.
    /// Re-applying the same pairs is idempotent, which is what lets the
    /// caller retry a whole batch without tracking partial success.
    pub fn persist_order(&mut self, pairs: &[(TodoId, i64)]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE todos SET sort_order = ?1 WHERE id = ?2")?;
            for (id, sort_order) in pairs {
                stmt.execute(params![sort_order, id.0])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_subtask(&self, subtask: &Subtask) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO subtasks (id, todo_id, title, done, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                subtask.id.0,
                subtask.todo_id.0,
                subtask.title,
                subtask.done,
                subtask.sort_order,
                subtask.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn set_subtask_done(&self, id: SubtaskId, done: bool) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE subtasks SET done = ?1 WHERE id = ?2",
            params![done, id.0],
        )?;
        Ok(())
    }

    pub fn delete_subtask(&self, id: SubtaskId) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM subtasks WHERE id = ?1", params![id.0])?;
        Ok(())
    }

    pub fn insert_category(&self, category: &Category) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO categories (id, name, color) VALUES (?1, ?2, ?3)",
            params![category.id.0, category.name, category.color],
        )?;
        Ok(())
    }

    /// Deleting a category detaches its todos rather than deleting them.
    pub fn delete_category(&mut self, id: CategoryId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE todos SET category_id = NULL WHERE category_id = ?1",
            params![id.0],
        )?;
        tx.execute("DELETE FROM categories WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }
}
