use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::{Path, PathBuf};

use crate::error::{Result, ValidationError};
use crate::models::{Priority, Status, Task, TaskQuery};

const SELECT_TASKS: &str = "SELECT rowid, name, status, priority FROM tasks";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        log::debug!("opening task database at {}", path.display());
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.ensure_schema()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.ensure_schema()?;
        Ok(db)
    }

    /// `$HOME/.tasker.db`, or the working directory when HOME is unset.
    pub fn default_path() -> PathBuf {
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home_dir).join(".tasker.db")
    }

    pub fn ensure_schema(&self) -> Result<()> {
        // Untyped columns and no declared key, so older task files open
        // unchanged. `rowid` is the task id.
        self.conn
            .execute("CREATE TABLE IF NOT EXISTS tasks (name, status, priority)", [])?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn parse_task(row: &Row) -> rusqlite::Result<Task> {
        let status: Option<String> = row.get(2)?;
        let priority: Option<String> = row.get(3)?;
        Ok(Task {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            status: Status::from_db(status.as_deref().unwrap_or_default()),
            priority: Priority::from_db(priority.as_deref()),
        })
    }

    pub fn list_all(&self) -> Result<Vec<Task>> {
        self.query(&TaskQuery::default())
    }

    pub fn list_by_status(&self, status: Status) -> Result<Vec<Task>> {
        self.query(&TaskQuery {
            status: Some(status),
            priority: None,
        })
    }

    pub fn list_by_status_and_priority(
        &self,
        status: Option<Status>,
        priority: Option<Priority>,
    ) -> Result<Vec<Task>> {
        self.query(&TaskQuery { status, priority })
    }

    pub fn query(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let mut clauses = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        let status = query.status.map(Status::as_str);
        let priority = query.priority.map(Priority::as_str);
        if let Some(status) = &status {
            clauses.push("status = ?");
            values.push(status);
        }
        if let Some(priority) = &priority {
            clauses.push("priority = ?");
            values.push(priority);
        }

        let mut sql = SELECT_TASKS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid");

        log::debug!("query: {}", sql);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::parse_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("{} WHERE rowid = ?1", SELECT_TASKS),
                [id],
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Appends a task and returns its id. Duplicate names are accepted.
    pub fn insert(&self, name: &str, status: Status, priority: Option<Priority>) -> Result<i64> {
        let priority = validate_new_task(name, priority)?;
        self.conn.execute(
            "INSERT INTO tasks (name, status, priority) VALUES (?1, ?2, ?3)",
            params![name, status.as_str(), priority.as_str()],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("inserted task #{} '{}'", id, name);
        Ok(id)
    }

    /// Updates every row called `name`; duplicates change together.
    pub fn update_status(&self, name: &str, status: Status) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE name = ?2",
            params![status.as_str(), name],
        )?;
        Ok(rows)
    }

    /// No-op when `new_name` is empty or unchanged. Collisions are not checked.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<usize> {
        if new_name.trim().is_empty() || new_name == old_name {
            return Ok(0);
        }
        let rows = self.conn.execute(
            "UPDATE tasks SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        )?;
        Ok(rows)
    }

    /// Removes every row called `name`. Callers confirm with the user first.
    pub fn delete(&self, name: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM tasks WHERE name = ?1", [name])?;
        Ok(rows)
    }

    pub fn update_status_by_id(&self, id: i64, status: Status) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE rowid = ?2",
            params![status.as_str(), id],
        )?;
        Ok(rows)
    }

    pub fn rename_by_id(&self, id: i64, new_name: &str) -> Result<usize> {
        if new_name.trim().is_empty() {
            return Ok(0);
        }
        let rows = self.conn.execute(
            "UPDATE tasks SET name = ?1 WHERE rowid = ?2 AND name IS NOT ?1",
            params![new_name, id],
        )?;
        Ok(rows)
    }

    pub fn delete_by_id(&self, id: i64) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM tasks WHERE rowid = ?1", [id])?;
        Ok(rows)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(rows > 0)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Checks the add-task inputs and yields the concrete priority.
pub fn validate_new_task(
    name: &str,
    priority: Option<Priority>,
) -> std::result::Result<Priority, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    priority.ok_or(ValidationError::MissingPriority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn names(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn schema_is_idempotent_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert("Buy milk", Status::Incomplete, Some(Priority::Alta))
                .unwrap();
            db.ensure_schema().unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(names(&db.list_all().unwrap()), vec!["Buy milk"]);
    }

    #[test]
    fn opens_tables_written_without_rowid_alias() {
        let db = db();
        db.connection()
            .execute(
                "INSERT INTO tasks (name, status, priority) VALUES ('Legacy', 'complete', '')",
                [],
            )
            .unwrap();
        let tasks = db.list_all().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, Status::Complete);
        assert_eq!(tasks[0].priority, None);
    }

    #[test]
    fn insert_rejects_empty_name_and_missing_priority() {
        let db = db();
        let err = db.insert("", Status::Incomplete, Some(Priority::Alta)).unwrap_err();
        assert!(matches!(err, TaskError::Validation(ValidationError::EmptyName)));
        let err = db.insert("   ", Status::Incomplete, Some(Priority::Alta)).unwrap_err();
        assert!(err.is_validation());
        let err = db.insert("Buy milk", Status::Incomplete, None).unwrap_err();
        assert!(matches!(err, TaskError::Validation(ValidationError::MissingPriority)));
        assert_eq!(db.count().unwrap(), 0);

        let id = db
            .insert("Buy milk", Status::Incomplete, Some(Priority::Alta))
            .unwrap();
        let task = db.get(id).unwrap().unwrap();
        assert_eq!(task.status, Status::Incomplete);
        assert_eq!(task.priority, Some(Priority::Alta));
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let db = db();
        for name in ["c", "a", "b"] {
            db.insert(name, Status::Incomplete, Some(Priority::Baixa)).unwrap();
        }
        assert_eq!(names(&db.list_all().unwrap()), vec!["c", "a", "b"]);
    }

    #[test]
    fn list_by_status_filters_rows() {
        let db = db();
        db.insert("open", Status::Incomplete, Some(Priority::Baixa)).unwrap();
        db.insert("done", Status::Complete, Some(Priority::Baixa)).unwrap();
        assert_eq!(names(&db.list_by_status(Status::Complete).unwrap()), vec!["done"]);
        assert_eq!(names(&db.list_by_status(Status::Incomplete).unwrap()), vec!["open"]);
    }

    #[test]
    fn status_toggle_round_trips() {
        let db = db();
        let id = db.insert("Walk", Status::Incomplete, Some(Priority::Media)).unwrap();
        db.update_status("Walk", Status::Complete).unwrap();
        assert_eq!(db.get(id).unwrap().unwrap().status, Status::Complete);
        db.update_status("Walk", Status::Incomplete).unwrap();
        assert_eq!(db.get(id).unwrap().unwrap().status, Status::Incomplete);
    }

    #[test]
    fn rename_to_same_or_empty_is_noop() {
        let db = db();
        db.insert("Walk", Status::Incomplete, Some(Priority::Media)).unwrap();
        assert_eq!(db.rename("Walk", "Walk").unwrap(), 0);
        assert_eq!(db.rename("Walk", "").unwrap(), 0);
        assert_eq!(db.rename("Walk", "Run").unwrap(), 1);
        assert_eq!(names(&db.list_all().unwrap()), vec!["Run"]);
    }

    #[test]
    fn rename_into_existing_name_is_allowed() {
        let db = db();
        db.insert("A", Status::Incomplete, Some(Priority::Media)).unwrap();
        db.insert("B", Status::Incomplete, Some(Priority::Media)).unwrap();
        db.rename("B", "A").unwrap();
        assert_eq!(names(&db.list_all().unwrap()), vec!["A", "A"]);
    }

    #[test]
    fn duplicate_names_change_together() {
        let db = db();
        db.insert("X", Status::Incomplete, Some(Priority::Alta)).unwrap();
        db.insert("X", Status::Incomplete, Some(Priority::Baixa)).unwrap();
        assert_eq!(db.update_status("X", Status::Complete).unwrap(), 2);
        assert!(db.list_all().unwrap().iter().all(|t| t.status == Status::Complete));
        assert_eq!(db.delete("X").unwrap(), 2);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn id_operations_touch_a_single_duplicate() {
        let db = db();
        let first = db.insert("X", Status::Incomplete, Some(Priority::Alta)).unwrap();
        let second = db.insert("X", Status::Incomplete, Some(Priority::Baixa)).unwrap();

        assert_eq!(db.update_status_by_id(first, Status::Complete).unwrap(), 1);
        assert_eq!(db.get(second).unwrap().unwrap().status, Status::Incomplete);

        assert_eq!(db.rename_by_id(second, "Y").unwrap(), 1);
        assert_eq!(db.rename_by_id(second, "Y").unwrap(), 0);
        assert_eq!(db.rename_by_id(second, " ").unwrap(), 0);

        assert_eq!(db.delete_by_id(first).unwrap(), 1);
        assert_eq!(names(&db.list_all().unwrap()), vec!["Y"]);
        assert!(db.get(first).unwrap().is_none());
    }

    #[test]
    fn settings_round_trip() {
        let db = db();
        assert_eq!(db.get_setting("sync_policy").unwrap(), None);
        db.set_setting("sync_policy", "retain").unwrap();
        db.set_setting("sync_policy", "best-effort").unwrap();
        assert_eq!(
            db.get_setting("sync_policy").unwrap().as_deref(),
            Some("best-effort")
        );
        assert_eq!(db.list_settings().unwrap().len(), 1);
        assert!(db.delete_setting("sync_policy").unwrap());
        assert!(!db.delete_setting("sync_policy").unwrap());
    }

    fn status_strategy() -> impl Strategy<Value = Status> {
        prop_oneof![Just(Status::Incomplete), Just(Status::Complete)]
    }

    fn priority_strategy() -> impl Strategy<Value = Option<Priority>> {
        prop_oneof![
            Just(None),
            Just(Some(Priority::Baixa)),
            Just(Some(Priority::Media)),
            Just(Some(Priority::Alta)),
        ]
    }

    proptest! {
        #[test]
        fn filters_are_a_conjunction(
            rows in prop::collection::vec((status_strategy(), priority_strategy()), 0..24),
            status in prop::option::of(status_strategy()),
            priority in priority_strategy(),
        ) {
            let db = db();
            for (i, (row_status, row_priority)) in rows.iter().enumerate() {
                // Rows without a priority cannot go through `insert`.
                db.connection().execute(
                    "INSERT INTO tasks (name, status, priority) VALUES (?1, ?2, ?3)",
                    params![format!("task {}", i), row_status.as_str(), row_priority.map(Priority::as_str)],
                ).unwrap();
            }

            let query = TaskQuery { status, priority };
            let expected: Vec<Task> = db
                .list_all()
                .unwrap()
                .into_iter()
                .filter(|t| query.matches(t))
                .collect();
            let actual = db.list_by_status_and_priority(status, priority).unwrap();
            prop_assert_eq!(actual, expected);
        }
    }
}
