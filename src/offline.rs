use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};

use crate::database::Database;
use crate::error::TaskError;
use crate::models::{Priority, Status, Task, TaskQuery};

/// A mutation recorded while offline. Persisted rows are addressed by rowid,
/// rows created offline live only in their `Insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    Insert {
        local_id: i64,
        name: String,
        status: Status,
        priority: Priority,
    },
    SetStatus {
        id: i64,
        status: Status,
    },
    Rename {
        id: i64,
        new_name: String,
    },
    Delete {
        id: i64,
    },
}

impl fmt::Display for PendingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOp::Insert { name, .. } => write!(f, "insert '{}'", name),
            PendingOp::SetStatus { id, status } => write!(f, "mark #{} {}", id, status),
            PendingOp::Rename { id, new_name } => write!(f, "rename #{} to '{}'", id, new_name),
            PendingOp::Delete { id } => write!(f, "delete #{}", id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueuedOp {
    pub op: PendingOp,
    pub queued_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Replay everything, report failures, clear the queue regardless.
    #[default]
    BestEffort,
    /// Stop at the first failure and keep it and everything after it.
    Retain,
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncPolicy::BestEffort => "best-effort",
            SyncPolicy::Retain => "retain",
        })
    }
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best-effort" => Ok(SyncPolicy::BestEffort),
            "retain" => Ok(SyncPolicy::Retain),
            other => Err(format!(
                "unknown sync policy '{}' (expected best-effort or retain)",
                other
            )),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub replayed: usize,
    pub failures: Vec<TaskError>,
    pub retained: usize,
    /// Rowids assigned to tasks created offline, by local id.
    pub synced_ids: HashMap<i64, i64>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pending mutations plus the local view that offline reads are served from.
#[derive(Debug)]
pub struct OfflineBuffer {
    queue: Vec<QueuedOp>,
    mirror: Vec<Task>,
    next_local_id: i64,
}

impl Default for OfflineBuffer {
    fn default() -> Self {
        OfflineBuffer {
            queue: Vec::new(),
            mirror: Vec::new(),
            next_local_id: -1,
        }
    }
}

impl OfflineBuffer {
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &QueuedOp> {
        self.queue.iter()
    }

    pub fn oldest(&self) -> Option<DateTime<Local>> {
        self.queue.first().map(|q| q.queued_at)
    }

    /// Seeds the mirror from a store snapshot taken at disconnect time and
    /// replays anything still queued from an earlier failed sync on top.
    pub fn begin(&mut self, snapshot: Vec<Task>) {
        self.mirror = snapshot;
        let queued: Vec<PendingOp> = self.queue.iter().map(|q| q.op.clone()).collect();
        for op in &queued {
            self.apply_to_mirror(op);
        }
    }

    fn apply_to_mirror(&mut self, op: &PendingOp) {
        match op {
            PendingOp::Insert {
                local_id,
                name,
                status,
                priority,
            } => {
                if self.find(*local_id).is_none() {
                    self.mirror.push(Task {
                        id: *local_id,
                        name: name.clone(),
                        status: *status,
                        priority: Some(*priority),
                    });
                }
            }
            PendingOp::SetStatus { id, status } => {
                if let Some(task) = self.mirror.iter_mut().find(|t| t.id == *id) {
                    task.status = *status;
                }
            }
            PendingOp::Rename { id, new_name } => {
                if let Some(task) = self.mirror.iter_mut().find(|t| t.id == *id) {
                    task.name = new_name.clone();
                }
            }
            PendingOp::Delete { id } => self.mirror.retain(|t| t.id != *id),
        }
    }

    fn push(&mut self, op: PendingOp) {
        log::debug!("buffered offline change: {}", op);
        self.queue.push(QueuedOp {
            op,
            queued_at: Local::now(),
        });
    }

    fn buffered_insert(&mut self, local_id: i64) -> Option<&mut PendingOp> {
        self.queue.iter_mut().map(|q| &mut q.op).find(
            |op| matches!(op, PendingOp::Insert { local_id: id, .. } if *id == local_id),
        )
    }

    pub fn find(&self, id: i64) -> Option<&Task> {
        self.mirror.iter().find(|t| t.id == id)
    }

    pub fn query(&self, query: &TaskQuery) -> Vec<Task> {
        self.mirror
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect()
    }

    /// Records a new task and returns its (negative) local id.
    pub fn insert(&mut self, name: &str, status: Status, priority: Priority) -> i64 {
        let local_id = self.next_local_id;
        self.next_local_id -= 1;
        let op = PendingOp::Insert {
            local_id,
            name: name.to_string(),
            status,
            priority,
        };
        self.apply_to_mirror(&op);
        self.push(op);
        local_id
    }

    pub fn set_status(&mut self, id: i64, status: Status) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        let op = PendingOp::SetStatus { id, status };
        self.apply_to_mirror(&op);
        if id < 0 {
            if let Some(PendingOp::Insert { status: s, .. }) = self.buffered_insert(id) {
                *s = status;
            }
        } else {
            self.push(op);
        }
        true
    }

    pub fn rename(&mut self, id: i64, new_name: &str) -> bool {
        match self.find(id) {
            Some(task) if task.name != new_name && !new_name.trim().is_empty() => {}
            _ => return false,
        }
        let op = PendingOp::Rename {
            id,
            new_name: new_name.to_string(),
        };
        self.apply_to_mirror(&op);
        if id < 0 {
            if let Some(PendingOp::Insert { name, .. }) = self.buffered_insert(id) {
                *name = new_name.to_string();
            }
        } else {
            self.push(op);
        }
        true
    }

    /// Deleting a task created offline simply forgets its insert.
    pub fn delete(&mut self, id: i64) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        let op = PendingOp::Delete { id };
        self.apply_to_mirror(&op);
        if id < 0 {
            self.queue.retain(
                |q| !matches!(q.op, PendingOp::Insert { local_id, .. } if local_id == id),
            );
        } else {
            self.push(op);
        }
        true
    }

    /// Replays the queue in order against the store and drops the mirror.
    pub fn sync(&mut self, db: &Database, policy: SyncPolicy) -> SyncReport {
        let mut report = SyncReport::default();
        let queue = std::mem::take(&mut self.queue);
        let mut remaining = queue.into_iter().enumerate();

        while let Some((position, queued)) = remaining.next() {
            match replay(db, &queued.op) {
                Ok(rowid) => {
                    report.replayed += 1;
                    if let PendingOp::Insert { local_id, .. } = &queued.op {
                        if let Some(rowid) = rowid {
                            report.synced_ids.insert(*local_id, rowid);
                        }
                    }
                }
                Err(source) => {
                    log::warn!("sync: {} failed: {}", queued.op, source);
                    report.failures.push(TaskError::ReplaySync {
                        position,
                        op: queued.op.to_string(),
                        source: Box::new(source),
                    });
                    if policy == SyncPolicy::Retain {
                        self.queue.push(queued);
                        self.queue.extend(remaining.by_ref().map(|(_, q)| q));
                        break;
                    }
                }
            }
        }

        report.retained = self.queue.len();
        self.mirror.clear();
        log::info!(
            "sync finished: {} replayed, {} failed, {} retained",
            report.replayed,
            report.failures.len(),
            report.retained
        );
        report
    }
}

/// Applies one buffered change. Inserts yield the new rowid.
fn replay(db: &Database, op: &PendingOp) -> Result<Option<i64>, TaskError> {
    match op {
        PendingOp::Insert {
            name,
            status,
            priority,
            ..
        } => db.insert(name, *status, Some(*priority)).map(Some),
        PendingOp::SetStatus { id, status } => db.update_status_by_id(*id, *status).map(|_| None),
        PendingOp::Rename { id, new_name } => db.rename_by_id(*id, new_name).map(|_| None),
        PendingOp::Delete { id } => db.delete_by_id(*id).map(|_| None),
    }
}
