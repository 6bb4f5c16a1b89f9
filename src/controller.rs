use std::collections::HashMap;

use crate::connectivity::{ConnectivityProbe, ManualLink};
use crate::database::{validate_new_task, Database};
use crate::error::{Result, TaskError};
use crate::models::{Priority, Status, Task, TaskViewModel};
use crate::offline::{OfflineBuffer, SyncPolicy, SyncReport};
use crate::view::{Tab, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// User input coming back from the rendering surface, keyed by task id.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    ToggleStatus { id: i64, checked: bool },
    ToggleEdit { id: i64 },
    CommitEdit { id: i64, new_name: String },
    Delete { id: i64 },
    ResolveDelete(Confirmation),
    Add { name: String, priority: Option<Priority> },
    SetTab(usize),
    SetPriorityFilter(Option<Priority>),
    SyncNow,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Owns the store, the view state and the offline buffer, and keeps the
/// visible task list in step with them. Every mutation ends in a full requery.
pub struct TaskController {
    db: Database,
    probe: Box<dyn ConnectivityProbe>,
    sync_policy: SyncPolicy,
    view: ViewState,
    offline: OfflineBuffer,
    link: Link,
    tasks: Vec<Task>,
    pending_delete: Option<PendingDelete>,
    notice: Option<Notice>,
    /// Local id -> rowid for every task created offline and synced since.
    synced_ids: HashMap<i64, i64>,
}

impl TaskController {
    pub fn new(
        db: Database,
        probe: Box<dyn ConnectivityProbe>,
        sync_policy: SyncPolicy,
    ) -> Result<Self> {
        db.ensure_schema()?;
        let mut controller = TaskController {
            db,
            probe,
            sync_policy,
            view: ViewState::default(),
            offline: OfflineBuffer::default(),
            link: Link::Online,
            tasks: Vec::new(),
            pending_delete: None,
            notice: None,
            synced_ids: HashMap::new(),
        };
        controller.refresh()?;
        Ok(controller)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync_policy
    }

    pub fn offline(&self) -> &OfflineBuffer {
        &self.offline
    }

    /// Maps a local id handed out while offline to its rowid once synced.
    pub fn resolve_id(&self, id: i64) -> i64 {
        self.synced_ids.get(&id).copied().unwrap_or(id)
    }

    pub fn link_switch(&self) -> Option<ManualLink> {
        self.probe.switch()
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    fn set_notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            text: text.into(),
        });
    }

    pub fn view_models(&self) -> Vec<TaskViewModel> {
        self.tasks
            .iter()
            .map(|task| TaskViewModel {
                id: task.id,
                name: task.name.clone(),
                status: task.status,
                priority_color: Priority::color(task.priority),
                priority_tooltip: Priority::tooltip(task.priority),
                is_editing: self.view.is_editing(task.id),
            })
            .collect()
    }

    /// Runs a gesture. Failures are also left behind as an error notice so
    /// the surface can show them.
    pub fn dispatch(&mut self, gesture: Gesture) -> Result<()> {
        let result = match gesture {
            Gesture::ToggleStatus { id, checked } => self.toggle_status(id, checked),
            Gesture::ToggleEdit { id } => {
                self.toggle_edit(id);
                Ok(())
            }
            Gesture::CommitEdit { id, new_name } => self.commit_edit(id, &new_name),
            Gesture::Delete { id } => self.request_delete(id),
            Gesture::ResolveDelete(confirmation) => self.resolve_delete(confirmation),
            Gesture::Add { name, priority } => self.add(&name, priority).map(|_| ()),
            Gesture::SetTab(index) => self.set_tab(index),
            Gesture::SetPriorityFilter(priority) => self.set_priority_filter(priority),
            Gesture::SyncNow => self.sync_now().map(|_| ()),
            Gesture::Refresh => self.refresh(),
        };
        if let Err(err) = &result {
            if !err.is_validation() {
                log::warn!("operation failed: {}", err);
            }
            self.set_notice(NoticeKind::Error, err.to_string());
        }
        result
    }

    /// Polls the probe and handles a change of link state.
    fn check_link(&mut self) -> Result<()> {
        let online = self.probe.is_connected();
        match (self.link, online) {
            (Link::Online, false) => {
                log::info!("link down, buffering changes");
                let snapshot = self.db.list_all()?;
                self.offline.begin(snapshot);
                self.link = Link::Offline;
                self.set_notice(
                    NoticeKind::Info,
                    "Offline: changes are kept until the link returns",
                );
            }
            (Link::Offline, true) => {
                log::info!("link up, syncing {} pending changes", self.offline.len());
                self.link = Link::Online;
                self.run_sync();
            }
            _ => {}
        }
        Ok(())
    }

    fn run_sync(&mut self) -> SyncReport {
        let report = self.offline.sync(&self.db, self.sync_policy);
        self.synced_ids
            .extend(report.synced_ids.iter().map(|(local, rowid)| (*local, *rowid)));
        self.view.remap_editing(&self.synced_ids);
        if let Some(pending) = &mut self.pending_delete {
            if let Some(rowid) = self.synced_ids.get(&pending.id) {
                pending.id = *rowid;
            }
        }

        if report.is_clean() {
            if report.replayed > 0 {
                self.set_notice(
                    NoticeKind::Info,
                    format!("Synced {} pending changes", report.replayed),
                );
            }
        } else if let Some(first) = report.failures.first() {
            let text = if report.retained > 0 {
                format!("{} ({} changes kept for the next sync)", first, report.retained)
            } else {
                let total = report.replayed + report.failures.len();
                format!("{} ({} of {} changes lost)", first, report.failures.len(), total)
            };
            self.set_notice(NoticeKind::Error, text);
        }
        report
    }

    /// Retries anything left in the buffer. Does nothing while offline.
    pub fn sync_now(&mut self) -> Result<SyncReport> {
        self.check_link()?;
        if self.link == Link::Offline {
            self.set_notice(NoticeKind::Info, "Still offline, nothing synced");
            return Ok(SyncReport::default());
        }
        let report = self.run_sync();
        self.refresh()?;
        Ok(report)
    }

    /// Re-derives the query from the view state and reloads the list.
    pub fn refresh(&mut self) -> Result<()> {
        self.check_link()?;
        let query = self.view.query();
        self.tasks = match self.link {
            Link::Online => self.db.query(&query)?,
            Link::Offline => self.offline.query(&query),
        };
        Ok(())
    }

    fn lookup(&self, id: i64) -> Result<Task> {
        let task = match self.link {
            Link::Online => self.db.get(id)?,
            Link::Offline => self.offline.find(id).cloned(),
        };
        task.ok_or(TaskError::UnknownTask(id))
    }

    pub fn add(&mut self, name: &str, priority: Option<Priority>) -> Result<i64> {
        let priority = validate_new_task(name, priority)?;
        self.check_link()?;
        let id = match self.link {
            Link::Online => self
                .db
                .insert(name, Status::Incomplete, Some(priority))?,
            Link::Offline => self.offline.insert(name, Status::Incomplete, priority),
        };
        log::info!("added task #{} '{}' ({})", id, name, priority);
        self.refresh()?;
        Ok(id)
    }

    pub fn toggle_status(&mut self, id: i64, checked: bool) -> Result<()> {
        let status = Status::from_checked(checked);
        self.check_link()?;
        let id = self.resolve_id(id);
        let changed = match self.link {
            Link::Online => self.db.update_status_by_id(id, status)? > 0,
            Link::Offline => self.offline.set_status(id, status),
        };
        if !changed {
            return Err(TaskError::UnknownTask(id));
        }
        log::info!("task #{} marked {}", id, status);
        self.refresh()
    }

    /// Returns whether the row is now in edit mode.
    pub fn toggle_edit(&mut self, id: i64) -> bool {
        let id = self.resolve_id(id);
        self.view.toggle_editing(id)
    }

    /// Leaves edit mode and renames when the new name is non-empty and new.
    pub fn commit_edit(&mut self, id: i64, new_name: &str) -> Result<()> {
        let link = self.check_link();
        let id = self.resolve_id(id);
        self.view.stop_editing(id);
        link?;
        let task = self.lookup(id)?;
        if !new_name.trim().is_empty() && new_name != task.name {
            match self.link {
                Link::Online => {
                    self.db.rename_by_id(id, new_name)?;
                }
                Link::Offline => {
                    self.offline.rename(id, new_name);
                }
            }
            log::info!("task #{} renamed '{}' -> '{}'", id, task.name, new_name);
        }
        self.refresh()
    }

    /// Opens the confirmation step; nothing is deleted yet.
    pub fn request_delete(&mut self, id: i64) -> Result<()> {
        self.check_link()?;
        let id = self.resolve_id(id);
        let task = self.lookup(id)?;
        self.pending_delete = Some(PendingDelete {
            id,
            name: task.name,
        });
        Ok(())
    }

    pub fn resolve_delete(&mut self, confirmation: Confirmation) -> Result<()> {
        let Some(pending) = self.pending_delete.take() else {
            return Ok(());
        };
        if confirmation == Confirmation::Cancelled {
            log::debug!("delete of task #{} cancelled", pending.id);
            return Ok(());
        }
        self.check_link()?;
        let id = self.resolve_id(pending.id);
        let deleted = match self.link {
            Link::Online => self.db.delete_by_id(id)? > 0,
            Link::Offline => self.offline.delete(id),
        };
        if !deleted {
            return Err(TaskError::UnknownTask(id));
        }
        self.view.stop_editing(id);
        log::info!("deleted task #{} '{}'", id, pending.name);
        self.refresh()
    }

    /// Out-of-range indices are ignored.
    pub fn set_tab(&mut self, index: usize) -> Result<()> {
        match Tab::from_index(index) {
            Some(tab) => {
                self.view.set_tab(tab);
                self.refresh()
            }
            None => {
                log::debug!("ignoring tab index {}", index);
                Ok(())
            }
        }
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) -> Result<()> {
        self.view.set_priority_filter(priority);
        self.refresh()
    }

    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }
}
