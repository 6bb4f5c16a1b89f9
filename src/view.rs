use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::models::{Priority, Status, TaskQuery};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    All,
    Incomplete,
    Complete,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::All, Tab::Incomplete, Tab::Complete];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Tab::All => 0,
            Tab::Incomplete => 1,
            Tab::Complete => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::All => "All",
            Tab::Incomplete => "In progress",
            Tab::Complete => "Done",
        }
    }

    pub fn status(self) -> Option<Status> {
        match self {
            Tab::All => None,
            Tab::Incomplete => Some(Status::Incomplete),
            Tab::Complete => Some(Status::Complete),
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tab::All => "all",
            Tab::Incomplete => "incomplete",
            Tab::Complete => "complete",
        })
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Tab::All),
            "incomplete" => Ok(Tab::Incomplete),
            "complete" => Ok(Tab::Complete),
            other => Err(format!(
                "unknown tab '{}' (expected all, incomplete or complete)",
                other
            )),
        }
    }
}

/// Active tab, priority filter and the rows currently in edit mode.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    tab: Tab,
    priority_filter: Option<Priority>,
    editing: HashSet<i64>,
}

impl ViewState {
    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn priority_filter(&self) -> Option<Priority> {
        self.priority_filter
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.priority_filter = priority;
    }

    /// The tab picks the status, the filter is AND-ed on top.
    pub fn query(&self) -> TaskQuery {
        TaskQuery {
            status: self.tab.status(),
            priority: self.priority_filter,
        }
    }

    pub fn is_editing(&self, id: i64) -> bool {
        self.editing.contains(&id)
    }

    /// Flips edit mode for one row and returns the new state.
    pub fn toggle_editing(&mut self, id: i64) -> bool {
        if self.editing.remove(&id) {
            false
        } else {
            self.editing.insert(id);
            true
        }
    }

    pub fn stop_editing(&mut self, id: i64) {
        self.editing.remove(&id);
    }

    /// Moves edit flags from local ids to the rowids they were synced under.
    /// Flags on local ids that never reached the store are dropped.
    pub fn remap_editing(&mut self, synced_ids: &HashMap<i64, i64>) {
        self.editing = self
            .editing
            .iter()
            .filter_map(|id| if *id > 0 { Some(*id) } else { synced_ids.get(id).copied() })
            .collect();
    }
}
