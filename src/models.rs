use std::fmt;
use std::str::FromStr;

use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Incomplete,
    Complete,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Incomplete => "incomplete",
            Status::Complete => "complete",
        }
    }

    /// Anything other than `complete` reads back as incomplete.
    pub fn from_db(value: &str) -> Self {
        if value == "complete" {
            Status::Complete
        } else {
            Status::Incomplete
        }
    }

    pub fn from_checked(checked: bool) -> Self {
        if checked {
            Status::Complete
        } else {
            Status::Incomplete
        }
    }

    pub fn is_complete(self) -> bool {
        self == Status::Complete
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority. The stored labels are the ones existing databases use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Baixa,
    Media,
    Alta,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Baixa, Priority::Media, Priority::Alta];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Baixa => "Baixa",
            Priority::Media => "Média",
            Priority::Alta => "Alta",
        }
    }

    /// Empty or unknown labels mean "no priority".
    pub fn from_db(value: Option<&str>) -> Option<Self> {
        let value = value?;
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }

    pub fn color(priority: Option<Self>) -> Color {
        match priority {
            Some(Priority::Baixa) => Color::Blue,
            Some(Priority::Media) => Color::Yellow,
            Some(Priority::Alta) => Color::Red,
            None => Color::Gray,
        }
    }

    pub fn tooltip(priority: Option<Self>) -> &'static str {
        match priority {
            Some(Priority::Baixa) => "Low priority",
            Some(Priority::Media) => "Medium priority",
            Some(Priority::Alta) => "High priority",
            None => "No priority",
        }
    }

    /// Steps through `None -> Baixa -> Média -> Alta -> None`.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Priority::Baixa),
            Some(Priority::Baixa) => Some(Priority::Media),
            Some(Priority::Media) => Some(Priority::Alta),
            Some(Priority::Alta) => None,
        }
    }

    pub fn cycle_back(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Priority::Alta),
            Some(Priority::Alta) => Some(Priority::Media),
            Some(Priority::Media) => Some(Priority::Baixa),
            Some(Priority::Baixa) => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixa" | "low" => Ok(Priority::Baixa),
            "media" | "média" | "medium" => Ok(Priority::Media),
            "alta" | "high" => Ok(Priority::Alta),
            other => Err(format!(
                "unknown priority '{}' (expected baixa, media or alta)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// SQLite rowid, or a negative local id for tasks created while offline.
    pub id: i64,
    pub name: String,
    pub status: Status,
    pub priority: Option<Priority>,
}

/// Predicate over the task table. `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == Some(p))
    }
}

/// What the rendering surface needs to draw one row.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskViewModel {
    pub id: i64,
    pub name: String,
    pub status: Status,
    pub priority_color: Color,
    pub priority_tooltip: &'static str,
    pub is_editing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupMode {
    None,
    AddTask,
    ConfirmDelete,
}
