/// Input rejected before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task name must not be empty")]
    EmptyName,
    #[error("select a priority for the task")]
    MissingPriority,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A buffered change could not be replayed during sync.
    #[error("replaying pending change #{position} ({op}) failed: {source}")]
    ReplaySync {
        position: usize,
        op: String,
        #[source]
        source: Box<TaskError>,
    },

    #[error("no task with id {0}")]
    UnknownTask(i64),

    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },
}

impl TaskError {
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
