use std::fmt;
use std::str::FromStr;

use crate::database::Database;
use crate::error::{Result, TaskError};
use crate::offline::SyncPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// The probe always answers "connected".
    #[default]
    Always,
    /// The TUI can take the link down and bring it back up.
    Manual,
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Connectivity::Always => "always",
            Connectivity::Manual => "manual",
        })
    }
}

impl FromStr for Connectivity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "always" => Ok(Connectivity::Always),
            "manual" => Ok(Connectivity::Manual),
            other => Err(format!(
                "unknown connectivity '{}' (expected always or manual)",
                other
            )),
        }
    }
}

/// Keys accepted by `config set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    SyncPolicy,
    Connectivity,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::SyncPolicy, SettingKey::Connectivity];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::SyncPolicy => "sync_policy",
            SettingKey::Connectivity => "connectivity",
        }
    }

    pub fn parse(key: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| TaskError::UnknownSetting(key.to_string()))
    }

    fn validate(self, value: &str) -> Result<()> {
        let ok = match self {
            SettingKey::SyncPolicy => value.parse::<SyncPolicy>().is_ok(),
            SettingKey::Connectivity => value.parse::<Connectivity>().is_ok(),
        };
        if ok {
            Ok(())
        } else {
            Err(TaskError::InvalidSetting {
                key: self.as_str().to_string(),
                value: value.to_string(),
            })
        }
    }
}

/// Validates and stores a setting.
pub fn set(db: &Database, key: &str, value: &str) -> Result<()> {
    let key = SettingKey::parse(key)?;
    key.validate(value)?;
    db.set_setting(key.as_str(), value)?;
    log::info!("setting {} = {}", key.as_str(), value);
    Ok(())
}

/// Effective runtime configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub sync_policy: SyncPolicy,
    pub connectivity: Connectivity,
    pub start_offline: bool,
}

/// Command-line values that take precedence over stored settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub sync_policy: Option<SyncPolicy>,
    pub connectivity: Option<Connectivity>,
    pub start_offline: bool,
}

impl AppConfig {
    /// Flag > stored setting > default. A stored value that no longer
    /// parses is ignored with a warning.
    pub fn resolve(db: &Database, overrides: Overrides) -> Result<Self> {
        let sync_policy = match overrides.sync_policy {
            Some(policy) => policy,
            None => stored::<SyncPolicy>(db, SettingKey::SyncPolicy)?.unwrap_or_default(),
        };
        let mut connectivity = match overrides.connectivity {
            Some(connectivity) => connectivity,
            None => stored::<Connectivity>(db, SettingKey::Connectivity)?.unwrap_or_default(),
        };
        if overrides.start_offline && connectivity == Connectivity::Always {
            log::info!("--start-offline implies manual connectivity");
            connectivity = Connectivity::Manual;
        }
        Ok(AppConfig {
            sync_policy,
            connectivity,
            start_offline: overrides.start_offline,
        })
    }
}

fn stored<T: FromStr>(db: &Database, key: SettingKey) -> Result<Option<T>> {
    let Some(raw) = db.get_setting(key.as_str())? else {
        return Ok(None);
    };
    match raw.parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            log::warn!("ignoring stored {} = '{}'", key.as_str(), raw);
            Ok(None)
        }
    }
}
