//! Write semantics applied to every entity of a batch.

#[cfg(feature = "config")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// How a batch write treats entities whose key already exists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InsertMethod {
    /// Fails with a conflict if the key exists.
    #[default]
    Insert,
    /// Overwrites an existing entity entirely.
    InsertOrReplace,
    /// Updates the given properties of an existing entity, keeping the rest.
    InsertOrMerge,
}

impl InsertMethod {
    /// Returns true if writing over an existing key is allowed.
    pub fn allows_existing(self) -> bool {
        !matches!(self, Self::Insert)
    }
}
