//! Operator restore targets.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A store that can be replaced wholesale from an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreTarget {
    Claims,
    Teams,
}

impl RestoreTarget {
    /// File name of the claim store.
    pub const CLAIMS_FILE: &'static str = "claimed_ids.json";

    /// File name of the team store.
    pub const TEAMS_FILE: &'static str = "teams.json";

    /// Resolve a target from a file name. Directory components are ignored.
    pub fn from_filename(name: &str) -> Result<Self> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match file_name {
            Self::CLAIMS_FILE => Ok(Self::Claims),
            Self::TEAMS_FILE => Ok(Self::Teams),
            _ => Err(StoreError::UnknownRestoreTarget(name.to_string())),
        }
    }

    /// The file name this target is persisted under.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Claims => Self::CLAIMS_FILE,
            Self::Teams => Self::TEAMS_FILE,
        }
    }
}

impl std::fmt::Display for RestoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_names() {
        assert_eq!(
            RestoreTarget::from_filename("claimed_ids.json").unwrap(),
            RestoreTarget::Claims
        );
        assert_eq!(
            RestoreTarget::from_filename("/tmp/backup/teams.json").unwrap(),
            RestoreTarget::Teams
        );
    }

    #[test]
    fn unknown_name_rejected() {
        let err = RestoreTarget::from_filename("ids.json").unwrap_err();
        assert!(matches!(err, StoreError::UnknownRestoreTarget(_)));
        assert!(RestoreTarget::from_filename("").is_err());
    }

    #[test]
    fn filename_round_trip() {
        for target in [RestoreTarget::Claims, RestoreTarget::Teams] {
            assert_eq!(RestoreTarget::from_filename(target.filename()).unwrap(), target);
        }
    }
}
