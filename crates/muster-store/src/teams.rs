//! Persisted team collection with a membership index.

use crate::error::{Result, StoreError};
use crate::file::JsonFile;
use crate::ids::ParticipantId;
use crate::team::Team;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Team name → team record, plus a participant → team-name index.
///
/// Every committed state satisfies: each record validates, each record is
/// stored under its own name, and no participant is a member of two teams.
#[derive(Debug, Default)]
pub struct TeamStore {
    teams: BTreeMap<String, Team>,
    index: HashMap<ParticipantId, String>,
    file: Option<JsonFile>,
}

impl TeamStore {
    /// Create a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`, loading it if it exists.
    ///
    /// A file whose records violate the store invariants is rejected.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = JsonFile::new(path);
        let teams: BTreeMap<String, Team> = file.read()?.unwrap_or_default();
        let index = index_teams(&teams)?;
        tracing::debug!("Opened team store {:?}: {} teams", file.path(), teams.len());
        Ok(Self {
            teams,
            index,
            file: Some(file),
        })
    }

    /// Check that a new team named `name` led by `captain` could be created.
    pub fn check_available(&self, name: &str, captain: &ParticipantId) -> Result<()> {
        if self.teams.contains_key(name) {
            return Err(StoreError::NameTaken(name.to_string()));
        }
        if let Some(team) = self.index.get(captain) {
            return Err(StoreError::CaptainAlreadyTeamed {
                captain: captain.clone(),
                team: team.clone(),
            });
        }
        Ok(())
    }

    /// Insert a new team.
    pub fn create(&mut self, team: Team) -> Result<()> {
        self.check_available(&team.name, &team.captain)?;
        let mut next = self.teams.clone();
        next.insert(team.name.clone(), team);
        self.commit(next)
    }

    /// Commit a modified version of an existing team.
    pub fn replace(&mut self, team: Team) -> Result<()> {
        if !self.teams.contains_key(&team.name) {
            return Err(StoreError::TeamNotFound(team.name));
        }
        let mut next = self.teams.clone();
        next.insert(team.name.clone(), team);
        self.commit(next)
    }

    /// Remove a team, returning its final record.
    pub fn delete(&mut self, name: &str) -> Result<Option<Team>> {
        let mut next = self.teams.clone();
        let Some(removed) = next.remove(name) else {
            return Ok(None);
        };
        self.commit(next)?;
        Ok(Some(removed))
    }

    /// Replace every team at once.
    pub fn replace_all(&mut self, teams: BTreeMap<String, Team>) -> Result<()> {
        self.commit(teams)
    }

    /// Check a replacement map without installing it.
    pub fn check(teams: &BTreeMap<String, Team>) -> Result<()> {
        index_teams(teams).map(|_| ())
    }

    /// Replace every team from a JSON document in the persisted format.
    pub fn restore_json(&mut self, json: &str) -> Result<usize> {
        let teams: BTreeMap<String, Team> = serde_json::from_str(json)?;
        let count = teams.len();
        self.replace_all(teams)?;
        Ok(count)
    }

    /// Look up a team by name.
    pub fn find(&self, name: &str) -> Option<&Team> {
        self.teams.get(name)
    }

    /// The team `participant` is a member of, if any.
    pub fn team_of(&self, participant: &ParticipantId) -> Option<&Team> {
        self.index
            .get(participant)
            .and_then(|name| self.teams.get(name))
    }

    /// Iterate teams in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    /// Copy of the team map.
    pub fn to_map(&self) -> BTreeMap<String, Team> {
        self.teams.clone()
    }

    /// Number of teams.
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    fn commit(&mut self, next: BTreeMap<String, Team>) -> Result<()> {
        let index = index_teams(&next)?;
        if let Some(file) = &self.file {
            file.write(&next)?;
        }
        self.teams = next;
        self.index = index;
        Ok(())
    }
}

/// Validate a team map and build its membership index.
fn index_teams(
    teams: &BTreeMap<String, Team>,
) -> Result<HashMap<ParticipantId, String>> {
    let mut index: HashMap<ParticipantId, String> = HashMap::new();
    for (key, team) in teams {
        if key != &team.name {
            return Err(StoreError::InvalidTeam {
                team: key.clone(),
                reason: format!("stored under a different name than {:?}", team.name),
            });
        }
        team.validate().map_err(|reason| StoreError::InvalidTeam {
            team: key.clone(),
            reason,
        })?;
        for member in &team.members {
            if let Some(first) = index.insert(member.clone(), key.clone()) {
                return Err(StoreError::MemberConflict {
                    participant: member.clone(),
                    first,
                    second: key.clone(),
                });
            }
        }
    }
    Ok(index)
}
