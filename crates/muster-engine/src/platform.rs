//! Capability interface to the external community platform.
//!
//! The engine calls [`Platform::create_resource`] inline while creating a
//! team, because the handles must be recorded before the team is
//! persisted. Every other action is applied after the store commit with
//! [`apply_best_effort`]: failures are logged and reported, never rolled
//! back.

use crate::action::{Action, NoticeTarget, ResourceKind, Tag};
use muster_store::{ParticipantId, ResourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the external platform.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("resource missing: {0}")]
    ResourceMissing(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// Operations the engine needs from the community platform.
pub trait Platform {
    /// Create a resource and return its handle.
    fn create_resource(
        &mut self,
        kind: ResourceKind,
        name: &str,
        group: &str,
    ) -> Result<ResourceId, PlatformError>;

    /// Delete a resource.
    fn delete_resource(&mut self, kind: ResourceKind, resource: &ResourceId)
        -> Result<(), PlatformError>;

    /// Give a participant a tag.
    fn grant_tag(&mut self, participant: &ParticipantId, tag: &Tag) -> Result<(), PlatformError>;

    /// Take a tag from a participant.
    fn revoke_tag(&mut self, participant: &ParticipantId, tag: &Tag) -> Result<(), PlatformError>;

    /// Allow or deny a participant access to a resource.
    fn set_access(
        &mut self,
        resource: &ResourceId,
        participant: &ParticipantId,
        allow: bool,
    ) -> Result<(), PlatformError>;

    /// Change a participant's display label.
    fn set_display_label(
        &mut self,
        participant: &ParticipantId,
        label: &str,
    ) -> Result<(), PlatformError>;

    /// Deliver a notice.
    fn notify(&mut self, target: &NoticeTarget, text: &str) -> Result<(), PlatformError>;
}

/// Carry out one action.
///
/// `CreateResourceGroup` only records creation that already happened, so
/// it dispatches to nothing.
pub fn dispatch<P: Platform + ?Sized>(platform: &mut P, action: &Action) -> Result<(), PlatformError> {
    match action {
        Action::SetDisplayLabel { participant, label } => {
            platform.set_display_label(participant, label)
        }
        Action::GrantTag { participant, tag } => platform.grant_tag(participant, tag),
        Action::RevokeTag { participant, tag } => platform.revoke_tag(participant, tag),
        Action::CreateResourceGroup { .. } => Ok(()),
        Action::DeleteResource { kind, resource } => platform.delete_resource(*kind, resource),
        Action::SetResourceAccess {
            resource,
            participant,
            allow,
        } => platform.set_access(resource, participant, *allow),
        Action::SendNotice { target, text } => platform.notify(target, text),
    }
}

/// An action the platform rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub action: Action,
    pub error: PlatformError,
}

/// Outcome of applying a batch of best-effort actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Actions the platform accepted
    pub applied: usize,
    /// Actions the platform rejected, in order
    pub failures: Vec<ActionFailure>,
}

impl ApplyReport {
    /// True when every action was accepted.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply actions in order, continuing past failures.
pub fn apply_best_effort<P: Platform + ?Sized>(platform: &mut P, actions: &[Action]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for action in actions {
        match dispatch(platform, action) {
            Ok(()) => {
                tracing::debug!("Applied {}", action);
                report.applied += 1;
            }
            Err(error) => {
                tracing::warn!("External action {} failed: {}", action, error);
                report.failures.push(ActionFailure {
                    action: action.clone(),
                    error,
                });
            }
        }
    }
    report
}

/// A platform that records actions for an out-of-process adapter.
///
/// Resource handles are minted locally from a Blake3 hash of the kind,
/// group and name, so the adapter can map them onto real objects.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<Action>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded actions, oldest first.
    pub fn entries(&self) -> &[Action] {
        &self.entries
    }

    /// Drain the recorded actions.
    pub fn take(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.entries)
    }

    /// Handle minted for a resource.
    pub fn handle_for(kind: ResourceKind, name: &str, group: &str) -> ResourceId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(group.as_bytes());
        hasher.update(b":");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        ResourceId::new(format!("{}-{}", kind, hex::encode(&digest.as_bytes()[..8])))
    }
}

impl Platform for Journal {
    fn create_resource(
        &mut self,
        kind: ResourceKind,
        name: &str,
        group: &str,
    ) -> Result<ResourceId, PlatformError> {
        Ok(Self::handle_for(kind, name, group))
    }

    fn delete_resource(
        &mut self,
        kind: ResourceKind,
        resource: &ResourceId,
    ) -> Result<(), PlatformError> {
        self.entries.push(Action::DeleteResource {
            kind,
            resource: resource.clone(),
        });
        Ok(())
    }

    fn grant_tag(&mut self, participant: &ParticipantId, tag: &Tag) -> Result<(), PlatformError> {
        self.entries.push(Action::grant(participant, tag.clone()));
        Ok(())
    }

    fn revoke_tag(&mut self, participant: &ParticipantId, tag: &Tag) -> Result<(), PlatformError> {
        self.entries.push(Action::revoke(participant, tag.clone()));
        Ok(())
    }

    fn set_access(
        &mut self,
        resource: &ResourceId,
        participant: &ParticipantId,
        allow: bool,
    ) -> Result<(), PlatformError> {
        self.entries.push(Action::access(resource, participant, allow));
        Ok(())
    }

    fn set_display_label(
        &mut self,
        participant: &ParticipantId,
        label: &str,
    ) -> Result<(), PlatformError> {
        self.entries.push(Action::SetDisplayLabel {
            participant: participant.clone(),
            label: label.to_string(),
        });
        Ok(())
    }

    fn notify(&mut self, target: &NoticeTarget, text: &str) -> Result<(), PlatformError> {
        self.entries.push(Action::notice(target.clone(), text));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable platform for tests.

    use super::*;

    /// Records calls like [`Journal`] and fails the operations it is told to.
    #[derive(Debug, Default)]
    pub struct ScriptedPlatform {
        pub journal: Journal,
        pub created: Vec<(ResourceKind, ResourceId)>,
        pub fail_create: Vec<ResourceKind>,
        pub fail_labels: bool,
        pub fail_notices: bool,
    }

    impl ScriptedPlatform {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entries(&self) -> &[Action] {
            self.journal.entries()
        }
    }

    impl Platform for ScriptedPlatform {
        fn create_resource(
            &mut self,
            kind: ResourceKind,
            name: &str,
            group: &str,
        ) -> Result<ResourceId, PlatformError> {
            if self.fail_create.contains(&kind) {
                return Err(PlatformError::PermissionDenied(format!("create {}", kind)));
            }
            let id = self.journal.create_resource(kind, name, group)?;
            self.created.push((kind, id.clone()));
            Ok(id)
        }

        fn delete_resource(
            &mut self,
            kind: ResourceKind,
            resource: &ResourceId,
        ) -> Result<(), PlatformError> {
            self.created.retain(|(_, id)| id != resource);
            self.journal.delete_resource(kind, resource)
        }

        fn grant_tag(&mut self, participant: &ParticipantId, tag: &Tag) -> Result<(), PlatformError> {
            self.journal.grant_tag(participant, tag)
        }

        fn revoke_tag(&mut self, participant: &ParticipantId, tag: &Tag) -> Result<(), PlatformError> {
            self.journal.revoke_tag(participant, tag)
        }

        fn set_access(
            &mut self,
            resource: &ResourceId,
            participant: &ParticipantId,
            allow: bool,
        ) -> Result<(), PlatformError> {
            self.journal.set_access(resource, participant, allow)
        }

        fn set_display_label(
            &mut self,
            participant: &ParticipantId,
            label: &str,
        ) -> Result<(), PlatformError> {
            if self.fail_labels {
                return Err(PlatformError::PermissionDenied("nickname".into()));
            }
            self.journal.set_display_label(participant, label)
        }

        fn notify(&mut self, target: &NoticeTarget, text: &str) -> Result<(), PlatformError> {
            if self.fail_notices {
                return Err(PlatformError::Unavailable("messages".into()));
            }
            self.journal.notify(target, text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedPlatform;
    use super::*;

    #[test]
    fn handles_are_deterministic() {
        let a = Journal::handle_for(ResourceKind::Role, "Alpha", "valorant");
        let b = Journal::handle_for(ResourceKind::Role, "Alpha", "valorant");
        let c = Journal::handle_for(ResourceKind::Text, "Alpha", "valorant");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("role-"));
    }

    #[test]
    fn journal_records_in_order() {
        let mut journal = Journal::new();
        let p = ParticipantId::new("p1");
        let actions = vec![
            Action::grant(&p, Tag::named("Verified")),
            Action::notice(NoticeTarget::Participant(p.clone()), "hello"),
        ];

        let report = apply_best_effort(&mut journal, &actions);
        assert!(report.is_clean());
        assert_eq!(report.applied, 2);
        assert_eq!(journal.take(), actions);
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn best_effort_continues_past_failures() {
        let mut platform = ScriptedPlatform::new();
        platform.fail_labels = true;
        let p = ParticipantId::new("p1");
        let actions = vec![
            Action::SetDisplayLabel {
                participant: p.clone(),
                label: "Alice".into(),
            },
            Action::grant(&p, Tag::named("Verified")),
        ];

        let report = apply_best_effort(&mut platform, &actions);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].action, actions[0]);
        assert_eq!(platform.entries(), &actions[1..]);
    }
}
