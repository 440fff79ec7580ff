//! Verification: linking a participant to a roster identity.

use crate::action::{Action, NoticeTarget, Tag};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use muster_roster::{Identity, IdentityId, RosterTable};
use muster_store::{ClaimOutcome, ClaimStore, ParticipantId, TeamStore};
use serde::{Deserialize, Serialize};

/// A committed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verified {
    pub identity: IdentityId,
    pub participant: ParticipantId,
    /// Nickname applied to the participant
    pub display_label: String,
    pub outcome: ClaimOutcome,
}

/// Claim `raw` for `participant` and compute the resulting actions.
///
/// The claim is durable before any action is returned. A participant that
/// already holds a different identity is moved to the new one.
pub fn verify(
    roster: &RosterTable,
    claims: &mut ClaimStore,
    teams: &TeamStore,
    config: &EngineConfig,
    raw: &str,
    participant: &ParticipantId,
) -> Result<(Verified, Vec<Action>)> {
    let identity = IdentityId::parse(raw)
        .and_then(|id| roster.get(id.as_str()))
        .ok_or_else(|| EngineError::UnknownIdentity(raw.trim().to_string()))?;

    if let Some(claimant) = claims.claimant_of(identity.id.as_str()) {
        if claimant != participant {
            return Err(EngineError::AlreadyClaimedByOther {
                identity: identity.id.clone(),
                claimant: claimant.clone(),
            });
        }
    }

    let outcome = claims.claim(&identity.id, participant)?;
    let previous = match &outcome {
        ClaimOutcome::Replaced { previous } => roster.get(previous.as_str()),
        _ => None,
    };

    let teamed = teams.team_of(participant).is_some();
    let mut actions = verification_actions(config, identity, participant, teamed, previous);
    actions.push(Action::notice(
        NoticeTarget::Participant(participant.clone()),
        format!("{}, you've been verified!", participant.mention()),
    ));

    Ok((
        Verified {
            identity: identity.id.clone(),
            participant: participant.clone(),
            display_label: identity.display_label.clone(),
            outcome,
        },
        actions,
    ))
}

/// Tags and label a participant verified as `identity` should carry.
///
/// Order: nickname, verified tag, attribute tags, solo tag (unless
/// `teamed`), removal of the unverified tag, then removal of attribute tags
/// only the `previous` identity carried.
pub fn verification_actions(
    config: &EngineConfig,
    identity: &Identity,
    participant: &ParticipantId,
    teamed: bool,
    previous: Option<&Identity>,
) -> Vec<Action> {
    let mut actions = Vec::new();
    if !identity.display_label.is_empty() {
        actions.push(Action::SetDisplayLabel {
            participant: participant.clone(),
            label: identity.display_label.clone(),
        });
    }
    actions.push(Action::grant(participant, Tag::named(&config.verified_tag)));
    for tag in &identity.tags {
        actions.push(Action::grant(participant, Tag::named(tag)));
    }
    if !teamed {
        actions.push(Action::grant(participant, Tag::named(&config.solo_tag)));
    }
    actions.push(Action::revoke(participant, Tag::named(&config.unverified_tag)));

    if let Some(previous) = previous {
        for tag in previous.tags.difference(&identity.tags) {
            actions.push(Action::revoke(participant, Tag::named(tag)));
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_roster::RosterRow;
    use muster_store::{ResourceHandles, ResourceId, Team};

    fn roster() -> RosterTable {
        RosterTable::from_rows(vec![
            RosterRow::new("S1", "Alice Stone", Some("valorant")),
            RosterRow::new("S1", "", Some("chess")),
            RosterRow::new("S2", "Bruno Cruz", Some("chess")),
        ])
    }

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    #[test]
    fn verify_commits_claim_and_emits_actions() {
        let roster = roster();
        let mut claims = ClaimStore::in_memory();
        let teams = TeamStore::in_memory();
        let config = EngineConfig::default();

        let (verified, actions) =
            verify(&roster, &mut claims, &teams, &config, " S1 ", &p("p1")).unwrap();

        assert_eq!(verified.identity.as_str(), "S1");
        assert_eq!(verified.display_label, "Alice");
        assert_eq!(verified.outcome, ClaimOutcome::Created);
        assert_eq!(claims.claimant_of("S1"), Some(&p("p1")));

        assert_eq!(
            actions,
            vec![
                Action::SetDisplayLabel {
                    participant: p("p1"),
                    label: "Alice".into(),
                },
                Action::grant(&p("p1"), Tag::named("Verified")),
                Action::grant(&p("p1"), Tag::named("chess")),
                Action::grant(&p("p1"), Tag::named("valorant")),
                Action::grant(&p("p1"), Tag::named("Solo")),
                Action::revoke(&p("p1"), Tag::named("Unverified")),
                Action::notice(
                    NoticeTarget::Participant(p("p1")),
                    "<@p1>, you've been verified!"
                ),
            ]
        );
    }

    #[test]
    fn unknown_identity_changes_nothing() {
        let roster = roster();
        let mut claims = ClaimStore::in_memory();
        let teams = TeamStore::in_memory();
        let config = EngineConfig::default();
        verify(&roster, &mut claims, &teams, &config, "S1", &p("p1")).unwrap();

        let err = verify(&roster, &mut claims, &teams, &config, "S9", &p("p1")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownIdentity(ref id) if id == "S9"));
        assert_eq!(claims.claims_of(&p("p1")).unwrap().as_str(), "S1");

        let err = verify(&roster, &mut claims, &teams, &config, "  ", &p("p1")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownIdentity(_)));
    }

    #[test]
    fn claimed_by_other_is_a_conflict() {
        let roster = roster();
        let mut claims = ClaimStore::in_memory();
        let teams = TeamStore::in_memory();
        let config = EngineConfig::default();
        verify(&roster, &mut claims, &teams, &config, "S1", &p("p1")).unwrap();

        let err = verify(&roster, &mut claims, &teams, &config, "S1", &p("p2")).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimedByOther { .. }));
        assert!(claims.claims_of(&p("p2")).is_none());
    }

    #[test]
    fn reclaim_moves_claim_and_revokes_stale_tags() {
        let roster = roster();
        let mut claims = ClaimStore::in_memory();
        let teams = TeamStore::in_memory();
        let config = EngineConfig::default();
        verify(&roster, &mut claims, &teams, &config, "S1", &p("p1")).unwrap();

        let (verified, actions) =
            verify(&roster, &mut claims, &teams, &config, "S2", &p("p1")).unwrap();
        assert!(matches!(verified.outcome, ClaimOutcome::Replaced { .. }));
        assert!(claims.claimant_of("S1").is_none());
        assert!(actions.contains(&Action::revoke(&p("p1"), Tag::named("valorant"))));
        assert!(!actions.contains(&Action::revoke(&p("p1"), Tag::named("chess"))));

        // The old identity is free again.
        verify(&roster, &mut claims, &teams, &config, "S1", &p("p2")).unwrap();
    }

    #[test]
    fn teamed_participant_gets_no_solo_tag() {
        let roster = roster();
        let mut claims = ClaimStore::in_memory();
        let mut teams = TeamStore::in_memory();
        let config = EngineConfig::default();
        teams
            .create(Team::new(
                "Alpha".into(),
                "valorant".into(),
                p("p1"),
                ResourceHandles {
                    role: ResourceId::new("r"),
                    text: ResourceId::new("t"),
                    voice: None,
                },
                0,
            ))
            .unwrap();

        let (_, actions) = verify(&roster, &mut claims, &teams, &config, "S1", &p("p1")).unwrap();
        assert!(!actions.contains(&Action::grant(&p("p1"), Tag::named("Solo"))));
    }

    #[test]
    fn reverify_same_identity_is_idempotent() {
        let roster = roster();
        let mut claims = ClaimStore::in_memory();
        let teams = TeamStore::in_memory();
        let config = EngineConfig::default();
        verify(&roster, &mut claims, &teams, &config, "S1", &p("p1")).unwrap();

        let (verified, _) = verify(&roster, &mut claims, &teams, &config, "S1", &p("p1")).unwrap();
        assert_eq!(verified.outcome, ClaimOutcome::AlreadyHeld);
        assert_eq!(claims.len(), 1);
    }
}
