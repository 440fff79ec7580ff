//! Rebuilding the stores from the platform's current state.
//!
//! The persisted stores are a cache of what the platform shows: who holds
//! which team role, which channels exist, who carries the verified tag.
//! When the cache is lost or drifts, these functions compute a complete
//! replacement from an [`ExternalSnapshot`]. Nothing here commits; the
//! [`Engine`](crate::Engine) decides whether a plan is applied.
//!
//! Two heuristics are involved and both are reported as such:
//!
//! - A team's captain is taken from the first mention in its channel's
//!   earliest message. Without one, the lowest participant id among the
//!   role holders is used and the team is flagged
//!   [`CaptainSource::ArbitraryMember`].
//! - A verified participant without a claim is linked to the identity
//!   whose label matches their display label, but only when exactly one
//!   identity matches. Shared labels are never guessed.

use crate::action::Action;
use crate::config::EngineConfig;
use crate::participant::Participant;
use crate::verify::verification_actions;
use muster_roster::{IdentityId, LabelMatch, RosterTable};
use muster_store::{now_millis, ParticipantId, ResourceHandles, ResourceId, Team};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A message in a text resource's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unix milliseconds
    pub timestamp: u64,
    pub author: ParticipantId,
    #[serde(default)]
    pub mentions: Vec<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResource {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResource {
    pub id: ResourceId,
    pub name: String,
    /// Participants currently holding the role
    #[serde(default)]
    pub holders: Vec<ParticipantId>,
}

/// A category of resources (one per game).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
    #[serde(default)]
    pub texts: Vec<TextResource>,
    #[serde(default)]
    pub voices: Vec<NamedResource>,
    #[serde(default)]
    pub roles: Vec<RoleResource>,
}

/// Everything reconciliation reads from the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSnapshot {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub groups: Vec<ResourceGroup>,
}

/// Which stores a reconciliation run rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileScope {
    Claims,
    Teams,
    /// Both stores, plus healing of unverified team members
    All,
}

impl ReconcileScope {
    pub fn includes_claims(self) -> bool {
        matches!(self, Self::Claims | Self::All)
    }

    pub fn includes_teams(self) -> bool {
        matches!(self, Self::Teams | Self::All)
    }
}

impl std::fmt::Display for ReconcileScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Claims => write!(f, "claims"),
            Self::Teams => write!(f, "teams"),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for ReconcileScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claims" => Ok(Self::Claims),
            "teams" => Ok(Self::Teams),
            "all" => Ok(Self::All),
            other => Err(format!("unknown scope {:?} (claims, teams, all)", other)),
        }
    }
}

/// Lowercase with whitespace, `-` and `_` removed.
pub fn normalize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

// --- Teams ---

/// How a rebuilt team's captain was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptainSource {
    /// First participant mentioned in the channel's earliest message
    FirstMention,
    /// No usable mention; lowest participant id among the holders
    ArbitraryMember,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuiltTeam {
    pub name: String,
    pub captain: ParticipantId,
    pub captain_source: CaptainSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No text resource in the group has the role's name
    NoMatchingText,
    /// Nobody (left) holds the role
    NoHolders,
    /// An earlier role already produced a team with this name
    DuplicateName,
    /// The participant already belongs to an earlier team
    MemberConflict {
        participant: ParticipantId,
        kept_in: String,
    },
}

/// A role that did not become a team, or a holder that was dropped from one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSkip {
    pub team: String,
    pub group: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRebuild {
    pub teams: BTreeMap<String, Team>,
    pub rebuilt: Vec<RebuiltTeam>,
    pub skipped: Vec<TeamSkip>,
}

/// Rebuild the whole team store from the snapshot.
///
/// Roles are visited in snapshot order. A participant holding several team
/// roles stays in the first and is reported for the rest; captain
/// inference only considers the holders that remain.
pub fn rebuild_teams(snapshot: &ExternalSnapshot) -> TeamRebuild {
    let mut out = TeamRebuild::default();
    let mut owner: HashMap<ParticipantId, String> = HashMap::new();
    // Normalized names of the teams rebuilt so far
    let mut taken: HashSet<String> = HashSet::new();

    for group in &snapshot.groups {
        for role in &group.roles {
            let skip = |reason| TeamSkip {
                team: role.name.clone(),
                group: group.name.clone(),
                reason,
            };

            let key = normalize_resource_name(&role.name);
            let Some(text) = group
                .texts
                .iter()
                .find(|t| normalize_resource_name(&t.name) == key)
            else {
                out.skipped.push(skip(SkipReason::NoMatchingText));
                continue;
            };
            if taken.contains(&key) {
                out.skipped.push(skip(SkipReason::DuplicateName));
                continue;
            }

            let mut holders: Vec<ParticipantId> = Vec::new();
            for holder in &role.holders {
                if holders.contains(holder) {
                    continue;
                }
                if let Some(first) = owner.get(holder) {
                    out.skipped.push(skip(SkipReason::MemberConflict {
                        participant: holder.clone(),
                        kept_in: first.clone(),
                    }));
                    continue;
                }
                holders.push(holder.clone());
            }
            let Some(lowest) = holders.iter().min().cloned() else {
                out.skipped.push(skip(SkipReason::NoHolders));
                continue;
            };

            let (captain, captain_source) = infer_captain(text, &holders, lowest);
            if captain_source == CaptainSource::ArbitraryMember {
                tracing::warn!(
                    "No captain mention for {:?}; picked {} arbitrarily",
                    role.name,
                    captain
                );
            }
            let mut members = vec![captain.clone()];
            members.extend(holders.into_iter().filter(|h| *h != captain));

            let voice = group
                .voices
                .iter()
                .find(|v| normalize_resource_name(&v.name) == key)
                .map(|v| v.id.clone());
            let created_at = text
                .history
                .iter()
                .map(|m| m.timestamp)
                .min()
                .unwrap_or_else(now_millis);

            for member in &members {
                owner.insert(member.clone(), role.name.clone());
            }
            taken.insert(key.clone());
            out.rebuilt.push(RebuiltTeam {
                name: role.name.clone(),
                captain: captain.clone(),
                captain_source,
            });
            out.teams.insert(
                role.name.clone(),
                Team {
                    name: role.name.clone(),
                    game: group.name.clone(),
                    captain,
                    members,
                    invites: BTreeSet::new(),
                    resources: ResourceHandles {
                        role: role.id.clone(),
                        text: text.id.clone(),
                        voice,
                    },
                    created_at,
                },
            );
        }
    }
    out
}

fn infer_captain(
    text: &TextResource,
    holders: &[ParticipantId],
    lowest: ParticipantId,
) -> (ParticipantId, CaptainSource) {
    let mentioned = text
        .history
        .iter()
        .min_by_key(|m| m.timestamp)
        .and_then(|m| m.mentions.first())
        .filter(|p| holders.contains(p));
    if let Some(captain) = mentioned {
        return (captain.clone(), CaptainSource::FirstMention);
    }
    (lowest, CaptainSource::ArbitraryMember)
}

// --- Claims ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum ClaimResolution {
    Claimed {
        participant: ParticipantId,
        identity: IdentityId,
    },
    NotFound {
        participant: ParticipantId,
        label: String,
    },
    Ambiguous {
        participant: ParticipantId,
        label: String,
        candidates: Vec<IdentityId>,
    },
    /// The only matching identity belongs to someone else
    AlreadyClaimed {
        participant: ParticipantId,
        identity: IdentityId,
        claimant: ParticipantId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimRebuild {
    pub claims: BTreeMap<IdentityId, ParticipantId>,
    pub resolutions: Vec<ClaimResolution>,
}

/// Resolve one participant's label against the roster.
///
/// Never overwrites a claim in `claims`.
fn resolve_label(
    roster: &RosterTable,
    claims: &BTreeMap<IdentityId, ParticipantId>,
    participant: &Participant,
) -> ClaimResolution {
    let label = participant.display_label.clone();
    let id = participant.id.clone();
    match roster.candidates(&label) {
        LabelMatch::NotFound => ClaimResolution::NotFound {
            participant: id,
            label,
        },
        LabelMatch::Ambiguous { candidates } => ClaimResolution::Ambiguous {
            participant: id,
            label,
            candidates,
        },
        LabelMatch::Unique { identity } => match claims.get(&identity) {
            Some(claimant) => ClaimResolution::AlreadyClaimed {
                participant: id,
                identity,
                claimant: claimant.clone(),
            },
            None => ClaimResolution::Claimed {
                participant: id,
                identity,
            },
        },
    }
}

/// Extend `existing` with claims for verified participants that lack one.
pub fn rebuild_claims(
    roster: &RosterTable,
    config: &EngineConfig,
    existing: &BTreeMap<IdentityId, ParticipantId>,
    participants: &[Participant],
) -> ClaimRebuild {
    let mut claims = existing.clone();
    let mut claimed: HashSet<ParticipantId> = claims.values().cloned().collect();
    let mut resolutions = Vec::new();

    for participant in participants {
        if participant.is_service
            || !participant.holds(&config.verified_tag)
            || claimed.contains(&participant.id)
        {
            continue;
        }
        let resolution = resolve_label(roster, &claims, participant);
        if let ClaimResolution::Claimed {
            participant,
            identity,
        } = &resolution
        {
            claims.insert(identity.clone(), participant.clone());
            claimed.insert(participant.clone());
        }
        resolutions.push(resolution);
    }

    ClaimRebuild {
        claims,
        resolutions,
    }
}

// --- Healing ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HealOutcome {
    /// The participant already held a claim
    Reverified { identity: IdentityId },
    /// A new claim was resolved from the display label
    Claimed { identity: IdentityId },
    Unresolved { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healing {
    pub participant: ParticipantId,
    #[serde(flatten)]
    pub outcome: HealOutcome,
}

/// Verify team members who lack the verified tag.
///
/// Reuses an existing claim when there is one, otherwise applies the
/// unique-label rule. New claims are added to `claims`.
pub fn heal(
    roster: &RosterTable,
    config: &EngineConfig,
    claims: &mut BTreeMap<IdentityId, ParticipantId>,
    teams: &BTreeMap<String, Team>,
    participants: &[Participant],
) -> (Vec<Healing>, Vec<Action>) {
    let members: HashSet<&ParticipantId> = teams.values().flat_map(|t| t.members.iter()).collect();
    let mut healed = Vec::new();
    let mut actions = Vec::new();

    for participant in participants {
        if participant.is_service
            || participant.holds(&config.verified_tag)
            || !members.contains(&participant.id)
        {
            continue;
        }

        let held = claims
            .iter()
            .find(|(_, p)| **p == participant.id)
            .map(|(identity, _)| identity.clone());
        let outcome = match held {
            Some(identity) => HealOutcome::Reverified { identity },
            None => match resolve_label(roster, claims, participant) {
                ClaimResolution::Claimed { identity, .. } => {
                    claims.insert(identity.clone(), participant.id.clone());
                    HealOutcome::Claimed { identity }
                }
                ClaimResolution::NotFound { label, .. } => HealOutcome::Unresolved {
                    reason: format!("no identity labelled {:?}", label),
                },
                ClaimResolution::Ambiguous {
                    label, candidates, ..
                } => HealOutcome::Unresolved {
                    reason: format!("label {:?} matches {} identities", label, candidates.len()),
                },
                ClaimResolution::AlreadyClaimed {
                    identity, claimant, ..
                } => HealOutcome::Unresolved {
                    reason: format!("identity {} is claimed by {}", identity, claimant),
                },
            },
        };

        let identity = match &outcome {
            HealOutcome::Reverified { identity } | HealOutcome::Claimed { identity } => {
                roster.get(identity.as_str())
            }
            HealOutcome::Unresolved { reason } => {
                tracing::info!("Could not heal {}: {}", participant.id, reason);
                None
            }
        };
        if let Some(identity) = identity {
            actions.extend(verification_actions(
                config,
                identity,
                &participant.id,
                true,
                None,
            ));
        }
        healed.push(Healing {
            participant: participant.id.clone(),
            outcome,
        });
    }
    (healed, actions)
}

// --- Plan ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsReport {
    /// Claims in the rebuilt store
    pub total: usize,
    pub resolutions: Vec<ClaimResolution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamsReport {
    /// Teams in the rebuilt store
    pub total: usize,
    pub rebuilt: Vec<RebuiltTeam>,
    pub skipped: Vec<TeamSkip>,
}

/// Outcome of a scan or fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub scope: ReconcileScope,
    /// Whether the stores were replaced
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<ClaimsReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<TeamsReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub healing: Vec<Healing>,
}

/// Replacement stores and the actions that go with them.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub claims: Option<BTreeMap<IdentityId, ParticipantId>>,
    pub teams: Option<BTreeMap<String, Team>>,
    pub actions: Vec<Action>,
    pub report: ReconcileReport,
}

/// Compute everything a reconciliation of `scope` would change.
pub fn plan(
    roster: &RosterTable,
    config: &EngineConfig,
    existing_claims: &BTreeMap<IdentityId, ParticipantId>,
    snapshot: &ExternalSnapshot,
    scope: ReconcileScope,
) -> ReconcilePlan {
    let mut report = ReconcileReport {
        scope,
        committed: false,
        claims: None,
        teams: None,
        healing: Vec::new(),
    };

    let teams = scope.includes_teams().then(|| {
        let rebuild = rebuild_teams(snapshot);
        report.teams = Some(TeamsReport {
            total: rebuild.teams.len(),
            rebuilt: rebuild.rebuilt,
            skipped: rebuild.skipped,
        });
        rebuild.teams
    });

    let mut claims = scope.includes_claims().then(|| {
        let rebuild = rebuild_claims(roster, config, existing_claims, &snapshot.participants);
        report.claims = Some(ClaimsReport {
            total: rebuild.claims.len(),
            resolutions: rebuild.resolutions,
        });
        rebuild.claims
    });

    let mut actions = Vec::new();
    if let (ReconcileScope::All, Some(claims), Some(teams)) = (scope, claims.as_mut(), &teams) {
        let (healing, heal_actions) = heal(roster, config, claims, teams, &snapshot.participants);
        if let Some(summary) = report.claims.as_mut() {
            summary.total = claims.len();
        }
        report.healing = healing;
        actions = heal_actions;
    }

    ReconcilePlan {
        claims,
        teams,
        actions,
        report,
    }
}
