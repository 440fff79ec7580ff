//! Team lifecycle transitions.
//!
//! Each transition validates against the team store, commits the new
//! record, and returns the external actions that bring the platform in line
//! with it. Only `create_team` talks to the platform directly: the team's
//! resources must exist before the record that points at them is written.

use crate::action::{Action, NoticeTarget, ResourceKind, Tag};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::participant::Participant;
use crate::platform::Platform;
use crate::reconcile::normalize_resource_name;
use muster_store::{
    now_millis, ClaimStore, ParticipantId, ResourceHandles, ResourceId, Team, TeamStore,
};

/// Validate and normalize a requested team name.
pub fn validate_team_name(config: &EngineConfig, raw: &str) -> Result<String> {
    let name = raw.trim();
    let invalid = |reason: &str| EngineError::InvalidTeamName {
        name: raw.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.chars().count() > config.max_team_name_len {
        return Err(invalid(&format!(
            "longer than {} characters",
            config.max_team_name_len
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("contains control characters"));
    }
    Ok(name.to_string())
}

/// Channel-safe form of a team name: lowercase, words joined by `-`.
pub fn channel_slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub(crate) fn create_team<P: Platform + ?Sized>(
    config: &EngineConfig,
    teams: &mut TeamStore,
    claims: &ClaimStore,
    platform: &mut P,
    game: &str,
    captain: &ParticipantId,
    name: &str,
) -> Result<(Team, Vec<Action>)> {
    let name = validate_team_name(config, name)?;
    let game = config
        .canonical_game(game)
        .ok_or_else(|| EngineError::UnknownGame(game.trim().to_string()))?;
    teams.check_available(&name, captain)?;
    // Names that differ only in case or spacing share channel names.
    let key = normalize_resource_name(&name);
    if let Some(clash) = teams.iter().find(|t| normalize_resource_name(&t.name) == key) {
        return Err(EngineError::NameTaken(clash.name.clone()));
    }

    let resources = create_resources(platform, &name, &game)?;
    let team = Team::new(name, game, captain.clone(), resources.clone(), now_millis());
    if let Err(e) = teams.create(team.clone()) {
        tracing::warn!("Could not persist team {:?}, removing its resources", team.name);
        rollback(platform, &created_list(&resources));
        return Err(e.into());
    }

    let mut actions = vec![Action::CreateResourceGroup {
        team: team.name.clone(),
        group: team.game.clone(),
        role: resources.role.clone(),
        text: resources.text.clone(),
        voice: resources.voice.clone(),
    }];
    actions.extend(enter_actions(config, claims, &team, captain));
    actions.push(Action::notice(
        NoticeTarget::Channel(resources.text.clone()),
        format!(
            "Welcome to **{}**! {} is the captain. Use /invite to add players.",
            team.name,
            captain.mention()
        ),
    ));
    Ok((team, actions))
}

/// Returns whether a new invite was recorded.
pub(crate) fn invite(
    config: &EngineConfig,
    teams: &mut TeamStore,
    name: &str,
    inviter: &ParticipantId,
    target: &Participant,
) -> Result<(bool, Vec<Action>)> {
    let mut team = find(teams, name)?.clone();
    if !team.is_captain(inviter) {
        return Err(EngineError::NotCaptain {
            team: team.name,
            participant: inviter.clone(),
        });
    }
    if let Some(current) = teams.team_of(&target.id) {
        return Err(EngineError::TargetAlreadyTeamed {
            participant: target.id.clone(),
            team: current.name.clone(),
        });
    }
    if target.is_service {
        return Err(EngineError::TargetNotEligible {
            participant: target.id.clone(),
            reason: "service accounts cannot join teams".into(),
        });
    }
    if !target.holds(&config.verified_tag) {
        return Err(EngineError::TargetNotEligible {
            participant: target.id.clone(),
            reason: "not verified".into(),
        });
    }

    if !team.add_invite(&target.id) {
        return Ok((false, Vec::new()));
    }
    teams.replace(team.clone())?;

    let notice = Action::notice(
        NoticeTarget::Participant(target.id.clone()),
        format!(
            "{}, you've been invited to join **{}** ({}). Use /join {} to accept.",
            target.id.mention(),
            team.name,
            team.game,
            team.name
        ),
    );
    Ok((true, vec![notice]))
}

pub(crate) fn join(
    config: &EngineConfig,
    teams: &mut TeamStore,
    claims: &ClaimStore,
    name: &str,
    participant: &ParticipantId,
) -> Result<(Team, Vec<Action>)> {
    let mut team = find(teams, name)?.clone();
    if !team.invites.contains(participant) {
        return Err(EngineError::NotInvited {
            team: team.name,
            participant: participant.clone(),
        });
    }
    if let Some(current) = teams.team_of(participant) {
        return Err(EngineError::AlreadyTeamed {
            participant: participant.clone(),
            team: current.name.clone(),
        });
    }

    team.accept_invite(participant);
    teams.replace(team.clone())?;

    let mut actions = enter_actions(config, claims, &team, participant);
    actions.push(Action::notice(
        NoticeTarget::Channel(team.resources.text.clone()),
        format!("{} joined the team!", participant.mention()),
    ));
    Ok((team, actions))
}

pub(crate) fn kick(
    config: &EngineConfig,
    teams: &mut TeamStore,
    claims: &ClaimStore,
    name: &str,
    captain: &ParticipantId,
    target: &ParticipantId,
) -> Result<(Team, Vec<Action>)> {
    let mut team = find(teams, name)?.clone();
    if !team.is_captain(captain) {
        return Err(EngineError::NotCaptain {
            team: team.name,
            participant: captain.clone(),
        });
    }
    if captain == target {
        return Err(EngineError::CannotKickSelf);
    }
    if !team.remove_member(target) {
        return Err(EngineError::TargetNotMember {
            team: team.name,
            participant: target.clone(),
        });
    }
    teams.replace(team.clone())?;

    let mut actions = exit_actions(config, claims, &team, target);
    actions.push(Action::notice(
        NoticeTarget::Channel(team.resources.text.clone()),
        format!("{} was removed from the team.", target.mention()),
    ));
    Ok((team, actions))
}

pub(crate) fn leave(
    config: &EngineConfig,
    teams: &mut TeamStore,
    claims: &ClaimStore,
    name: &str,
    participant: &ParticipantId,
) -> Result<(Team, Vec<Action>)> {
    let mut team = find(teams, name)?.clone();
    if team.is_captain(participant) {
        return Err(EngineError::CaptainCannotLeave(team.name));
    }
    if !team.remove_member(participant) {
        return Err(EngineError::TargetNotMember {
            team: team.name,
            participant: participant.clone(),
        });
    }
    teams.replace(team.clone())?;

    let mut actions = exit_actions(config, claims, &team, participant);
    actions.push(Action::notice(
        NoticeTarget::Channel(team.resources.text.clone()),
        format!("{} left the team.", participant.mention()),
    ));
    Ok((team, actions))
}

/// Returns the removed record.
pub(crate) fn disband(
    config: &EngineConfig,
    teams: &mut TeamStore,
    claims: &ClaimStore,
    name: &str,
    captain: &ParticipantId,
) -> Result<(Team, Vec<Action>)> {
    let team = find(teams, name)?.clone();
    if !team.is_captain(captain) {
        return Err(EngineError::NotCaptain {
            team: team.name,
            participant: captain.clone(),
        });
    }

    let role = Tag::Role(team.resources.role.clone());
    let mut actions = Vec::new();
    for member in &team.members {
        actions.push(Action::revoke(member, role.clone()));
        actions.extend(solo_after_exit(config, claims, member));
    }
    actions.push(Action::DeleteResource {
        kind: ResourceKind::Text,
        resource: team.resources.text.clone(),
    });
    if let Some(voice) = &team.resources.voice {
        actions.push(Action::DeleteResource {
            kind: ResourceKind::Voice,
            resource: voice.clone(),
        });
    }
    actions.push(Action::DeleteResource {
        kind: ResourceKind::Role,
        resource: team.resources.role.clone(),
    });

    let removed = teams
        .delete(&team.name)?
        .ok_or_else(|| EngineError::TeamNotFound(team.name.clone()))?;
    Ok((removed, actions))
}

fn find<'a>(teams: &'a TeamStore, name: &str) -> Result<&'a Team> {
    teams
        .find(name.trim())
        .ok_or_else(|| EngineError::TeamNotFound(name.trim().to_string()))
}

/// Role, channel access and solo update for a participant entering `team`.
fn enter_actions(
    config: &EngineConfig,
    claims: &ClaimStore,
    team: &Team,
    participant: &ParticipantId,
) -> Vec<Action> {
    let mut actions = vec![Action::grant(
        participant,
        Tag::Role(team.resources.role.clone()),
    )];
    actions.push(Action::access(&team.resources.text, participant, true));
    if let Some(voice) = &team.resources.voice {
        actions.push(Action::access(voice, participant, true));
    }
    if claims.claims_of(participant).is_some() {
        actions.push(Action::revoke(participant, Tag::named(&config.solo_tag)));
    }
    actions
}

/// Reverse of [`enter_actions`].
fn exit_actions(
    config: &EngineConfig,
    claims: &ClaimStore,
    team: &Team,
    participant: &ParticipantId,
) -> Vec<Action> {
    let mut actions = vec![Action::revoke(
        participant,
        Tag::Role(team.resources.role.clone()),
    )];
    actions.push(Action::access(&team.resources.text, participant, false));
    if let Some(voice) = &team.resources.voice {
        actions.push(Action::access(voice, participant, false));
    }
    actions.extend(solo_after_exit(config, claims, participant));
    actions
}

fn solo_after_exit(
    config: &EngineConfig,
    claims: &ClaimStore,
    participant: &ParticipantId,
) -> Option<Action> {
    claims
        .claims_of(participant)
        .map(|_| Action::grant(participant, Tag::named(&config.solo_tag)))
}

fn create_resources<P: Platform + ?Sized>(
    platform: &mut P,
    name: &str,
    game: &str,
) -> Result<ResourceHandles> {
    let mut created: Vec<(ResourceKind, ResourceId)> = Vec::with_capacity(3);
    let role = create_one(platform, &mut created, ResourceKind::Role, name, game)?;
    let text = create_one(platform, &mut created, ResourceKind::Text, &channel_slug(name), game)?;
    let voice = create_one(platform, &mut created, ResourceKind::Voice, name, game)?;
    Ok(ResourceHandles {
        role,
        text,
        voice: Some(voice),
    })
}

/// Create one resource, undoing `created` if it fails.
fn create_one<P: Platform + ?Sized>(
    platform: &mut P,
    created: &mut Vec<(ResourceKind, ResourceId)>,
    kind: ResourceKind,
    name: &str,
    game: &str,
) -> Result<ResourceId> {
    match platform.create_resource(kind, name, game) {
        Ok(id) => {
            tracing::debug!("Created {} {} ({:?})", kind, id, name);
            created.push((kind, id.clone()));
            Ok(id)
        }
        Err(e) => {
            tracing::warn!("Creating {} {:?} failed: {}", kind, name, e);
            rollback(platform, created);
            Err(EngineError::ResourceCreation(e))
        }
    }
}

fn created_list(resources: &ResourceHandles) -> Vec<(ResourceKind, ResourceId)> {
    let mut list = vec![
        (ResourceKind::Role, resources.role.clone()),
        (ResourceKind::Text, resources.text.clone()),
    ];
    if let Some(voice) = &resources.voice {
        list.push((ResourceKind::Voice, voice.clone()));
    }
    list
}

/// Delete freshly created resources, newest first.
fn rollback<P: Platform + ?Sized>(platform: &mut P, created: &[(ResourceKind, ResourceId)]) {
    for (kind, id) in created.iter().rev() {
        if let Err(e) = platform.delete_resource(*kind, id) {
            tracing::warn!("Rollback of {} {} failed: {}", kind, id, e);
        }
    }
}
