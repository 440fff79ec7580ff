//! The engine facade.
//!
//! [`Engine`] owns the roster and both stores. Every transition takes
//! `&mut self`, so callers that share an engine must serialize access; the
//! node does this with a single worker task. A transition validates,
//! commits durably, and only then hands its actions to the platform with
//! [`apply_best_effort`].

use crate::action::{Action, NoticeTarget, Tag};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::lifecycle;
use crate::participant::Participant;
use crate::platform::{apply_best_effort, ApplyReport, Platform};
use crate::reconcile::{self, ExternalSnapshot, ReconcileReport, ReconcileScope};
use crate::slots::{RoleSlots, SlotTable, ToggleOutcome};
use crate::verify::{self, Verified};
use muster_roster::RosterTable;
use muster_store::{ClaimStore, ParticipantId, RestoreTarget, StoreError, Team, TeamStore};
use serde::{Deserialize, Serialize};

/// Result of a transition together with its external effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applied<T> {
    pub value: T,
    /// Actions handed to the platform, in order
    pub actions: Vec<Action>,
    pub report: ApplyReport,
}

/// Counts reported by [`Engine::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub identities: usize,
    pub claims: usize,
    pub teams: usize,
}

/// Outcome of [`Engine::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restored {
    pub target: RestoreTarget,
    pub records: usize,
}

/// Roster, claims, teams and role slots behind one serialized API.
pub struct Engine {
    config: EngineConfig,
    roster: RosterTable,
    claims: ClaimStore,
    teams: TeamStore,
    slots: RoleSlots,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        roster: RosterTable,
        claims: ClaimStore,
        teams: TeamStore,
    ) -> Self {
        let slots = RoleSlots::new(SlotTable::default(), config.slot_cap);
        Self {
            config,
            roster,
            claims,
            teams,
            slots,
        }
    }

    /// Replace the role-slot table.
    #[must_use]
    pub fn with_slot_table(mut self, table: SlotTable) -> Self {
        self.slots = RoleSlots::new(table, self.config.slot_cap);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn roster(&self) -> &RosterTable {
        &self.roster
    }

    pub fn claims(&self) -> &ClaimStore {
        &self.claims
    }

    pub fn teams(&self) -> &TeamStore {
        &self.teams
    }

    pub fn slots(&self) -> &RoleSlots {
        &self.slots
    }

    /// Check if `participant` holds a claim.
    pub fn is_verified(&self, participant: &ParticipantId) -> bool {
        self.claims.claims_of(participant).is_some()
    }

    /// Verified and on no team.
    pub fn solo_status(&self, participant: &ParticipantId) -> bool {
        self.is_verified(participant) && self.teams.team_of(participant).is_none()
    }

    pub fn status(&self) -> Status {
        Status {
            identities: self.roster.len(),
            claims: self.claims.len(),
            teams: self.teams.len(),
        }
    }

    /// Claim an identity for `participant`.
    pub fn verify<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        raw: &str,
        participant: &ParticipantId,
    ) -> Result<Applied<Verified>> {
        let (verified, actions) = verify::verify(
            &self.roster,
            &mut self.claims,
            &self.teams,
            &self.config,
            raw,
            participant,
        )?;
        tracing::info!(
            "Verified {} as {} ({:?})",
            participant,
            verified.identity,
            verified.outcome
        );
        Ok(finish(platform, verified, actions))
    }

    /// Greet a newly joined participant.
    pub fn welcome<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        participant: &ParticipantId,
    ) -> Applied<()> {
        let actions = vec![
            Action::grant(participant, Tag::named(&self.config.unverified_tag)),
            Action::notice(
                NoticeTarget::FirstChannelNamed(self.config.welcome_channels.clone()),
                format!(
                    "Welcome {}! Use /verify with your ID number to get access.",
                    participant.mention()
                ),
            ),
        ];
        tracing::debug!("Welcoming {}", participant);
        finish(platform, (), actions)
    }

    pub fn create_team<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        game: &str,
        captain: &ParticipantId,
        name: &str,
    ) -> Result<Applied<Team>> {
        let (team, actions) = lifecycle::create_team(
            &self.config,
            &mut self.teams,
            &self.claims,
            platform,
            game,
            captain,
            name,
        )?;
        tracing::info!("Created team {:?} ({}) led by {}", team.name, team.game, captain);
        Ok(finish(platform, team, actions))
    }

    /// Invite `target`; the value is false when the invite already existed.
    pub fn invite<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        team: &str,
        inviter: &ParticipantId,
        target: &Participant,
    ) -> Result<Applied<bool>> {
        let (created, actions) =
            lifecycle::invite(&self.config, &mut self.teams, team, inviter, target)?;
        if created {
            tracing::info!("{} invited {} to {:?}", inviter, target.id, team);
        }
        Ok(finish(platform, created, actions))
    }

    pub fn join<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        team: &str,
        participant: &ParticipantId,
    ) -> Result<Applied<Team>> {
        let (team, actions) =
            lifecycle::join(&self.config, &mut self.teams, &self.claims, team, participant)?;
        tracing::info!("{} joined {:?}", participant, team.name);
        Ok(finish(platform, team, actions))
    }

    pub fn kick<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        team: &str,
        captain: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<Applied<Team>> {
        let (team, actions) = lifecycle::kick(
            &self.config,
            &mut self.teams,
            &self.claims,
            team,
            captain,
            target,
        )?;
        tracing::info!("{} kicked {} from {:?}", captain, target, team.name);
        Ok(finish(platform, team, actions))
    }

    pub fn leave<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        team: &str,
        participant: &ParticipantId,
    ) -> Result<Applied<Team>> {
        let (team, actions) =
            lifecycle::leave(&self.config, &mut self.teams, &self.claims, team, participant)?;
        tracing::info!("{} left {:?}", participant, team.name);
        Ok(finish(platform, team, actions))
    }

    /// Disband a team. The value is the removed record.
    pub fn disband<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        team: &str,
        captain: &ParticipantId,
    ) -> Result<Applied<Team>> {
        let (team, actions) =
            lifecycle::disband(&self.config, &mut self.teams, &self.claims, team, captain)?;
        tracing::info!(
            "Disbanded {:?} ({} members released)",
            team.name,
            team.members.len()
        );
        Ok(finish(platform, team, actions))
    }

    /// Toggle a role-slot tag, seeding state from the participant's tags.
    pub fn toggle_slot<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        participant: &Participant,
        tag: &str,
    ) -> Result<Applied<ToggleOutcome>> {
        self.slots.sync(&participant.id, &participant.tags);
        let (outcome, actions) = self.slots.toggle(&participant.id, tag)?;
        tracing::debug!("Slot toggle for {}: {:?}", participant.id, outcome);
        Ok(finish(platform, outcome, actions))
    }

    /// Compute a reconciliation report without changing anything.
    pub fn scan(&self, snapshot: &ExternalSnapshot, scope: ReconcileScope) -> ReconcileReport {
        let plan = reconcile::plan(
            &self.roster,
            &self.config,
            &self.claims.to_map(),
            snapshot,
            scope,
        );
        tracing::info!("Scanned {} ({} healing actions pending)", scope, plan.actions.len());
        plan.report
    }

    /// Rebuild the stores in `scope` from `snapshot` and commit them.
    pub fn fix<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        snapshot: &ExternalSnapshot,
        scope: ReconcileScope,
    ) -> Result<Applied<ReconcileReport>> {
        let plan = reconcile::plan(
            &self.roster,
            &self.config,
            &self.claims.to_map(),
            snapshot,
            scope,
        );

        // Both maps must be valid before either file is written.
        if let Some(claims) = &plan.claims {
            ClaimStore::check(claims)?;
        }
        if let Some(teams) = &plan.teams {
            TeamStore::check(teams)?;
        }

        let previous_claims = plan.claims.as_ref().map(|_| self.claims.to_map());
        if let Some(claims) = plan.claims {
            self.claims.replace_all(claims)?;
        }
        if let Some(teams) = plan.teams {
            if let Err(e) = self.teams.replace_all(teams) {
                if let Some(previous) = previous_claims {
                    tracing::warn!("Team store write failed, reverting claims");
                    if let Err(revert) = self.claims.replace_all(previous) {
                        tracing::error!("Could not revert claims after failed fix: {}", revert);
                    }
                }
                return Err(e.into());
            }
        }
        tracing::info!(
            "Reconciled {}: {} claims, {} teams",
            scope,
            self.claims.len(),
            self.teams.len()
        );

        let mut report = plan.report;
        report.committed = true;
        Ok(finish(platform, report, plan.actions))
    }

    /// Replace a whole store from an operator-supplied file.
    ///
    /// The payload is parsed and checked against the store invariants
    /// before anything is replaced.
    pub fn restore(&mut self, filename: &str, contents: &str) -> Result<Restored> {
        let target = RestoreTarget::from_filename(filename)?;
        let records = match target {
            RestoreTarget::Claims => self.claims.restore_json(contents),
            RestoreTarget::Teams => self.teams.restore_json(contents),
        }
        .map_err(restore_error)?;
        tracing::info!("Restored {} ({} records)", target, records);
        Ok(Restored { target, records })
    }
}

fn restore_error(e: StoreError) -> EngineError {
    match e {
        StoreError::Serialization(e) => EngineError::InvalidRestore(e.to_string()),
        e @ (StoreError::DuplicateClaimant { .. }
        | StoreError::MemberConflict { .. }
        | StoreError::InvalidTeam { .. }) => EngineError::InvalidRestore(e.to_string()),
        other => other.into(),
    }
}

fn finish<T, P: Platform + ?Sized>(platform: &mut P, value: T, actions: Vec<Action>) -> Applied<T> {
    let report = apply_best_effort(platform, &actions);
    Applied {
        value,
        actions,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::testing::ScriptedPlatform;
    use crate::platform::Journal;
    use crate::reconcile::{NamedResource, ResourceGroup, RoleResource, TextResource};
    use muster_roster::RosterRow;
    use tempfile::tempdir;

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    fn roster() -> RosterTable {
        RosterTable::from_rows(vec![
            RosterRow::new("S1", "Alice Stone", Some("valorant")),
            RosterRow::new("S2", "Bruno Cruz", None),
            RosterRow::new("S3", "Carla Cruz", None),
            RosterRow::new("S4", "Dara Quinn", None),
        ])
    }

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            roster(),
            ClaimStore::in_memory(),
            TeamStore::in_memory(),
        )
    }

    fn verified(s: &str) -> Participant {
        Participant::new(s).with_tag("Verified")
    }

    #[test]
    fn verification_example() {
        let mut engine = engine();
        let mut platform = Journal::new();

        let applied = engine.verify(&mut platform, "S1", &p("P1")).unwrap();
        assert_eq!(applied.value.display_label, "Alice");
        assert!(applied.report.is_clean());
        assert_eq!(platform.entries(), &applied.actions[..]);

        let err = engine.verify(&mut platform, "S1", &p("P2")).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimedByOther { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = engine.verify(&mut platform, "S9", &p("P1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(engine.claims().claimant_of("S1"), Some(&p("P1")));
    }

    #[test]
    fn team_example() {
        let mut engine = engine();
        let mut platform = Journal::new();
        engine.verify(&mut platform, "S1", &p("P1")).unwrap();
        engine.verify(&mut platform, "S2", &p("P2")).unwrap();

        engine.create_team(&mut platform, "valorant", &p("P1"), "Alpha").unwrap();
        engine.invite(&mut platform, "Alpha", &p("P1"), &verified("P2")).unwrap();
        let joined = engine.join(&mut platform, "Alpha", &p("P2")).unwrap();
        assert_eq!(joined.value.members, vec![p("P1"), p("P2")]);
        assert!(!engine.solo_status(&p("P2")));

        let kicked = engine.kick(&mut platform, "Alpha", &p("P1"), &p("P2")).unwrap();
        assert_eq!(kicked.value.members, vec![p("P1")]);
        assert!(engine.solo_status(&p("P2")));
    }

    #[test]
    fn join_twice_needs_new_invite() {
        let mut engine = engine();
        let mut platform = Journal::new();
        engine.create_team(&mut platform, "valorant", &p("P1"), "Alpha").unwrap();
        engine.invite(&mut platform, "Alpha", &p("P1"), &verified("P2")).unwrap();
        engine.join(&mut platform, "Alpha", &p("P2")).unwrap();
        engine.leave(&mut platform, "Alpha", &p("P2")).unwrap();

        let err = engine.join(&mut platform, "Alpha", &p("P2")).unwrap_err();
        assert!(matches!(err, EngineError::NotInvited { .. }));
    }

    #[test]
    fn disband_makes_members_solo() {
        let mut engine = engine();
        let mut platform = Journal::new();
        engine.verify(&mut platform, "S1", &p("P1")).unwrap();
        engine.verify(&mut platform, "S2", &p("P2")).unwrap();
        engine.create_team(&mut platform, "valorant", &p("P1"), "Alpha").unwrap();
        engine.invite(&mut platform, "Alpha", &p("P1"), &verified("P2")).unwrap();
        engine.join(&mut platform, "Alpha", &p("P2")).unwrap();

        let applied = engine.disband(&mut platform, "Alpha", &p("P1")).unwrap();
        assert!(engine.teams().find("Alpha").is_none());
        assert!(engine.solo_status(&p("P1")));
        assert!(engine.solo_status(&p("P2")));
        assert_eq!(applied.value.members.len(), 2);
    }

    #[test]
    fn cosmetic_failures_do_not_roll_back() {
        let mut engine = engine();
        let mut platform = ScriptedPlatform::new();
        platform.fail_labels = true;
        platform.fail_notices = true;

        let applied = engine.verify(&mut platform, "S1", &p("P1")).unwrap();
        assert_eq!(applied.report.failures.len(), 2);
        assert!(engine.is_verified(&p("P1")));
    }

    #[test]
    fn welcome_targets_first_channel() {
        let mut engine = engine();
        let mut platform = Journal::new();
        let applied = engine.welcome(&mut platform, &p("P1"));
        assert_eq!(
            applied.actions[0],
            Action::grant(&p("P1"), Tag::named("Unverified"))
        );
        assert!(matches!(
            &applied.actions[1],
            Action::SendNotice { target: NoticeTarget::FirstChannelNamed(names), .. }
                if names == &["verify".to_string(), "general".to_string()]
        ));
    }

    #[test]
    fn toggle_slot_uses_visible_tags() {
        let mut engine = engine();
        let mut platform = Journal::new();
        let participant = Participant::new("P1").with_tag("Duelist").with_tag("Sentinel");

        let err = engine
            .toggle_slot(&mut platform, &participant, "controller")
            .unwrap_err();
        assert!(matches!(err, EngineError::CategoryFull { .. }));

        let applied = engine
            .toggle_slot(&mut platform, &participant, "duelist")
            .unwrap();
        assert_eq!(
            applied.value,
            ToggleOutcome::Removed {
                tag: "Duelist".into()
            }
        );
    }

    fn snapshot() -> ExternalSnapshot {
        ExternalSnapshot {
            participants: vec![
                Participant::new("u1").with_label("Alice").with_tag("Verified"),
                Participant::new("u2").with_label("Bruno"),
                Participant::new("u3").with_label("Carla").with_tag("Verified"),
            ],
            groups: vec![ResourceGroup {
                name: "valorant".into(),
                texts: vec![TextResource {
                    id: "t1".into(),
                    name: "alpha".into(),
                    history: vec![],
                }],
                voices: vec![NamedResource {
                    id: "v1".into(),
                    name: "Alpha".into(),
                }],
                roles: vec![RoleResource {
                    id: "r1".into(),
                    name: "Alpha".into(),
                    holders: vec![p("u1"), p("u2")],
                }],
            }],
        }
    }

    #[test]
    fn scan_is_read_only_and_fix_commits() {
        let mut engine = engine();
        let mut platform = Journal::new();
        let snapshot = snapshot();

        let report = engine.scan(&snapshot, ReconcileScope::All);
        assert!(!report.committed);
        assert_eq!(report.teams.as_ref().unwrap().total, 1);
        assert!(engine.claims().is_empty());
        assert!(engine.teams().is_empty());

        let applied = engine.fix(&mut platform, &snapshot, ReconcileScope::All).unwrap();
        assert!(applied.value.committed);
        assert_eq!(engine.teams().team_of(&p("u2")).unwrap().name, "Alpha");
        assert_eq!(engine.claims().claimant_of("S1"), Some(&p("u1")));
        assert_eq!(engine.claims().claimant_of("S2"), Some(&p("u2")));
        assert_eq!(engine.claims().claimant_of("S3"), Some(&p("u3")));
        assert!(applied
            .actions
            .contains(&Action::grant(&p("u2"), Tag::named("Verified"))));
    }

    #[test]
    fn failed_team_write_leaves_claims_untouched() {
        let dir = tempdir().unwrap();
        let claims_path = dir.path().join("claimed_ids.json");
        let teams_path = dir.path().join("teams.json");
        let mut engine = Engine::new(
            EngineConfig::default(),
            roster(),
            ClaimStore::open(&claims_path).unwrap(),
            TeamStore::open(&teams_path).unwrap(),
        );
        let mut platform = ScriptedPlatform::new();
        engine.verify(&mut platform, "S3", &p("u9")).unwrap();

        // A non-empty directory in place of the team file makes the rename fail.
        std::fs::create_dir(&teams_path).unwrap();
        std::fs::write(teams_path.join("keep"), "").unwrap();

        let err = engine
            .fix(&mut platform, &snapshot(), ReconcileScope::All)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(engine.claims().len(), 1);
        assert_eq!(engine.claims().claimant_of("S3"), Some(&p("u9")));
        assert!(engine.teams().is_empty());

        let reopened = ClaimStore::open(&claims_path).unwrap();
        assert_eq!(reopened.claimant_of("S3"), Some(&p("u9")));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn fix_claims_scope_leaves_teams() {
        let mut engine = engine();
        let mut platform = Journal::new();
        engine.create_team(&mut platform, "valorant", &p("P1"), "Beta").unwrap();

        engine
            .fix(&mut platform, &snapshot(), ReconcileScope::Claims)
            .unwrap();
        assert!(engine.teams().find("Beta").is_some());
        assert_eq!(engine.claims().len(), 2);
    }

    #[test]
    fn restore_replaces_store() {
        let dir = tempdir().unwrap();
        let mut engine = Engine::new(
            EngineConfig::default(),
            roster(),
            ClaimStore::open(dir.path().join("claimed_ids.json")).unwrap(),
            TeamStore::open(dir.path().join("teams.json")).unwrap(),
        );

        let restored = engine
            .restore("backup/claimed_ids.json", r#"{"S1":"P1","S2":"P2"}"#)
            .unwrap();
        assert_eq!(restored.target, RestoreTarget::Claims);
        assert_eq!(restored.records, 2);
        assert!(engine.is_verified(&p("P2")));

        let reopened = ClaimStore::open(dir.path().join("claimed_ids.json")).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn restore_rejects_bad_input() {
        let mut engine = engine();
        let err = engine.restore("notes.txt", "{}").unwrap_err();
        assert!(matches!(err, EngineError::UnknownRestoreTarget(_)));

        let err = engine.restore("claimed_ids.json", "not json").unwrap_err();
        assert!(matches!(err, EngineError::InvalidRestore(_)));

        let err = engine
            .restore("claimed_ids.json", r#"{"S1":"P1","S2":"P1"}"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRestore(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(engine.claims().is_empty());
    }

    #[test]
    fn status_counts() {
        let mut engine = engine();
        let mut platform = Journal::new();
        engine.verify(&mut platform, "S1", &p("P1")).unwrap();
        assert_eq!(
            engine.status(),
            Status {
                identities: 4,
                claims: 1,
                teams: 0
            }
        );
    }

    mod invariants {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        #[derive(Debug, Clone)]
        enum Op {
            Verify(usize, usize),
            Create(usize, usize),
            Invite(usize, usize, usize),
            Join(usize, usize),
            Kick(usize, usize, usize),
            Leave(usize, usize),
            Disband(usize, usize),
        }

        const TEAMS: [&str; 3] = ["Alpha", "Beta", "Gamma"];

        fn participant(i: usize) -> ParticipantId {
            ParticipantId::new(format!("P{}", i))
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..4usize, 0..5usize).prop_map(|(s, p)| Op::Verify(s, p)),
                (0..3usize, 0..5usize).prop_map(|(t, p)| Op::Create(t, p)),
                (0..3usize, 0..5usize, 0..5usize).prop_map(|(t, a, b)| Op::Invite(t, a, b)),
                (0..3usize, 0..5usize).prop_map(|(t, p)| Op::Join(t, p)),
                (0..3usize, 0..5usize, 0..5usize).prop_map(|(t, a, b)| Op::Kick(t, a, b)),
                (0..3usize, 0..5usize).prop_map(|(t, p)| Op::Leave(t, p)),
                (0..3usize, 0..5usize).prop_map(|(t, p)| Op::Disband(t, p)),
            ]
        }

        fn run(engine: &mut Engine, platform: &mut Journal, op: &Op) {
            // Rejections are expected; only the invariants matter.
            let _ = match *op {
                Op::Verify(s, p) => engine
                    .verify(platform, &format!("S{}", s + 1), &participant(p))
                    .map(|_| ()),
                Op::Create(t, p) => engine
                    .create_team(platform, "valorant", &participant(p), TEAMS[t])
                    .map(|_| ()),
                Op::Invite(t, a, b) => {
                    let target = Participant::new(format!("P{}", b)).with_tag("Verified");
                    engine
                        .invite(platform, TEAMS[t], &participant(a), &target)
                        .map(|_| ())
                }
                Op::Join(t, p) => engine.join(platform, TEAMS[t], &participant(p)).map(|_| ()),
                Op::Kick(t, a, b) => engine
                    .kick(platform, TEAMS[t], &participant(a), &participant(b))
                    .map(|_| ()),
                Op::Leave(t, p) => engine.leave(platform, TEAMS[t], &participant(p)).map(|_| ()),
                Op::Disband(t, p) => engine
                    .disband(platform, TEAMS[t], &participant(p))
                    .map(|_| ()),
            };
        }

        proptest! {
            /// Claims stay one-to-one and membership stays exclusive.
            #[test]
            fn stores_stay_consistent(ops in prop::collection::vec(arb_op(), 1..60)) {
                let mut engine = engine();
                let mut platform = Journal::new();

                for op in &ops {
                    run(&mut engine, &mut platform, op);

                    let mut claimants = HashSet::new();
                    for (_, participant) in engine.claims().all_claims() {
                        prop_assert!(claimants.insert(participant.clone()));
                    }

                    let mut members = HashSet::new();
                    for team in engine.teams().iter() {
                        prop_assert!(team.validate().is_ok());
                        for member in &team.members {
                            prop_assert!(members.insert(member.clone()));
                            prop_assert_eq!(
                                engine.teams().team_of(member).map(|t| t.name.as_str()),
                                Some(team.name.as_str())
                            );
                        }
                    }
                }
            }
        }
    }
}
