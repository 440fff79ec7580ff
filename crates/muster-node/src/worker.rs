//! The command worker.
//!
//! One task owns the [`Engine`] and the platform journal. Commands reach it
//! over a bounded channel and are executed strictly one at a time, which is
//! what keeps store transitions and reconciliation runs from interleaving.

use crate::admin_socket::{Command, Response};
use crate::error::{Error, Result};
use muster_engine::{Applied, Engine, EngineError, Journal, Participant, Platform};
use muster_store::ParticipantId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job = (Command, oneshot::Sender<Response>);

/// Cloneable handle for submitting commands to the worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
}

impl WorkerHandle {
    /// Run `cmd` on the worker and wait for its response.
    pub async fn execute(&self, cmd: Command) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((cmd, reply_tx))
            .await
            .map_err(|_| Error::WorkerGone)?;
        reply_rx.await.map_err(|_| Error::WorkerGone)
    }
}

/// Start the worker with a queue of `capacity` pending commands.
pub fn spawn(engine: Engine, capacity: usize) -> (WorkerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(run(engine, Journal::new(), rx));
    (WorkerHandle { tx }, task)
}

async fn run(mut engine: Engine, mut journal: Journal, mut rx: mpsc::Receiver<Job>) {
    tracing::info!("Command worker started");
    while let Some((cmd, reply)) = rx.recv().await {
        let response = execute(&mut engine, &mut journal, cmd);
        for action in journal.take() {
            tracing::debug!("Forwarding {}", action);
        }
        if reply.send(response).is_err() {
            tracing::debug!("Command caller went away before the reply");
        }
    }
    tracing::info!("Command worker stopped");
}

/// Execute one command against the engine.
pub fn execute<P: Platform + ?Sized>(engine: &mut Engine, platform: &mut P, cmd: Command) -> Response {
    match cmd {
        Command::Verify {
            identity,
            participant,
        } => applied(
            engine.verify(platform, &identity, &ParticipantId::new(participant)),
            |v| format!("Verified {} as {}", v.participant, v.identity),
        ),

        Command::CreateTeam {
            game,
            captain,
            name,
        } => applied(
            engine.create_team(platform, &game, &ParticipantId::new(captain), &name),
            |team| format!("Created team {} ({})", team.name, team.game),
        ),

        Command::Invite {
            team,
            inviter,
            target,
            target_tags,
            target_is_service,
        } => {
            let mut view = Participant::new(target);
            view.tags = target_tags.into_iter().collect();
            view.is_service = target_is_service;
            let result = engine.invite(platform, &team, &ParticipantId::new(inviter), &view);
            applied(result, |created| {
                if *created {
                    format!("Invited {} to {}", view.id, team)
                } else {
                    format!("{} was already invited to {}", view.id, team)
                }
            })
        }

        Command::Join { team, participant } => applied(
            engine.join(platform, &team, &ParticipantId::new(participant)),
            |team| format!("Joined {} ({} members)", team.name, team.members.len()),
        ),

        Command::Kick {
            team,
            captain,
            target,
        } => applied(
            engine.kick(
                platform,
                &team,
                &ParticipantId::new(captain),
                &ParticipantId::new(target),
            ),
            |team| format!("Removed member from {}", team.name),
        ),

        Command::Leave { team, participant } => applied(
            engine.leave(platform, &team, &ParticipantId::new(participant)),
            |team| format!("Left {}", team.name),
        ),

        Command::Disband { team, captain } => applied(
            engine.disband(platform, &team, &ParticipantId::new(captain)),
            |team| format!("Disbanded {}", team.name),
        ),

        Command::ToggleSlot {
            participant,
            tag,
            held,
        } => {
            let mut view = Participant::new(participant);
            view.tags = held.into_iter().collect();
            applied(engine.toggle_slot(platform, &view, &tag), |outcome| {
                format!("{:?}", outcome)
            })
        }

        Command::Welcome { participant } => {
            let participant = ParticipantId::new(participant);
            let applied = engine.welcome(platform, &participant);
            Response::Ok {
                message: format!("Welcomed {}", participant),
                actions: applied.actions,
                failures: applied.report.failures,
            }
        }

        Command::Scan { snapshot, scope } => Response::Report {
            report: engine.scan(&snapshot, scope),
            actions: Vec::new(),
            failures: Vec::new(),
        },

        Command::Fix { snapshot, scope } => match engine.fix(platform, &snapshot, scope) {
            Ok(applied) => Response::Report {
                report: applied.value,
                actions: applied.actions,
                failures: applied.report.failures,
            },
            Err(e) => engine_error(e),
        },

        Command::Restore { filename, contents } => match engine.restore(&filename, &contents) {
            Ok(restored) => Response::message(format!(
                "Restored {} ({} records)",
                restored.target, restored.records
            )),
            Err(e) => engine_error(e),
        },

        Command::Status => {
            let status = engine.status();
            Response::Status {
                identities: status.identities,
                claims: status.claims,
                teams: status.teams,
            }
        }

        Command::Ping => Response::Pong,
    }
}

fn applied<T>(
    result: std::result::Result<Applied<T>, EngineError>,
    message: impl FnOnce(&T) -> String,
) -> Response {
    match result {
        Ok(applied) => Response::Ok {
            message: message(&applied.value),
            actions: applied.actions,
            failures: applied.report.failures,
        },
        Err(e) => engine_error(e),
    }
}

fn engine_error(e: EngineError) -> Response {
    tracing::info!("Command rejected: {}", e);
    Response::error(e.kind(), e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_engine::EngineConfig;
    use muster_roster::{RosterRow, RosterTable};
    use muster_store::{ClaimStore, TeamStore};

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            RosterTable::from_rows(vec![
                RosterRow::new("S1", "Alice Stone", None),
                RosterRow::new("S2", "Bruno Cruz", None),
            ]),
            ClaimStore::in_memory(),
            TeamStore::in_memory(),
        )
    }

    fn verify(identity: &str, participant: &str) -> Command {
        Command::Verify {
            identity: identity.into(),
            participant: participant.into(),
        }
    }

    #[tokio::test]
    async fn worker_serializes_commands() {
        let (handle, _task) = spawn(engine(), 4);

        let response = handle.execute(verify("S1", "p1")).await.unwrap();
        assert!(matches!(response, Response::Ok { .. }));

        let response = handle.execute(verify("S1", "p2")).await.unwrap();
        match response {
            Response::Error { kind, .. } => assert_eq!(kind, "conflict"),
            other => panic!("unexpected {:?}", other),
        }

        let response = handle
            .execute(Command::CreateTeam {
                game: "valorant".into(),
                captain: "p1".into(),
                name: "Alpha".into(),
            })
            .await
            .unwrap();
        match response {
            Response::Ok { actions, failures, .. } => {
                assert!(failures.is_empty());
                assert!(!actions.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }

        match handle.execute(Command::Status).await.unwrap() {
            Response::Status {
                identities,
                claims,
                teams,
            } => assert_eq!((identities, claims, teams), (2, 1, 1)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let (handle, _task) = spawn(engine(), 16);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.execute(verify("S2", &format!("p{}", i))).await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if let Response::Ok { .. } = task.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn invite_uses_supplied_tags() {
        let (handle, _task) = spawn(engine(), 4);
        handle
            .execute(Command::CreateTeam {
                game: "valorant".into(),
                captain: "p1".into(),
                name: "Alpha".into(),
            })
            .await
            .unwrap();

        let invite = |tags: Vec<String>| Command::Invite {
            team: "Alpha".into(),
            inviter: "p1".into(),
            target: "p2".into(),
            target_tags: tags,
            target_is_service: false,
        };

        match handle.execute(invite(vec![])).await.unwrap() {
            Response::Error { kind, .. } => assert_eq!(kind, "conflict"),
            other => panic!("unexpected {:?}", other),
        }
        let response = handle.execute(invite(vec!["Verified".into()])).await.unwrap();
        assert!(matches!(response, Response::Ok { .. }));
    }

    #[tokio::test]
    async fn stopped_worker_reports_gone() {
        let (handle, task) = spawn(engine(), 1);
        task.abort();
        let _ = task.await;
        assert!(matches!(
            handle.execute(Command::Ping).await,
            Err(Error::WorkerGone)
        ));
    }
}
