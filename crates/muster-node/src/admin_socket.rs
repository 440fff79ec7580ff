//! Unix socket server for operator commands.
//!
//! One JSON object per line in each direction. Every command is handed to
//! the command worker, so socket connections never touch the engine
//! directly.

use crate::error::Result;
use crate::worker::WorkerHandle;
use muster_engine::{Action, ActionFailure, ExternalSnapshot, ReconcileReport, ReconcileScope};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

fn default_scope() -> ReconcileScope {
    ReconcileScope::All
}

/// Command sent over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Claim an identity for a participant
    Verify {
        identity: String,
        participant: String,
    },
    /// Create a team led by `captain`
    CreateTeam {
        game: String,
        captain: String,
        name: String,
    },
    /// Invite a participant; `target_tags` are the tags it currently holds
    Invite {
        team: String,
        inviter: String,
        target: String,
        #[serde(default)]
        target_tags: Vec<String>,
        #[serde(default)]
        target_is_service: bool,
    },
    Join {
        team: String,
        participant: String,
    },
    Kick {
        team: String,
        captain: String,
        target: String,
    },
    Leave {
        team: String,
        participant: String,
    },
    Disband {
        team: String,
        captain: String,
    },
    /// Toggle a role-slot tag; `held` are the tags the participant holds now
    ToggleSlot {
        participant: String,
        tag: String,
        #[serde(default)]
        held: Vec<String>,
    },
    /// Greet a participant who just joined the community
    Welcome { participant: String },
    /// Dry-run reconciliation
    Scan {
        snapshot: ExternalSnapshot,
        #[serde(default = "default_scope")]
        scope: ReconcileScope,
    },
    /// Reconcile and commit
    Fix {
        snapshot: ExternalSnapshot,
        #[serde(default = "default_scope")]
        scope: ReconcileScope,
    },
    /// Replace a store with the given file contents
    Restore { filename: String, contents: String },
    /// Identity, claim and team counts
    Status,
    /// Health check
    Ping,
}

/// Response to a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        message: String,
        #[serde(default)]
        actions: Vec<Action>,
        #[serde(default)]
        failures: Vec<ActionFailure>,
    },
    Error {
        kind: String,
        error: String,
    },
    Report {
        report: ReconcileReport,
        #[serde(default)]
        actions: Vec<Action>,
        #[serde(default)]
        failures: Vec<ActionFailure>,
    },
    Status {
        identities: usize,
        claims: usize,
        teams: usize,
    },
    Pong,
}

impl Response {
    /// Plain success message with no actions.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Ok {
            message: message.into(),
            actions: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn error(kind: impl std::fmt::Display, error: impl std::fmt::Display) -> Self {
        Self::Error {
            kind: kind.to_string(),
            error: error.to_string(),
        }
    }
}

/// Admin socket server.
pub struct AdminSocket {
    worker: WorkerHandle,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new<P: AsRef<Path>>(worker: WorkerHandle, socket_path: P) -> Self {
        Self {
            worker,
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Bind the socket, replacing a stale socket file.
    pub fn bind(&self) -> Result<UnixListener> {
        let _ = std::fs::remove_file(&self.socket_path);
        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);
        Ok(listener)
    }

    /// Accept connections until the listener fails.
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let worker = self.worker.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, worker).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, worker: WorkerHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<Command>(&line) {
            Ok(cmd) => match worker.execute(cmd).await {
                Ok(response) => response,
                Err(e) => Response::error("unavailable", e),
            },
            Err(e) => Response::error("validation", format!("Invalid command: {}", e)),
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker;
    use muster_engine::{Engine, EngineConfig};
    use muster_roster::{RosterRow, RosterTable};
    use muster_store::{ClaimStore, TeamStore};
    use tempfile::tempdir;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            RosterTable::from_rows(vec![RosterRow::new("S1", "Alice Stone", None)]),
            ClaimStore::in_memory(),
            TeamStore::in_memory(),
        )
    }

    #[test]
    fn command_wire_format() {
        let cmd: Command =
            serde_json::from_str(r#"{"cmd":"verify","identity":"S1","participant":"p1"}"#).unwrap();
        assert!(matches!(cmd, Command::Verify { .. }));

        let cmd: Command = serde_json::from_str(r#"{"cmd":"scan","snapshot":{}}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::Scan {
                scope: ReconcileScope::All,
                ..
            }
        ));

        let json = serde_json::to_value(Response::Pong).unwrap();
        assert_eq!(json["status"], "pong");
    }

    #[tokio::test]
    async fn socket_round_trip() {
        let dir = tempdir().unwrap();
        let (handle, _task) = worker::spawn(engine(), 8);
        let socket = AdminSocket::new(handle, dir.path().join("admin.sock"));
        let listener = socket.bind().unwrap();
        let path = socket.socket_path().to_path_buf();
        tokio::spawn(async move {
            let _ = socket.serve(listener).await;
        });

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(b"{\"cmd\":\"ping\"}\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        assert!(matches!(
            serde_json::from_str::<Response>(&line).unwrap(),
            Response::Pong
        ));

        line.clear();
        writer
            .write_all(b"{\"cmd\":\"verify\",\"identity\":\"S1\",\"participant\":\"p1\"}\n")
            .await
            .unwrap();
        reader.read_line(&mut line).await.unwrap();
        match serde_json::from_str::<Response>(&line).unwrap() {
            Response::Ok { actions, .. } => assert!(!actions.is_empty()),
            other => panic!("unexpected {:?}", other),
        }

        line.clear();
        writer.write_all(b"not json\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        match serde_json::from_str::<Response>(&line).unwrap() {
            Response::Error { kind, .. } => assert_eq!(kind, "validation"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
