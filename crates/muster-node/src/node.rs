//! Muster Node - the main application entry point.
//!
//! Architecture:
//! - Single process that owns the claim and team files
//! - One command worker holding the engine (all transitions go through it)
//! - Unix admin socket for operator commands (muster-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::error::{Error, Result};
use crate::worker::{self, WorkerHandle};
use muster_engine::{Engine, EngineConfig, SlotTable};
use muster_roster::RosterTable;
use muster_store::{ClaimStore, JsonFile, RestoreTarget, StoreError, TeamStore};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Pending commands the worker queue holds before callers wait.
const COMMAND_QUEUE: usize = 64;

/// Configuration for a Muster node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Directory holding the store files
    pub data_dir: PathBuf,

    /// Roster file
    pub roster: PathBuf,

    /// Optional role-slot table (JSON)
    pub slots: Option<PathBuf>,

    /// Allowed games; `None` keeps the engine defaults
    pub games: Option<Vec<String>>,

    /// Admin socket path (for muster-admin CLI)
    pub admin_socket: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl NodeConfig {
    /// Defaults rooted at `data_dir`, ignoring the environment.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        let data_dir = data_dir.into();
        Self {
            roster: data_dir.join("roster.json"),
            slots: None,
            games: None,
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
        }
    }

    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MUSTER_DATA_DIR").unwrap_or_else(|_| "./muster-data".to_string());
        let mut config = Self::with_data_dir(data_dir);

        if let Ok(roster) = std::env::var("MUSTER_ROSTER") {
            config.roster = PathBuf::from(roster);
        }
        config.slots = std::env::var("MUSTER_SLOTS").ok().map(PathBuf::from);
        config.games = std::env::var("MUSTER_GAMES").ok().map(|s| {
            s.split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect()
        });
        if let Ok(socket) = std::env::var("MUSTER_ADMIN_SOCKET") {
            config.admin_socket = PathBuf::from(socket);
        }
        config
    }

    /// Claim store file.
    pub fn claims_path(&self) -> PathBuf {
        self.data_dir.join(RestoreTarget::CLAIMS_FILE)
    }

    /// Team store file.
    pub fn teams_path(&self) -> PathBuf {
        self.data_dir.join(RestoreTarget::TEAMS_FILE)
    }
}

/// Load the roster, open both stores and build the engine.
///
/// A store file that cannot be parsed or breaks the store invariants is
/// moved aside to `<file>.corrupt` and the store starts empty.
pub fn open_engine(config: &NodeConfig) -> Result<Engine> {
    let roster = RosterTable::load(&config.roster)?;
    let claims = open_or_quarantine(&config.claims_path(), |p: &Path| ClaimStore::open(p))?;
    let teams = open_or_quarantine(&config.teams_path(), |p: &Path| TeamStore::open(p))?;

    let mut engine_config = EngineConfig::default();
    if let Some(games) = &config.games {
        engine_config = engine_config.with_games(games.iter().cloned());
    }
    let mut engine = Engine::new(engine_config, roster, claims, teams);

    if let Some(path) = &config.slots {
        let json = std::fs::read_to_string(path)?;
        let table = SlotTable::from_json_str(&json)
            .map_err(|e| Error::Config(format!("slot table {:?}: {}", path, e)))?;
        tracing::info!("Loaded {} slot categories from {:?}", table.categories().len(), path);
        engine = engine.with_slot_table(table);
    }
    Ok(engine)
}

fn open_or_quarantine<T, F>(path: &Path, open: F) -> Result<T>
where
    F: Fn(&Path) -> muster_store::Result<T>,
{
    match open(path) {
        Ok(store) => Ok(store),
        Err(StoreError::Io(e)) => Err(StoreError::Io(e).into()),
        Err(e) => {
            tracing::warn!("Store file {:?} is unusable ({}); starting empty", path, e);
            JsonFile::new(path).quarantine()?;
            Ok(open(path)?)
        }
    }
}

/// A Muster node instance.
pub struct MusterNode {
    config: NodeConfig,
    worker: WorkerHandle,
    worker_task: JoinHandle<()>,
}

impl MusterNode {
    /// Create a new node and start its command worker.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let engine = open_engine(&config)?;
        let status = engine.status();
        tracing::info!(
            "Loaded {} identities, {} claims, {} teams",
            status.identities,
            status.claims,
            status.teams
        );

        let (worker, worker_task) = worker::spawn(engine, COMMAND_QUEUE);
        Ok(Self {
            config,
            worker,
            worker_task,
        })
    }

    /// Handle for submitting commands.
    pub fn worker(&self) -> WorkerHandle {
        self.worker.clone()
    }

    /// Run the admin socket until interrupted.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Muster node starting");
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        let admin_socket = AdminSocket::new(self.worker.clone(), &self.config.admin_socket);
        let listener = admin_socket.bind()?;

        tokio::select! {
            result = admin_socket.serve(listener) => result?,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutting down");
            }
        }

        let _ = std::fs::remove_file(&self.config.admin_socket);
        drop(admin_socket);
        drop(self.worker);
        if let Err(e) = self.worker_task.await {
            tracing::error!("Command worker failed: {}", e);
        }
        Ok(())
    }
}
