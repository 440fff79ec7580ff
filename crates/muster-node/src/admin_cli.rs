//! muster-admin CLI tool
//!
//! Drives a running muster-node over its admin socket.
//!
//! Usage:
//!   muster-admin verify <identity> <participant>
//!   muster-admin create-team <game> <captain> <name>
//!   muster-admin invite <team> <inviter> <target> [target_tag...]
//!   muster-admin join <team> <participant>
//!   muster-admin kick <team> <captain> <target>
//!   muster-admin leave <team> <participant>
//!   muster-admin disband <team> <captain>
//!   muster-admin toggle-slot <participant> <tag> [held_tag...]
//!   muster-admin welcome <participant>
//!   muster-admin scan <snapshot.json> [claims|teams|all]
//!   muster-admin fix <snapshot.json> [claims|teams|all]
//!   muster-admin restore <file>
//!   muster-admin status
//!   muster-admin ping

use muster_engine::{ExternalSnapshot, ReconcileScope};
use muster_node::{Command, Response};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

fn print_usage() {
    eprintln!("muster-admin - Operate a Muster node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  muster-admin verify <identity> <participant>         Claim an identity");
    eprintln!("  muster-admin create-team <game> <captain> <name>     Create a team");
    eprintln!("  muster-admin invite <team> <inviter> <target> [tag...]");
    eprintln!("                                                       Invite a participant");
    eprintln!("  muster-admin join <team> <participant>               Accept an invite");
    eprintln!("  muster-admin kick <team> <captain> <target>          Remove a member");
    eprintln!("  muster-admin leave <team> <participant>              Leave a team");
    eprintln!("  muster-admin disband <team> <captain>                Delete a team");
    eprintln!("  muster-admin toggle-slot <participant> <tag> [held...]");
    eprintln!("                                                       Toggle a role slot");
    eprintln!("  muster-admin welcome <participant>                   Greet a newcomer");
    eprintln!("  muster-admin scan <snapshot.json> [scope]            Dry-run reconciliation");
    eprintln!("  muster-admin fix <snapshot.json> [scope]             Reconcile and commit");
    eprintln!("  muster-admin restore <file>                          Replace a store file");
    eprintln!("  muster-admin status                                  Show store counts");
    eprintln!("  muster-admin ping                                    Check if daemon is running");
    eprintln!();
    eprintln!("Scopes: claims, teams, all (default)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MUSTER_SOCKET  Path to admin socket (default: ./muster-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("MUSTER_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./muster-data/admin.sock"))
}

fn send_command(cmd: &Command) -> Result<Response, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to muster-node at {:?}: {}\n\
             Is the muster-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Positional argument `index`, or exit naming what is missing.
fn arg(args: &[String], index: usize, name: &str) -> String {
    match args.get(index) {
        Some(value) => value.clone(),
        None => fail(format!("{} requires a {} argument", args[1], name)),
    }
}

/// Arguments from `index` on; at least one is required.
fn rest<'a>(args: &'a [String], index: usize, name: &str) -> &'a [String] {
    match args.get(index..) {
        Some(values) if !values.is_empty() => values,
        _ => fail(format!("{} requires a {} argument", args[1], name)),
    }
}

fn read_snapshot(path: &str) -> ExternalSnapshot {
    let json = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read {}: {}", path, e)));
    serde_json::from_str(&json).unwrap_or_else(|e| fail(format!("invalid snapshot {}: {}", path, e)))
}

fn read_scope(args: &[String], index: usize) -> ReconcileScope {
    match args.get(index) {
        Some(raw) => raw.parse().unwrap_or_else(|e: String| fail(e)),
        None => ReconcileScope::All,
    }
}

fn parse_command(args: &[String]) -> Command {
    match args[1].as_str() {
        "verify" => Command::Verify {
            identity: arg(args, 2, "identity"),
            participant: arg(args, 3, "participant"),
        },
        "create-team" => Command::CreateTeam {
            game: arg(args, 2, "game"),
            captain: arg(args, 3, "captain"),
            name: rest(args, 4, "name").join(" "),
        },
        "invite" => Command::Invite {
            team: arg(args, 2, "team"),
            inviter: arg(args, 3, "inviter"),
            target: arg(args, 4, "target"),
            target_tags: args.get(5..).map(<[String]>::to_vec).unwrap_or_default(),
            target_is_service: false,
        },
        "join" => Command::Join {
            team: arg(args, 2, "team"),
            participant: arg(args, 3, "participant"),
        },
        "kick" => Command::Kick {
            team: arg(args, 2, "team"),
            captain: arg(args, 3, "captain"),
            target: arg(args, 4, "target"),
        },
        "leave" => Command::Leave {
            team: arg(args, 2, "team"),
            participant: arg(args, 3, "participant"),
        },
        "disband" => Command::Disband {
            team: arg(args, 2, "team"),
            captain: arg(args, 3, "captain"),
        },
        "toggle-slot" => Command::ToggleSlot {
            participant: arg(args, 2, "participant"),
            tag: arg(args, 3, "tag"),
            held: args.get(4..).map(<[String]>::to_vec).unwrap_or_default(),
        },
        "welcome" => Command::Welcome {
            participant: arg(args, 2, "participant"),
        },
        "scan" => Command::Scan {
            snapshot: read_snapshot(&arg(args, 2, "snapshot path")),
            scope: read_scope(args, 3),
        },
        "fix" => Command::Fix {
            snapshot: read_snapshot(&arg(args, 2, "snapshot path")),
            scope: read_scope(args, 3),
        },
        "restore" => {
            let path = arg(args, 2, "file path");
            let contents = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| fail(format!("cannot read {}: {}", path, e)));
            let filename = Path::new(&path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            Command::Restore { filename, contents }
        }
        "status" => Command::Status,
        "ping" => Command::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = parse_command(&args);

    match send_command(&cmd) {
        Ok(response) => match response {
            Response::Ok {
                message,
                actions,
                failures,
            } => {
                println!("{}", message);
                for action in actions {
                    println!("  {}", action);
                }
                for failure in &failures {
                    eprintln!("  failed: {} ({})", failure.action, failure.error);
                }
                if !failures.is_empty() {
                    std::process::exit(2);
                }
            }
            Response::Error { kind, error } => {
                eprintln!("Error ({}): {}", kind, error);
                std::process::exit(1);
            }
            Response::Report {
                report,
                actions,
                failures,
            } => {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => fail(e),
                }
                for action in actions {
                    println!("  {}", action);
                }
                for failure in &failures {
                    eprintln!("  failed: {} ({})", failure.action, failure.error);
                }
            }
            Response::Status {
                identities,
                claims,
                teams,
            } => {
                println!("identities: {}", identities);
                println!("claims:     {}", claims);
                println!("teams:      {}", teams);
            }
            Response::Pong => {
                println!("pong - muster-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
