use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wellops_core::{
    ids::{ChangeId, WellId},
    principal::{Principal, Role},
    proposal::{KIND_CREATE_WELL, KIND_UPDATE_WELL, WellChange},
};
use wellops_engine::{ApprovalOutcome, EngineConfig, EngineError, ReviewEngine};
use wellops_storage::{HistoryRecord, ProposalRecord};

#[derive(Parser)]
#[command(name = "wellops-review")]
#[command(about = "Review pending well changes")]
struct Cli {
    /// TOML config file; missing means defaults.
    #[arg(long, global = true, default_value = "wellops.toml")]
    config: PathBuf,
    /// Database path, overriding the config file.
    #[arg(long, global = true)]
    db: Option<String>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// Acting user name.
    #[arg(long = "as", global = true, default_value = "admin")]
    user: String,
    #[arg(long, global = true, value_enum, default_value_t = RoleCli::Admin)]
    role: RoleCli,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleCli {
    Admin,
    Dispatcher,
    Technician,
}

impl From<RoleCli> for Role {
    fn from(role: RoleCli) -> Self {
        match role {
            RoleCli::Admin => Role::Admin,
            RoleCli::Dispatcher => Role::Dispatcher,
            RoleCli::Technician => Role::Technician,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List pending proposals, oldest first.
    List,
    /// Show one proposal.
    Show { id: String },
    /// Submit a proposal from a JSON file (`-` for stdin): {"kind": ..., "payload": ...}.
    Submit { file: String },
    /// Approve and apply a pending proposal.
    Approve { id: String },
    /// Reject a pending proposal.
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Show the audit snapshots of a well.
    History { well_id: String },
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn proposal_json(p: &ProposalRecord) -> Value {
    json!({
        "id": p.change_id.to_string(),
        "kind": p.kind,
        "submitted_by": p.submitted_by,
        "status": p.status.as_str(),
        "payload": serde_json::from_str::<Value>(&p.payload).unwrap_or(Value::String(p.payload.clone())),
        "created_at": p.created_at.as_millis(),
        "decided_at": p.decided_at.map(|t| t.as_millis()),
        "decided_by": p.decided_by,
        "reason": p.reason,
    })
}

fn history_json(h: &HistoryRecord) -> Value {
    json!({
        "change_id": h.change_id.to_string(),
        "recorded_at": h.recorded_at.as_millis(),
        "verified": h.verify(),
        "snapshot": serde_json::from_str::<Value>(&h.snapshot_json).unwrap_or(Value::Null),
    })
}

fn read_submission(file: &str) -> Result<Value, String> {
    let text = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| e.to_string())?;
        buf
    } else {
        std::fs::read_to_string(file).map_err(|e| format!("{file}: {e}"))?
    };
    serde_json::from_str(&text).map_err(|e| format!("{file}: {e}"))
}

fn run(cli: Cli, engine: &mut ReviewEngine, principal: &Principal) -> Result<Value, String> {
    let err = |e: EngineError| e.to_string();
    match cli.command {
        Commands::List => {
            let pending = engine.list_pending(principal).map_err(err)?;
            if !cli.json {
                for p in &pending {
                    println!("{}  {:<12} {:<16} {}", p.change_id, p.kind, p.submitted_by, p.created_at);
                }
            }
            Ok(Value::Array(pending.iter().map(proposal_json).collect()))
        }
        Commands::Show { id } => {
            let id: ChangeId = id.parse().map_err(|e| format!("{e}"))?;
            let p = engine.get_proposal(principal, id).map_err(err)?;
            let value = proposal_json(&p);
            if !cli.json {
                println!("{}", serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?);
            }
            Ok(value)
        }
        Commands::Submit { file } => {
            let body = read_submission(&file)?;
            let kind = body.get("kind").and_then(Value::as_str).unwrap_or_default().to_string();
            let id = if kind == KIND_CREATE_WELL || kind == KIND_UPDATE_WELL {
                let change: WellChange = serde_json::from_value(body).map_err(|e| e.to_string())?;
                engine.submit(principal, &change).map_err(err)?
            } else {
                let payload = body.get("payload").cloned().unwrap_or(Value::Null);
                engine.submit_raw(principal, &kind, &payload).map_err(err)?
            };
            if !cli.json {
                println!("submitted {id}");
            }
            Ok(json!({ "id": id.to_string() }))
        }
        Commands::Approve { id } => {
            let id: ChangeId = id.parse().map_err(|e| format!("{e}"))?;
            let outcome = engine.approve(principal, id).map_err(err)?;
            let value = match &outcome {
                ApprovalOutcome::Applied {
                    well_id, action, ..
                } => json!({ "ok": true, "well_id": well_id.to_string(), "action": format!("{action:?}") }),
                ApprovalOutcome::Unsupported { kind, .. } => {
                    json!({ "ok": false, "note": format!("Unsupported kind: {kind}") })
                }
            };
            if !cli.json {
                match &outcome {
                    ApprovalOutcome::Applied { well_id, action, .. } => {
                        println!("approved {id}: {action:?} well {well_id}")
                    }
                    ApprovalOutcome::Unsupported { kind, .. } => {
                        println!("rejected {id}: unsupported kind {kind}")
                    }
                }
            }
            Ok(value)
        }
        Commands::Reject { id, reason } => {
            let id: ChangeId = id.parse().map_err(|e| format!("{e}"))?;
            let rejected = engine.reject(principal, id, &reason).map_err(err)?;
            if !cli.json {
                if rejected {
                    println!("rejected {id}");
                } else {
                    println!("{id} is not pending; nothing changed");
                }
            }
            Ok(json!({ "ok": rejected }))
        }
        Commands::History { well_id } => {
            let well_id: WellId = well_id.parse().map_err(|e| format!("{e}"))?;
            let history = engine.well_history(principal, well_id).map_err(err)?;
            if !cli.json {
                for h in &history {
                    let mark = if h.verify() { "ok" } else { "CHECKSUM MISMATCH" };
                    println!("{}  change {}  [{mark}]", h.recorded_at, h.change_id);
                }
            }
            Ok(Value::Array(history.iter().map(history_json).collect()))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match EngineConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    init_tracing(config.log_json);

    let principal = Principal::new(cli.user.clone(), cli.role.into());

    let mut engine = match ReviewEngine::open(config) {
        Ok(engine) => {
            tracing::debug!(db = %engine.config().database_path, user = %principal, "opened review store");
            engine
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let json_output = cli.json;
    match run(cli, &mut engine, &principal) {
        Ok(value) => {
            if json_output {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            if json_output {
                println!("{}", json!({ "ok": false, "error": message }));
            } else {
                eprintln!("error: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_admin() {
        let cli = Cli::try_parse_from(["wellops-review", "list"]).unwrap();
        assert_eq!(Role::from(cli.role), Role::Admin);
    }

    #[test]
    fn role_is_parsed_by_clap() {
        let cli =
            Cli::try_parse_from(["wellops-review", "--role", "technician", "history", "x"]).unwrap();
        assert_eq!(Role::from(cli.role), Role::Technician);
        assert!(Cli::try_parse_from(["wellops-review", "--role", "root", "list"]).is_err());
    }
}
