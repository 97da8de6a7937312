use clap::Subcommand;
use pomotrack_core::SessionKind;

use super::open_directory;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a new session on a task
    Start {
        /// Task ID to work on
        task_id: String,
        /// Session kind: work, short_break, or long_break
        #[arg(long, default_value = "work")]
        kind: String,
    },
    /// Pause the active session
    Pause {
        /// Session ID (defaults to the active session)
        session_id: Option<String>,
    },
    /// Resume the paused session
    Resume {
        session_id: Option<String>,
    },
    /// Complete the active session and print the suggested next kind
    Complete {
        session_id: Option<String>,
    },
    /// Cancel the active session
    Cancel {
        session_id: Option<String>,
    },
    /// Record an interruption on the active session
    Interrupt {
        session_id: Option<String>,
    },
    /// Print the active session as JSON
    Status,
}

pub fn run(action: SessionAction, owner: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, owner) = open_directory(owner)?;

    match action {
        SessionAction::Start { task_id, kind } => {
            let kind = SessionKind::parse(&kind)
                .ok_or_else(|| format!("unknown session kind: {kind}"))?;
            let session = dir.start(&owner, &task_id, kind)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Pause { session_id } => {
            let id = resolve(&dir, &owner, session_id)?;
            let session = dir.pause(&owner, &id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Resume { session_id } => {
            let id = resolve(&dir, &owner, session_id)?;
            let session = dir.resume(&owner, &id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Complete { session_id } => {
            let id = resolve(&dir, &owner, session_id)?;
            let completion = dir.complete(&owner, &id)?;
            println!("{}", serde_json::to_string_pretty(&completion)?);
        }
        SessionAction::Cancel { session_id } => {
            let id = resolve(&dir, &owner, session_id)?;
            let session = dir.cancel(&owner, &id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Interrupt { session_id } => {
            let id = resolve(&dir, &owner, session_id)?;
            let session = dir.interrupt(&owner, &id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Status => match dir.get_active(&owner)? {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("null"),
        },
    }
    Ok(())
}

/// Use the given session id, or fall back to the owner's active session.
fn resolve(
    dir: &pomotrack_core::SessionDirectory,
    owner: &str,
    session_id: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(id) = session_id {
        return Ok(id);
    }
    match dir.get_active(owner)? {
        Some(snapshot) => Ok(snapshot.session.id),
        None => Err(format!("no active session for '{owner}'").into()),
    }
}
