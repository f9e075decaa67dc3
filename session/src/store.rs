use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Read as _;
use std::io::Write as _;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use liar_step_client::ServerResponse;
use liar_step_client::SessionId;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A suspect or vote target with the participant's confidence (1..=5).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub target: String,
    pub confidence: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnswer {
    pub reason: String,
    pub same_choice: Option<bool>,
}

/// Everything the results view needs once the game is over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndedSnapshot {
    pub session_id: SessionId,
    pub response: ServerResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_check: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview: Option<InterviewAnswer>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDotJson {
    pub session_id: SessionId,
    pub participant_name: String,
    pub created_at: DateTime<Utc>,
}

pub fn get_session_file(home: &Path) -> PathBuf {
    home.join("session.json")
}

pub fn get_last_ended_file(home: &Path) -> PathBuf {
    home.join("last_ended.json")
}

fn try_read_json<T: DeserializeOwned>(path: &Path) -> std::io::Result<T> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let value = serde_json::from_str(&contents)?;
    Ok(value)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json_data = serde_json::to_string_pretty(value)?;
    let mut options = OpenOptions::new();
    options.truncate(true).write(true).create(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(json_data.as_bytes())?;
    file.flush()?;
    Ok(())
}

pub fn try_read_session_json(session_file: &Path) -> std::io::Result<SessionDotJson> {
    try_read_json(session_file)
}

pub fn try_read_last_ended(last_ended_file: &Path) -> std::io::Result<EndedSnapshot> {
    try_read_json(last_ended_file)
}

/// Local files for one participant: the durable session identifier and the
/// payload of the last finished game.
#[derive(Clone, Debug)]
pub struct SessionStore {
    home: PathBuf,
}

impl SessionStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Return the stored session, creating one with a fresh id when none
    /// exists yet. A stored session keeps its id; the participant name is
    /// updated if it changed.
    pub fn load_or_create_session(&self, participant_name: &str) -> std::io::Result<SessionDotJson> {
        let path = get_session_file(&self.home);
        match try_read_session_json(&path) {
            Ok(mut existing) => {
                if existing.participant_name != participant_name {
                    existing.participant_name = participant_name.to_string();
                    write_json(&path, &existing)?;
                }
                Ok(existing)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let created = SessionDotJson {
                    session_id: SessionId(Uuid::new_v4().to_string()),
                    participant_name: participant_name.to_string(),
                    created_at: Utc::now(),
                };
                tracing::info!(session_id = %created.session_id, "created new session");
                write_json(&path, &created)?;
                Ok(created)
            }
            Err(err) => Err(err),
        }
    }

    pub fn write_last_ended(&self, snapshot: &EndedSnapshot) -> std::io::Result<()> {
        write_json(&get_last_ended_file(&self.home), snapshot)
    }

    pub fn read_last_ended(&self) -> std::io::Result<EndedSnapshot> {
        try_read_last_ended(&get_last_ended_file(&self.home))
    }
}
