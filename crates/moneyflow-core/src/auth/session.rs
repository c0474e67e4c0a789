use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(token: String, username: String) -> Self {
        Self {
            token,
            username,
            created_at: Utc::now(),
        }
    }
}

/// Where the user stands with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    Authenticated,
    /// The backend rejected the stored token; the user must log in again
    LoginRequired,
}

/// Bearer-token session persisted to disk and shared across the client.
pub struct Session {
    data_dir: PathBuf,
    data: RwLock<Option<SessionData>>,
    state: watch::Sender<AuthState>,
}

impl Session {
    pub fn new(data_dir: PathBuf) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self {
            data_dir,
            data: RwLock::new(None),
            state,
        }
    }

    /// Load session from disk
    pub fn load(&self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        self.set(Some(data));
        Ok(true)
    }

    /// Replace the session and persist it
    pub fn update(&self, data: SessionData) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&data)?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        self.set(Some(data));
        Ok(())
    }

    /// Sign out: forget the token and remove the file
    pub fn clear(&self) -> Result<()> {
        self.remove(AuthState::SignedOut)
    }

    /// Drop a token the backend no longer accepts
    pub fn expire(&self) -> Result<()> {
        self.remove(AuthState::LoginRequired)
    }

    fn remove(&self, state: AuthState) -> Result<()> {
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.state.send_replace(state);
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn set(&self, data: Option<SessionData>) {
        let state = if data.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::SignedOut
        };
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        self.state.send_replace(state);
    }

    /// Get the bearer token if signed in
    pub fn token(&self) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.token.clone())
    }

    pub fn username(&self) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.username.clone())
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Observe auth state changes, e.g. to route the user to a login prompt.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}
