//! Short-lived chat session tokens ("client secrets").
//!
//! Security properties:
//! - Tokens are cryptographically random (32 bytes, hex-encoded)
//! - Tokens are ephemeral (in-memory only, never persisted)
//! - Validation is constant-time and rejects expired tokens
//! - Expired tokens are removed lazily on validation and via `purge_expired`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

#[derive(Clone)]
struct SessionEntry {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// In-memory store for chat session tokens.
#[derive(Clone)]
pub struct SessionTokenStore {
    /// Maps token -> owner and expiry. Never logged or persisted.
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionTokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Generate and store a new token for a user.
    pub async fn issue(&self, user_id: &str) -> (String, DateTime<Utc>) {
        let token = generate_token();
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::seconds(3600));
        self.sessions.write().await.insert(
            token.clone(),
            SessionEntry {
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        (token, expires_at)
    }

    /// Resolve a token to its user (constant-time comparison). Expired
    /// tokens are removed and rejected.
    pub async fn validate(&self, token: &str) -> Option<String> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let matched = sessions.iter().find_map(|(stored, entry)| {
            let eq: bool = stored.as_bytes().ct_eq(token.as_bytes()).into();
            eq.then(|| (stored.clone(), entry.clone()))
        });

        match matched {
            Some((_, entry)) if entry.expires_at > now => Some(entry.user_id),
            Some((stored, _)) => {
                sessions.remove(&stored);
                None
            }
            None => None,
        }
    }

    /// Remove a token explicitly.
    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Drop all expired tokens. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    /// Number of live tokens (for diagnostics).
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generate a cryptographically random token (32 bytes, hex-encoded = 64 chars).
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().fold(String::with_capacity(64), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}
