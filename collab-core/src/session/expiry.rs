//! Expiry supervisor
//!
//! Every session gets one cancellable timer when it is created. When the
//! grace window elapses the registry checks the session once and drops it
//! if nobody joined. There is no recurring check.

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::registry::SessionRegistry;
use super::state::SessionId;

/// Default grace window before an empty session is discarded
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// One-shot expiry timers keyed by session id
pub struct ExpirySupervisor {
    grace_window: Duration,
    /// Parent of every timer token; cancelled when the supervisor drops
    root: CancellationToken,
    timers: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl ExpirySupervisor {
    /// Create a supervisor with the given grace window
    pub fn new(grace_window: Duration) -> Self {
        Self {
            grace_window,
            root: CancellationToken::new(),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// The configured grace window
    pub fn grace_window(&self) -> Duration {
        self.grace_window
    }

    /// Start the grace timer for a session
    ///
    /// The timer holds only a weak reference to the registry and ends as
    /// soon as the supervisor is dropped.
    pub async fn schedule(&self, registry: Weak<SessionRegistry>, session_id: SessionId) {
        let token = self.root.child_token();
        if let Some(previous) = self
            .timers
            .lock()
            .await
            .insert(session_id.clone(), token.clone())
        {
            previous.cancel();
        }

        let grace_window = self.grace_window;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(session_id = %session_id, "Expiry timer cancelled");
                }
                _ = tokio::time::sleep(grace_window) => {
                    if let Some(registry) = registry.upgrade() {
                        registry.expiry().forget(&session_id).await;
                        registry.expire_if_empty(&session_id).await;
                    }
                }
            }
        });
    }

    /// Cancel the timer of a session destroyed before its grace window ended
    pub async fn cancel(&self, session_id: &str) -> bool {
        match self.timers.lock().await.remove(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer
    pub async fn cancel_all(&self) -> usize {
        let mut timers = self.timers.lock().await;
        let count = timers.len();
        for (_, token) in timers.drain() {
            token.cancel();
        }
        count
    }

    /// Whether a timer is still pending for the session
    pub async fn is_scheduled(&self, session_id: &str) -> bool {
        self.timers.lock().await.contains_key(session_id)
    }

    /// Number of pending timers
    pub async fn pending(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Drop the bookkeeping entry of a timer that just fired
    async fn forget(&self, session_id: &str) {
        self.timers.lock().await.remove(session_id);
    }
}

impl Drop for ExpirySupervisor {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
