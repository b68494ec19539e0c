use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::{MAX_SESSIONS, SESSION_IDLE_TIMEOUT};
use crate::conversation::Conversation;
use crate::questions::Script;

struct Entry {
    conversation: Conversation,
    last_touched: Instant,
}

/// In-memory conversations for browser sessions. Nothing survives a restart of the server.
///
/// Sessions idle for longer than `idle_timeout` are swept whenever a new one
/// is created, and the store never holds more than `max_sessions`: the least
/// recently touched session is evicted to make room.
pub struct SessionStore {
    script: Script,
    idle_timeout: Duration,
    max_sessions: usize,
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl SessionStore {
    pub fn new(script: Script) -> Self {
        Self::with_limits(script, SESSION_IDLE_TIMEOUT, MAX_SESSIONS)
    }

    pub fn with_limits(script: Script, idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            script,
            idle_timeout,
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_touched) < self.idle_timeout);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "Swept idle sessions");
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                    debug!(session = %oldest, "Evicted least recently used session");
                }
                None => break,
            }
        }

        sessions.insert(
            id,
            Entry {
                conversation: Conversation::new(self.script.clone()),
                last_touched: now,
            },
        );
        info!(session = %id, "Started new conversation");
        id
    }

    /// Runs `f` against a session while holding the lock. Returns `None` for unknown ids.
    ///
    /// Never await inside `f`; plan requests release the lock between
    /// `begin_plan_request` and `finish_plan_request`.
    pub async fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut Conversation) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(&id).map(|entry| {
            entry.last_touched = Instant::now();
            f(&mut entry.conversation)
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
