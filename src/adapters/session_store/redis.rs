//! Redis-backed session store for multi-server deployments.
//!
//! Sessions are stored as JSON strings with `SET .. EX`. Conditional writes
//! run as a Lua script that decodes the stored document and compares its
//! `revision` before overwriting, so the check and the write are atomic.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::WizardSessionId;
use crate::domain::wizard::WizardSession;
use crate::ports::{SessionStoreError, WizardSessionStore};

/// KEYS[1] = session key; ARGV = expected revision, new JSON, ttl seconds.
const SET_IF_REVISION: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
local doc = cjson.decode(current)
if tonumber(doc['revision']) ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, id: WizardSessionId) -> String {
        format!("{}wizard:session:{}", self.key_prefix, id)
    }

    fn encode(session: &WizardSession) -> Result<String, SessionStoreError> {
        serde_json::to_string(session).map_err(|e| SessionStoreError::Serialization(e.to_string()))
    }
}

/// Redis rejects `EX 0`.
fn redis_ttl(ttl_secs: u64) -> u64 {
    ttl_secs.max(1)
}

fn unavailable(e: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Unavailable(e.to_string())
}

#[async_trait]
impl WizardSessionStore for RedisSessionStore {
    async fn get(&self, id: WizardSessionId) -> Result<Option<WizardSession>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(id)).await.map_err(unavailable)?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| SessionStoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn set(&self, session: &WizardSession, ttl_secs: u64) -> Result<(), SessionStoreError> {
        let json = Self::encode(session)?;
        let mut conn = self.conn.clone();

        redis::cmd("SET")
            .arg(self.key(session.id()))
            .arg(json)
            .arg("EX")
            .arg(redis_ttl(ttl_secs))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn set_if_revision(
        &self,
        session: &WizardSession,
        expected: u64,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let json = Self::encode(session)?;
        let mut conn = self.conn.clone();

        let written: i64 = redis::Script::new(SET_IF_REVISION)
            .key(self.key(session.id()))
            .arg(expected)
            .arg(json)
            .arg(redis_ttl(ttl_secs))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        if written == 1 {
            Ok(())
        } else {
            Err(SessionStoreError::RevisionMismatch {
                session_id: session.id(),
                expected,
            })
        }
    }

    async fn delete(&self, id: WizardSessionId) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(id)).await.map_err(unavailable)
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}
