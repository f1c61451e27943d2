//! Session registry: maps an opaque bearer session id to an
//! account id, creating the account (and a fresh session id) the
//! first time either is unknown.

use std::collections::HashMap;

use crate::ids::AccountId;

/// An opaque, >=16-byte-entropy bearer token. Backed by a UUID v4
/// string, which comfortably exceeds that floor.
pub type SessionId = String;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, AccountId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `session_id` to an account, minting both a new session
    /// id and a fresh `AccountId` if `session_id` is absent or unknown.
    /// Returns `(session_id, account_id, is_new_account)`.
    pub fn resolve(&mut self, session_id: Option<&str>) -> (SessionId, AccountId, bool) {
        if let Some(id) = session_id {
            if let Some(&account) = self.sessions.get(id) {
                return (id.to_string(), account, false);
            }
        }
        let new_session = uuid::Uuid::new_v4().to_string();
        let account = AccountId::new();
        self.sessions.insert(new_session.clone(), account);
        (new_session, account, true)
    }

    pub fn account_for(&self, session_id: &str) -> Option<AccountId> {
        self.sessions.get(session_id).copied()
    }
}
