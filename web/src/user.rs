//! In-memory login backend for axum-login.
//!
//! Users come from configuration (`--users username:password`). Passwords are
//! hashed once at startup and only the hashes are kept. A user's id doubles as
//! the SSE channel id for that user's connections.

use async_trait::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use serde::Deserialize;
use service::config::UserEntry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::Error;

#[derive(Clone)]
pub struct User {
    id: String,
    password_hash: String,
}

impl User {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("password_hash", &"********")
            .finish()
    }
}

impl AuthUser for User {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.clone()
    }

    // Changing a user's password invalidates their existing sessions.
    fn session_auth_hash(&self) -> &[u8] {
        self.password_hash.as_bytes()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Backend {
    users: Arc<HashMap<String, User>>,
}

impl Backend {
    pub fn new(entries: &[UserEntry]) -> Self {
        let users = entries
            .iter()
            .map(|entry| {
                let user = User {
                    id: entry.username.clone(),
                    password_hash: password_auth::generate_hash(&entry.password),
                };
                (user.id.clone(), user)
            })
            .collect();

        Self {
            users: Arc::new(users),
        }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = User;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(user) = self.users.get(&creds.username) else {
            return Ok(None);
        };

        match password_auth::verify_password(&creds.password, &user.password_hash) {
            Ok(()) => Ok(Some(user.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.users.get(user_id).cloned())
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
