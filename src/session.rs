//! Session context: who is logged in, and with which role.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`SessionManager`] is constructed at startup and handed to whoever
//! needs it. It is the only writer of the persisted identity
//! ([`USER_KEY`]) and the bearer token ([`TOKEN_KEY`]); the API client only
//! reads the token.
//!
//! STATES
//! ======
//! `Anonymous` -> `Authenticated` on a successful [`SessionManager::login`];
//! back to `Anonymous` on [`SessionManager::logout`]. Registration never
//! changes state: new accounts wait for administrator approval and cannot
//! log in yet. There is no expiry detection or token refresh.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::net::api::{ApiClient, ApiError, TOKEN_KEY};
use crate::net::types::{RequestOptions, deserialize_scalar_text};
use crate::routes::{self, HOME_PATH, LOGIN_PATH};
use crate::storage::{Storage, StorageError};

pub const USER_KEY: &str = "auth_user";
pub const LOGIN_PATH_API: &str = "/api/Auth/login";
pub const REGISTER_PATH_API: &str = "/api/Auth/register";

/// Permission code the backend issues to administrators.
pub const ADMIN_PERMISSION_CODE: i64 = 1;

/// Placeholder contact details required by the register endpoint's validation.
const REGISTER_EMAIL_DOMAIN: &str = "bilco.local";
const REGISTER_PHONE_PLACEHOLDER: &str = "0000000000";
const REGISTER_DEPARTMENT_PLACEHOLDER: &str = "Chưa cập nhật";
const REGISTER_POSITION_PLACEHOLDER: &str = "Nhân viên mới";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("session could not be serialized: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Parse an explicit role string; only `admin` and `user` are valid.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_permission_code(code: i64) -> Self {
        if code == ADMIN_PERMISSION_CODE { Self::Admin } else { Self::User }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// The logged-in identity as persisted under [`USER_KEY`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Borrowed view of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState<'a> {
    Anonymous,
    Authenticated(&'a Session),
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "tenDangNhap")]
    username: &'a str,
    #[serde(rename = "matKhau")]
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    #[serde(rename = "tenDangNhap")]
    username: &'a str,
    #[serde(rename = "matKhau")]
    password: &'a str,
    #[serde(rename = "maQuyen")]
    permission_code: Option<i64>,
    email: String,
    #[serde(rename = "soDienThoai")]
    phone: &'a str,
    #[serde(rename = "phongBan")]
    department: &'a str,
    #[serde(rename = "chucVu")]
    position: &'a str,
}

impl<'a> RegisterRequest<'a> {
    fn pending(username: &'a str, password: &'a str) -> Self {
        Self {
            username,
            password,
            permission_code: None,
            email: format!("{username}@{REGISTER_EMAIL_DOMAIN}"),
            phone: REGISTER_PHONE_PLACEHOLDER,
            department: REGISTER_DEPARTMENT_PLACEHOLDER,
            position: REGISTER_POSITION_PLACEHOLDER,
        }
    }
}

/// Nested user object some backend versions return.
#[derive(Debug, Default, Deserialize)]
pub struct LoginUser {
    #[serde(default, deserialize_with = "deserialize_scalar_text")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "maNV", deserialize_with = "deserialize_scalar_text")]
    pub employee_number: Option<String>,
    #[serde(default, rename = "hoTen")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

/// Body of `POST /api/Auth/login`. Only `token` is guaranteed.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default, rename = "maND", deserialize_with = "deserialize_scalar_text")]
    pub user_number: Option<String>,
    #[serde(default, rename = "maNV", deserialize_with = "deserialize_scalar_text")]
    pub employee_number: Option<String>,
    #[serde(default, rename = "tenDangNhap")]
    pub username: Option<String>,
    #[serde(default, rename = "maQuyen")]
    pub permission_code: Option<Value>,
    #[serde(default, rename = "hoTen")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "soDienThoai")]
    pub phone: Option<String>,
    #[serde(default, rename = "phongBan")]
    pub department: Option<String>,
    #[serde(default, rename = "chucVu")]
    pub position: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

impl LoginResponse {
    /// Explicit valid role first, then the numeric permission code, else user.
    #[must_use]
    pub fn role(&self) -> Role {
        if let Some(role) = self.user.as_ref().and_then(|u| u.role.as_deref()).and_then(Role::parse) {
            return role;
        }
        self.permission_code
            .as_ref()
            .and_then(integral_code)
            .map_or(Role::User, Role::from_permission_code)
    }

    /// Flatten into a [`Session`]; `typed_username` fills missing identity.
    #[must_use]
    pub fn into_session(self, typed_username: &str) -> Session {
        let role = self.role();
        let user = self.user.unwrap_or_default();
        Session {
            user_id: user.id.or_else(|| self.user_number.clone()).unwrap_or_else(|| typed_username.to_owned()),
            username: user.username.or(self.username).unwrap_or_else(|| typed_username.to_owned()),
            role,
            employee_number: self.employee_number.or(user.employee_number).or(self.user_number),
            full_name: non_empty(self.full_name.or(user.full_name)),
            email: non_empty(self.email.or(user.email)),
            phone: non_empty(self.phone.or(user.phone)),
            department: non_empty(self.department.or(user.department)),
            position: non_empty(self.position.or(user.position)),
        }
    }
}

/// Numeric permission code; `1.0` counts as `1`, strings do not count.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn integral_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|code| code.fract() == 0.0 && code.abs() <= 9_007_199_254_740_992.0)
            .map(|code| code as i64)
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// OUTCOMES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session: Session,
    /// Route the UI should show next.
    pub landing: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Account created; an administrator must approve it before login works.
    PendingApproval,
}

// =============================================================================
// MANAGER
// =============================================================================

pub struct SessionManager {
    api: ApiClient,
    storage: Arc<dyn Storage>,
    current: Option<Session>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").field("current", &self.current).finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Start from whatever identity `api`'s storage holds.
    #[must_use]
    pub fn restore(api: ApiClient) -> Self {
        let storage = api.storage().clone();
        let current = load_stored_session(storage.as_ref());
        Self { api, storage, current }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> SessionState<'_> {
        self.current.as_ref().map_or(SessionState::Anonymous, SessionState::Authenticated)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current.as_ref().is_some_and(Session::is_admin)
    }

    /// Re-read the persisted identity, dropping it if corrupt.
    pub fn reload(&mut self) -> Option<&Session> {
        self.current = load_stored_session(self.storage.as_ref());
        self.current.as_ref()
    }

    /// Authenticate, persist identity and token, and pick the landing route.
    ///
    /// # Errors
    ///
    /// API failures propagate unchanged; nothing is stored in that case. A
    /// storage failure leaves the previous identity and token pair in place.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let request = LoginRequest { username, password };
        let response: LoginResponse = self.api.post(LOGIN_PATH_API, &request, RequestOptions::default()).await?;

        let token = response.token.clone();
        let session = response.into_session(username);

        self.persist(&session, &token)?;
        self.current = Some(session.clone());

        let landing = routes::landing(HOME_PATH, Some(&session));
        tracing::info!(user_id = %session.user_id, role = session.role.as_str(), landing, "logged in");
        Ok(LoginOutcome { session, landing })
    }

    /// Create an unapproved account. Does not log in.
    ///
    /// # Errors
    ///
    /// API failures (e.g. a duplicate username) propagate unchanged.
    pub async fn register(&self, username: &str, password: &str) -> Result<RegisterOutcome, SessionError> {
        let request = RegisterRequest::pending(username, password);
        let _: Value = self.api.post(REGISTER_PATH_API, &request, RequestOptions::default()).await?;
        tracing::info!(username, "registered; awaiting approval");
        Ok(RegisterOutcome::PendingApproval)
    }

    /// Forget the session in memory and in storage; returns the login route.
    ///
    /// # Errors
    ///
    /// Returns the first storage error if either key cannot be removed. Both
    /// removals are always attempted and the in-memory session is cleared
    /// regardless.
    pub fn logout(&mut self) -> Result<&'static str, SessionError> {
        let previous = self.current.take();
        let user = self.storage.remove(USER_KEY);
        let token = self.storage.remove(TOKEN_KEY);
        if let Some(session) = previous {
            tracing::info!(user_id = %session.user_id, "logged out");
        }
        user.and(token)?;
        Ok(LOGIN_PATH)
    }

    /// Write identity then token. A failed token write restores the previous
    /// identity so storage never pairs one user with another user's token.
    fn persist(&self, session: &Session, token: &str) -> Result<(), SessionError> {
        let previous_user = self.storage.get(USER_KEY)?;
        self.storage.set(USER_KEY, &serde_json::to_string(session)?)?;

        if let Err(error) = self.storage.set(TOKEN_KEY, token) {
            let rollback = match &previous_user {
                Some(raw) => self.storage.set(USER_KEY, raw),
                None => self.storage.remove(USER_KEY),
            };
            if let Err(rollback_error) = rollback {
                tracing::warn!(%rollback_error, "stored identity could not be rolled back");
            }
            return Err(error.into());
        }
        Ok(())
    }
}

/// Read [`USER_KEY`]; an unparseable value is removed and treated as absent.
fn load_stored_session(storage: &dyn Storage) -> Option<Session> {
    let raw = match storage.get(USER_KEY) {
        Ok(raw) => raw?,
        Err(error) => {
            tracing::warn!(%error, "session storage unreadable; starting anonymous");
            return None;
        }
    };

    match serde_json::from_str::<Session>(&raw) {
        Ok(session) => Some(session),
        Err(error) => {
            tracing::warn!(%error, "discarding corrupt stored session");
            if let Err(error) = storage.remove(USER_KEY) {
                tracing::debug!(%error, "corrupt session could not be removed");
            }
            None
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
