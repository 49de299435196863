//! Session bootstrap and current-user tracking.

use crate::api::{ApiResult, AssistantApi, User};

/// Who is signed in, if anyone. Updated by the auth flow and cleared on
/// logout or when the backend reports the session expired.
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    user: Option<User>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session at startup: a cheap status check first, then the
    /// full session lookup only when the backend says we are authenticated.
    pub fn init(api: &dyn AssistantApi) -> ApiResult<Self> {
        let status = api.auth_status()?;
        if !status.authenticated {
            return Ok(Self { user: None });
        }
        let session = api.session()?;
        Ok(Self {
            user: session.user.or(status.user),
        })
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn clear(&mut self) {
        self.user = None;
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
