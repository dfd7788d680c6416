//! Command authorization.

use super::CommandRequest;

/// Outcome of authorizing a command. Authorized when no messages were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationResult {
    messages: Vec<String>,
}

impl AuthorizationResult {
    pub fn authorized() -> Self {
        Self::default()
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Decides whether a command may run. Must be free of side effects.
pub trait CommandSecurity: Send + Sync {
    fn authorize(&self, request: &CommandRequest) -> AuthorizationResult;
}

/// Authorizes every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl CommandSecurity for AllowAll {
    fn authorize(&self, _request: &CommandRequest) -> AuthorizationResult {
        AuthorizationResult::authorized()
    }
}

impl<F> CommandSecurity for F
where
    F: Fn(&CommandRequest) -> AuthorizationResult + Send + Sync,
{
    fn authorize(&self, request: &CommandRequest) -> AuthorizationResult {
        self(request)
    }
}
