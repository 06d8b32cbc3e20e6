use std::sync::Arc;

use async_trait::async_trait;

use crate::directory::{DirectoryError, UserDirectory};
use crate::error::{AuthError, AuthResult};
use crate::principal::{Principal, Role};

/// Route group a policy guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectedArea {
    Trainer,
    Manager,
}

impl ProtectedArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectedArea::Trainer => "trainer",
            ProtectedArea::Manager => "manager",
        }
    }
}

impl std::fmt::Display for ProtectedArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the role check. A denied decision still carries the principal for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub authorized: bool,
    pub principal: Option<Principal>,
    pub role: Option<Role>,
}

impl AuthorizationDecision {
    pub fn granted(principal: &Principal) -> Self {
        Self {
            authorized: true,
            principal: Some(principal.clone()),
            role: Some(principal.role),
        }
    }

    pub fn denied(principal: &Principal) -> Self {
        Self {
            authorized: false,
            principal: Some(principal.clone()),
            role: Some(principal.role),
        }
    }

    fn principal_name(&self) -> &str {
        self.principal
            .as_ref()
            .map(|principal| principal.name.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine(String);

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides whether a principal may enter a protected route group.
///
/// Role mismatches come back as a denied [`AuthorizationDecision`]; only
/// directory faults and account-state failures are errors.
#[async_trait]
pub trait AuthorizationPolicy: Send + Sync + 'static {
    fn area(&self) -> ProtectedArea;

    fn authorize(&self, principal: &Principal) -> AuthorizationDecision;

    async fn check_active(&self, principal: &Principal) -> AuthResult<()>;

    fn unauthorized_response_kind(&self) -> AuthError {
        AuthError::InsufficientRole(self.area())
    }

    fn describe_success(&self, decision: &AuthorizationDecision) -> LogLine;

    fn describe_failure(&self, name: Option<&str>) -> LogLine;
}

fn directory_fault(err: DirectoryError) -> AuthError {
    AuthError::DirectoryUnavailable(err.to_string())
}

/// Guards manager-only routes.
#[derive(Clone)]
pub struct ManagerPolicy {
    directory: Arc<dyn UserDirectory>,
}

impl ManagerPolicy {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AuthorizationPolicy for ManagerPolicy {
    fn area(&self) -> ProtectedArea {
        ProtectedArea::Manager
    }

    fn authorize(&self, principal: &Principal) -> AuthorizationDecision {
        match principal.role {
            Role::Manager => AuthorizationDecision::granted(principal),
            Role::User => AuthorizationDecision::denied(principal),
        }
    }

    async fn check_active(&self, principal: &Principal) -> AuthResult<()> {
        let active = self
            .directory
            .is_active_manager(&principal.name)
            .await
            .map_err(directory_fault)?;
        if active {
            Ok(())
        } else {
            Err(AuthError::InactiveAccount)
        }
    }

    fn describe_success(&self, decision: &AuthorizationDecision) -> LogLine {
        LogLine::new(format!(
            "manager '{}' granted access to the manager area",
            decision.principal_name()
        ))
    }

    fn describe_failure(&self, name: Option<&str>) -> LogLine {
        match name {
            Some(name) => LogLine::new(format!("manager area access denied for '{name}'")),
            None => LogLine::new("manager area access denied before a principal could be identified"),
        }
    }
}

/// Guards routes open to any registered trainee, managers included.
#[derive(Clone)]
pub struct TrainerPolicy {
    directory: Arc<dyn UserDirectory>,
}

impl TrainerPolicy {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AuthorizationPolicy for TrainerPolicy {
    fn area(&self) -> ProtectedArea {
        ProtectedArea::Trainer
    }

    fn authorize(&self, principal: &Principal) -> AuthorizationDecision {
        match principal.role {
            Role::User | Role::Manager => AuthorizationDecision::granted(principal),
        }
    }

    async fn check_active(&self, principal: &Principal) -> AuthResult<()> {
        let exists = self
            .directory
            .exists(&principal.name)
            .await
            .map_err(directory_fault)?;
        if exists {
            Ok(())
        } else {
            Err(AuthError::AccountNotFound)
        }
    }

    fn describe_success(&self, decision: &AuthorizationDecision) -> LogLine {
        let role = decision.role.map(|role| role.as_str()).unwrap_or("unknown");
        LogLine::new(format!(
            "{role} '{}' granted access to the trainer area",
            decision.principal_name()
        ))
    }

    fn describe_failure(&self, name: Option<&str>) -> LogLine {
        match name {
            Some(name) => LogLine::new(format!("trainer area access denied for '{name}'")),
            None => LogLine::new("trainer area access denied before a principal could be identified"),
        }
    }
}
