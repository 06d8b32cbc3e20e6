use axum::Json;
use common_auth::{CurrentPrincipal, ProtectedArea, Role};
use serde::{Deserialize, Serialize};

/// The caller as seen by a handler behind the auth pipeline.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub nickname: String,
    pub role: Role,
    pub area: String,
}

impl SessionView {
    fn new(CurrentPrincipal(principal): CurrentPrincipal, area: ProtectedArea) -> Self {
        Self {
            nickname: principal.name,
            role: principal.role,
            area: area.as_str().to_string(),
        }
    }
}

pub async fn trainer_session(principal: CurrentPrincipal) -> Json<SessionView> {
    Json(SessionView::new(principal, ProtectedArea::Trainer))
}

pub async fn manager_session(principal: CurrentPrincipal) -> Json<SessionView> {
    Json(SessionView::new(principal, ProtectedArea::Manager))
}
