//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

// ============================================================================
// OAuth
// ============================================================================

/// Query string the provider appends to our callback URL
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined consent
    pub error: Option<String>,
}

// ============================================================================
// Session Status
// ============================================================================

/// Session status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub user_role: Option<String>,
    pub expires_at_ms: Option<i64>,
}

impl SessionStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
            email: None,
            name: None,
            user_role: None,
            expires_at_ms: None,
        }
    }
}
