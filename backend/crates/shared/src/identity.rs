//! Request Identity
//!
//! The identity context authenticates a request and attaches a
//! [`RequestIdentity`] to its extensions. Other contexts only see the user id:
//! roles and entitlements are always re-read from the database.

use crate::id::UserId;

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Identity attached to a request, `None` for anonymous callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestIdentity(pub Option<Identity>);

impl RequestIdentity {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(user_id: UserId) -> Self {
        Self(Some(Identity::new(user_id)))
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.0.map(|identity| identity.user_id)
    }
}

#[cfg(feature = "axum")]
impl<S> axum::extract::FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestIdentity>()
            .copied()
            .unwrap_or_default())
    }
}
