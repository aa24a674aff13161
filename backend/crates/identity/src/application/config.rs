//! Application Configuration
//!
//! Configuration for the identity application layer.

use std::collections::HashSet;
use std::time::Duration;

use platform::cookie::CookieConfig;
pub use platform::cookie::SameSite;

use crate::domain::value_object::email::Email;

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    pub session_ttl: Duration,
    /// Cookie holding the OAuth `state` between start and callback
    pub oauth_state_cookie_name: String,
    pub oauth_state_ttl: Duration,
    /// Where the browser lands after a successful sign-in
    pub post_sign_in_redirect: String,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Break-glass administrators, provisioned to `admin` when they sign in
    pub admin_emails: HashSet<Email>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "academy_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(30 * 24 * 3600), // 30 days
            oauth_state_cookie_name: "academy_oauth_state".to_string(),
            oauth_state_ttl: Duration::from_secs(600),
            post_sign_in_redirect: "/".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            admin_emails: HashSet::new(),
        }
    }
}

impl IdentityConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&platform::crypto::random_bytes(32));
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Parse a comma-separated allow-list, skipping entries that are not emails
    pub fn parse_admin_emails(raw: &str) -> HashSet<Email> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match Email::new(entry) {
                Ok(email) => Some(email),
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "Ignoring invalid admin email");
                    None
                }
            })
            .collect()
    }

    pub fn is_break_glass_admin(&self, email: &Email) -> bool {
        self.admin_emails.contains(email)
    }

    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::days(30))
    }

    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig::named(&self.session_cookie_name)
            .with_secure(self.cookie_secure)
            .with_same_site(self.cookie_same_site)
            .with_max_age(self.session_ttl.as_secs())
    }

    /// The state cookie must survive the cross-site redirect back from the
    /// provider, so it is always `Lax`.
    pub fn oauth_state_cookie(&self) -> CookieConfig {
        CookieConfig::named(&self.oauth_state_cookie_name)
            .with_secure(self.cookie_secure)
            .with_same_site(SameSite::Lax)
            .with_max_age(self.oauth_state_ttl.as_secs())
    }
}
