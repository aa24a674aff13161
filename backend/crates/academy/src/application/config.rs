//! Application Configuration
//!
//! Configuration for the academy application layer.

use std::time::Duration;

use kernel::id::CourseId;

/// Academy application configuration
#[derive(Debug, Clone)]
pub struct AcademyConfig {
    /// ISO currency sent to the payment gateway (lower-case)
    pub currency: String,
    /// Redirect after a successful payment; `{courseId}` is substituted
    pub checkout_success_url: String,
    /// Redirect after a cancelled payment; `{courseId}` is substituted
    pub checkout_cancel_url: String,
    /// Upper bound for creating a checkout session
    pub checkout_timeout: Duration,
    /// Upper bound for processing one webhook delivery
    pub webhook_timeout: Duration,
    /// Shared secret the media CDN uses to validate tokens
    pub media_token_secret: String,
    pub media_library_id: String,
    /// Embed host, e.g. `https://iframe.mediadelivery.net`
    pub media_embed_host: String,
    /// Lifetime of a media token
    pub media_token_ttl: Duration,
}

impl Default for AcademyConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            checkout_success_url: "http://localhost:3000/courses/{courseId}?payment=success"
                .to_string(),
            checkout_cancel_url: "http://localhost:3000/courses/{courseId}?payment=canceled"
                .to_string(),
            checkout_timeout: Duration::from_secs(10),
            webhook_timeout: Duration::from_secs(10),
            media_token_secret: String::new(),
            media_library_id: String::new(),
            media_embed_host: "https://iframe.mediadelivery.net".to_string(),
            media_token_ttl: Duration::from_secs(2 * 3600), // 2 hours
        }
    }
}

impl AcademyConfig {
    /// Create config with a random media secret (for development)
    pub fn development() -> Self {
        Self {
            media_token_secret: platform::crypto::random_token(32),
            media_library_id: "dev-library".to_string(),
            ..Default::default()
        }
    }

    pub fn success_url(&self, course_id: &CourseId) -> String {
        self.checkout_success_url
            .replace("{courseId}", &course_id.to_string())
    }

    pub fn cancel_url(&self, course_id: &CourseId) -> String {
        self.checkout_cancel_url
            .replace("{courseId}", &course_id.to_string())
    }
}
