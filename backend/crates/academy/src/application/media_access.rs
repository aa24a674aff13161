//! Media Access Use Case
//!
//! Mints time-limited CDN playback tokens for entitled learners. Tokens are
//! not revocable; they simply expire.

use std::sync::Arc;

use chrono::Utc;
use kernel::identity::RequestIdentity;
use reqwest::Url;

use crate::application::check_access::CheckAccessUseCase;
use crate::application::config::AcademyConfig;
use crate::domain::repository::{CourseRepository, LearnerRepository};
use crate::domain::services::sign_media_token;
use crate::error::{AcademyError, AcademyResult};

#[derive(Debug, Clone)]
pub struct MediaToken {
    pub token: String,
    /// Unix seconds
    pub expires: i64,
    /// Seconds from now
    pub expires_in: i64,
    pub media_id: String,
    /// Embed URL carrying `token` and `expires`
    pub url: String,
}

pub struct MediaAccessUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    access: CheckAccessUseCase<L, C>,
    course_repo: Arc<C>,
    config: Arc<AcademyConfig>,
}

impl<L, C> MediaAccessUseCase<L, C>
where
    L: LearnerRepository,
    C: CourseRepository,
{
    pub fn new(learner_repo: Arc<L>, course_repo: Arc<C>, config: Arc<AcademyConfig>) -> Self {
        Self {
            access: CheckAccessUseCase::new(learner_repo, course_repo.clone()),
            course_repo,
            config,
        }
    }

    pub async fn issue_token(
        &self,
        identity: RequestIdentity,
        media_id: &str,
    ) -> AcademyResult<MediaToken> {
        let media_id = media_id.trim();
        if media_id.is_empty() {
            return Err(AcademyError::MediaNotFound);
        }
        if identity.user_id().is_none() {
            return Err(AcademyError::NotAuthenticated);
        }

        let lessons = self.course_repo.find_lessons_by_media(media_id).await?;
        if lessons.is_empty() {
            return Err(AcademyError::MediaNotFound);
        }

        // Any course that plays this video and admits the user is enough.
        // A failed check outranks a plain denial.
        let mut granted = None;
        let mut refusal = AcademyError::AccessDenied;
        for (course_id, lesson_id) in lessons {
            match self.access.require_lesson(identity, course_id, lesson_id).await {
                Ok(entitled) => {
                    granted = Some((course_id, entitled));
                    break;
                }
                Err(e) => {
                    if !matches!(refusal, AcademyError::AccessCheckFailed) {
                        refusal = e;
                    }
                }
            }
        }
        let Some((course_id, entitled)) = granted else {
            return Err(refusal);
        };

        let ttl = i64::try_from(self.config.media_token_ttl.as_secs()).unwrap_or(i64::MAX / 2);
        let expires = Utc::now().timestamp() + ttl;
        let token = sign_media_token(&self.config.media_token_secret, media_id, expires);
        let url = self.embed_url(media_id, &token, expires)?;

        tracing::debug!(
            user_id = %entitled.learner.user_id,
            course_id = %course_id,
            media_id = %media_id,
            "Media token issued"
        );

        Ok(MediaToken {
            token,
            expires,
            expires_in: ttl,
            media_id: media_id.to_string(),
            url,
        })
    }

    fn embed_url(&self, media_id: &str, token: &str, expires: i64) -> AcademyResult<String> {
        let base = format!(
            "{}/embed/{}/{}",
            self.config.media_embed_host.trim_end_matches('/'),
            self.config.media_library_id,
            media_id
        );
        let url = Url::parse_with_params(
            &base,
            &[("token", token), ("expires", expires.to_string().as_str())],
        )
        .map_err(|e| AcademyError::Internal(format!("Invalid media embed URL: {e}")))?;

        Ok(url.into())
    }
}
