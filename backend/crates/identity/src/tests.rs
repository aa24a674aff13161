//! Unit tests for the identity crate

#[cfg(test)]
mod fakes {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use kernel::id::UserId;
    use uuid::Uuid;

    use crate::domain::entity::{auth_session::AuthSession, user::User};
    use crate::domain::repository::{
        AuthSessionRepository, OAuthProfile, OAuthProvider, UserRepository,
    };
    use crate::domain::value_object::email::Email;
    use crate::error::{IdentityError, IdentityResult};

    #[derive(Clone, Default)]
    pub struct MemoryRepo {
        pub users: Arc<Mutex<HashMap<UserId, User>>>,
        pub sessions: Arc<Mutex<HashMap<Uuid, AuthSession>>>,
    }

    impl MemoryRepo {
        pub fn user_by_email(&self, email: &str) -> Option<User> {
            self.users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email.as_str() == email)
                .cloned()
        }

        pub fn session_count(&self) -> usize {
            self.sessions.lock().unwrap().len()
        }
    }

    impl UserRepository for MemoryRepo {
        async fn create(&self, user: &User) -> IdentityResult<()> {
            self.users.lock().unwrap().insert(user.user_id, user.clone());
            Ok(())
        }

        async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<User>> {
            Ok(self.users.lock().unwrap().get(user_id).cloned())
        }

        async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| &u.email == email)
                .cloned())
        }

        async fn update(&self, user: &User) -> IdentityResult<()> {
            self.users.lock().unwrap().insert(user.user_id, user.clone());
            Ok(())
        }
    }

    impl AuthSessionRepository for MemoryRepo {
        async fn create(&self, session: &AuthSession) -> IdentityResult<()> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.session_id, session.clone());
            Ok(())
        }

        async fn find_by_id(&self, session_id: Uuid) -> IdentityResult<Option<AuthSession>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .get(&session_id)
                .filter(|s| !s.is_expired())
                .cloned())
        }

        async fn delete(&self, session_id: Uuid) -> IdentityResult<()> {
            self.sessions.lock().unwrap().remove(&session_id);
            Ok(())
        }

        async fn cleanup_expired(&self) -> IdentityResult<u64> {
            let mut sessions = self.sessions.lock().unwrap();
            let before = sessions.len();
            sessions.retain(|_, s| !s.is_expired());
            Ok((before - sessions.len()) as u64)
        }
    }

    #[derive(Clone)]
    pub struct StaticProvider {
        pub profile: OAuthProfile,
    }

    impl StaticProvider {
        pub fn verified(email: &str) -> Self {
            Self {
                profile: OAuthProfile {
                    email: email.to_string(),
                    email_verified: true,
                    name: Some("Anna".to_string()),
                },
            }
        }
    }

    impl OAuthProvider for StaticProvider {
        fn authorize_url(&self, state: &str) -> IdentityResult<String> {
            Ok(format!("https://provider.test/authorize?state={state}"))
        }

        async fn exchange_code(&self, code: &str) -> IdentityResult<OAuthProfile> {
            if code == "good-code" {
                Ok(self.profile.clone())
            } else {
                Err(IdentityError::OAuthProvider("invalid_grant".into()))
            }
        }
    }
}

#[cfg(test)]
mod config_tests {
    use crate::application::config::*;
    use crate::domain::value_object::email::Email;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = IdentityConfig::default();

        assert_eq!(config.session_cookie_name, "academy_session");
        assert_eq!(config.session_ttl, Duration::from_secs(30 * 24 * 3600));
        assert!(config.cookie_secure);
        assert_eq!(config.cookie_same_site, SameSite::Lax);
        assert!(config.admin_emails.is_empty());
    }

    #[test]
    fn test_with_random_secret() {
        let config1 = IdentityConfig::with_random_secret();
        let config2 = IdentityConfig::with_random_secret();

        assert_ne!(config1.session_secret, config2.session_secret);
    }

    #[test]
    fn test_development_config() {
        let config = IdentityConfig::development();

        assert!(!config.cookie_secure);
        assert!(config.session_secret.iter().any(|&b| b != 0));
        assert!(!config.session_cookie().build_set_cookie("x").contains("Secure"));
    }

    #[test]
    fn test_parse_admin_emails_skips_garbage() {
        let emails = IdentityConfig::parse_admin_emails(" Root@Example.com , ,not-an-email");

        assert_eq!(emails.len(), 1);
        assert!(emails.contains(&Email::new("root@example.com").unwrap()));
    }

    #[test]
    fn test_oauth_state_cookie_is_lax() {
        let config = IdentityConfig {
            cookie_same_site: SameSite::Strict,
            ..IdentityConfig::default()
        };

        let cookie = config.oauth_state_cookie().build_set_cookie("s");
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=600"));
    }
}

#[cfg(test)]
mod use_case_tests {
    use std::sync::Arc;

    use super::fakes::MemoryRepo;
    use crate::application::config::IdentityConfig;
    use crate::application::{CheckSessionUseCase, SignInUseCase, SignOutUseCase};
    use crate::domain::repository::OAuthProfile;
    use crate::domain::value_object::{email::Email, user_role::UserRole};
    use crate::error::IdentityError;

    fn profile(email: &str) -> OAuthProfile {
        OAuthProfile {
            email: email.to_string(),
            email_verified: true,
            name: Some("  Anna  ".to_string()),
        }
    }

    fn config_with_admin(admin: &str) -> Arc<IdentityConfig> {
        let mut config = IdentityConfig::development();
        config.admin_emails.insert(Email::new(admin).unwrap());
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_plain_user() {
        let repo = Arc::new(MemoryRepo::default());
        let config = Arc::new(IdentityConfig::development());
        let use_case = SignInUseCase::new(repo.clone(), repo.clone(), config);

        let output = use_case.execute(profile("Anna@Example.com")).await.unwrap();

        assert!(output.is_new_user);
        assert_eq!(output.user_role, UserRole::User);

        let stored = repo.user_by_email("anna@example.com").unwrap();
        assert_eq!(stored.name.as_deref(), Some("Anna"));
        assert!(stored.last_login_at.is_some());
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn test_second_sign_in_reuses_user() {
        let repo = Arc::new(MemoryRepo::default());
        let config = Arc::new(IdentityConfig::development());
        let use_case = SignInUseCase::new(repo.clone(), repo.clone(), config);

        let first = use_case.execute(profile("anna@example.com")).await.unwrap();
        let second = use_case.execute(profile("ANNA@example.com")).await.unwrap();

        assert!(!second.is_new_user);
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(repo.users.lock().unwrap().len(), 1);
        assert_ne!(first.session_token, second.session_token);
    }

    #[tokio::test]
    async fn test_break_glass_admin_is_provisioned() {
        let repo = Arc::new(MemoryRepo::default());
        let use_case =
            SignInUseCase::new(repo.clone(), repo.clone(), config_with_admin("root@example.com"));

        let output = use_case.execute(profile("root@example.com")).await.unwrap();

        assert_eq!(output.user_role, UserRole::Admin);
        assert!(repo.user_by_email("root@example.com").unwrap().user_role.is_admin());
    }

    #[tokio::test]
    async fn test_unverified_email_is_refused() {
        let repo = Arc::new(MemoryRepo::default());
        let use_case = SignInUseCase::new(
            repo.clone(),
            repo.clone(),
            Arc::new(IdentityConfig::development()),
        );

        let mut unverified = profile("anna@example.com");
        unverified.email_verified = false;

        let err = use_case.execute(unverified).await.err().unwrap();
        assert!(matches!(err, IdentityError::EmailNotVerified));
        assert!(repo.users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_round_trip_and_sign_out() {
        let repo = Arc::new(MemoryRepo::default());
        let config = Arc::new(IdentityConfig::development());
        let sign_in = SignInUseCase::new(repo.clone(), repo.clone(), config.clone());
        let output = sign_in.execute(profile("anna@example.com")).await.unwrap();

        let check = CheckSessionUseCase::new(repo.clone(), config.clone());
        let info = check
            .execute(repo.as_ref(), &output.session_token)
            .await
            .unwrap();
        assert_eq!(info.user_id, output.user_id);
        assert_eq!(info.user_role, "user");

        assert_eq!(
            check.resolve_user_id(Some(&output.session_token)).await,
            Some(output.user_id)
        );

        SignOutUseCase::new(repo.clone(), config.clone())
            .execute(&output.session_token)
            .await
            .unwrap();

        assert_eq!(check.resolve_user_id(Some(&output.session_token)).await, None);
    }

    #[tokio::test]
    async fn test_forged_token_resolves_to_anonymous() {
        let repo = Arc::new(MemoryRepo::default());
        let check = CheckSessionUseCase::new(repo, Arc::new(IdentityConfig::development()));

        assert_eq!(check.resolve_user_id(None).await, None);
        assert_eq!(check.resolve_user_id(Some("forged.token")).await, None);
    }
}

#[cfg(test)]
mod http_tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use axum::{Router, middleware};
    use kernel::identity::RequestIdentity;
    use tower::ServiceExt;

    use super::fakes::{MemoryRepo, StaticProvider};
    use crate::application::config::IdentityConfig;
    use crate::presentation::middleware::{IdentityMiddlewareState, resolve_identity};
    use crate::presentation::router::identity_router_generic;

    fn set_cookies(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn cookie_pair(set_cookie: &str) -> &str {
        set_cookie.split(';').next().unwrap()
    }

    #[tokio::test]
    async fn test_oauth_start_sets_state_and_redirects() {
        let app = identity_router_generic(
            MemoryRepo::default(),
            StaticProvider::verified("anna@example.com"),
            Arc::new(IdentityConfig::development()),
        );

        let response = app
            .oneshot(Request::get("/oauth/start").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        let cookies = set_cookies(&response);
        let state = cookie_pair(&cookies[0]).split_once('=').unwrap().1;
        assert!(location.ends_with(&format!("state={state}")));
    }

    #[tokio::test]
    async fn test_callback_rejects_state_mismatch() {
        let app = identity_router_generic(
            MemoryRepo::default(),
            StaticProvider::verified("anna@example.com"),
            Arc::new(IdentityConfig::development()),
        );

        let response = app
            .oneshot(
                Request::get("/oauth/callback?code=good-code&state=attacker")
                    .header(header::COOKIE, "academy_oauth_state=mine")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_signs_in_and_middleware_resolves_identity() {
        let repo = MemoryRepo::default();
        let config = Arc::new(IdentityConfig::development());
        let auth = identity_router_generic(
            repo.clone(),
            StaticProvider::verified("anna@example.com"),
            config.clone(),
        );

        let response = auth
            .oneshot(
                Request::get("/oauth/callback?code=good-code&state=s1")
                    .header(header::COOKIE, "academy_oauth_state=s1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookies = set_cookies(&response);
        let session = cookies
            .iter()
            .find(|c| c.starts_with("academy_session="))
            .unwrap();
        assert!(cookies.iter().any(|c| c.starts_with("academy_oauth_state=;")));

        let user_id = repo.user_by_email("anna@example.com").unwrap().user_id;

        let api = Router::new()
            .route(
                "/whoami",
                get(|identity: RequestIdentity| async move {
                    identity.user_id().map(|id| id.to_string()).unwrap_or_default()
                }),
            )
            .layer(middleware::from_fn_with_state(
                IdentityMiddlewareState::new(repo.clone(), config.clone()),
                resolve_identity::<MemoryRepo>,
            ));

        let response = api
            .oneshot(
                Request::get("/whoami")
                    .header(header::COOKIE, cookie_pair(session))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, user_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_status_for_anonymous_caller() {
        let app = identity_router_generic(
            MemoryRepo::default(),
            StaticProvider::verified("anna@example.com"),
            Arc::new(IdentityConfig::development()),
        );

        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["authenticated"], false);
    }
}
