//! Unit tests for the academy crate

#[cfg(test)]
mod fakes {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard};
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use kernel::id::{CourseId, LessonFileId, LessonId, PromoCodeId, UserId};

    use crate::domain::entity::{
        activity::{Activity, ActivityKind},
        course::Course,
        learner::Learner,
        lesson::{Lesson, LessonFile, LessonVideo},
        order::{Order, OrderStatus},
        progress::{LessonProgress, ProgressRecorded},
        promo_code::PromoCode,
    };
    use crate::domain::payment::{CheckoutRequest, CheckoutSession, PaymentEvent, PaymentGateway};
    use crate::domain::repository::{
        ActivityRepository, CourseRepository, FulfillmentOutcome, LearnerRepository,
        OrderRepository, ProgressRepository, PromoCodeRepository,
    };
    use crate::domain::storage::{BlobObject, BlobStore};
    use crate::domain::value_object::{
        learner_role::LearnerRole, localized_text::LocalizedText, money::Money,
    };
    use crate::error::{AcademyError, AcademyResult};
    use crate::infra::stripe::{parse_event, verify_signature};

    pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
    pub const MEDIA_ID: &str = "vid-1";

    #[derive(Default)]
    pub struct StoreState {
        pub users: HashMap<UserId, (String, LearnerRole)>,
        /// Mirrors the `(user_id, course_id)` primary key
        pub user_courses: Vec<(UserId, CourseId)>,
        pub favorites: Vec<(UserId, CourseId)>,
        pub courses: HashMap<CourseId, Course>,
        pub orders: HashMap<String, Order>,
        pub promos: HashMap<PromoCodeId, PromoCode>,
        pub progress: HashMap<(UserId, CourseId, LessonId), LessonProgress>,
        pub activity: Vec<Activity>,
        pub fail_reads: bool,
    }

    #[derive(Clone, Default)]
    pub struct MemoryStore {
        state: Arc<Mutex<StoreState>>,
    }

    impl MemoryStore {
        pub fn lock(&self) -> MutexGuard<'_, StoreState> {
            self.state.lock().unwrap()
        }

        pub fn add_user(&self, role: LearnerRole) -> UserId {
            let user_id = UserId::new();
            self.lock()
                .users
                .insert(user_id, (format!("{user_id}@example.com"), role));
            user_id
        }

        pub fn add_course(&self, course: Course) -> CourseId {
            let course_id = course.course_id;
            self.lock().courses.insert(course_id, course);
            course_id
        }

        pub fn add_promo(&self, promo: PromoCode) -> PromoCodeId {
            let promo_code_id = promo.promo_code_id;
            self.lock().promos.insert(promo_code_id, promo);
            promo_code_id
        }

        pub fn grant(&self, user_id: UserId, course_id: CourseId) {
            self.lock().user_courses.push((user_id, course_id));
        }

        pub fn owned_count(&self, user_id: UserId, course_id: CourseId) -> usize {
            self.lock()
                .user_courses
                .iter()
                .filter(|entry| **entry == (user_id, course_id))
                .count()
        }

        pub fn order(&self, session_id: &str) -> Option<Order> {
            self.lock().orders.get(session_id).cloned()
        }

        pub fn completed_orders(&self, session_id: &str) -> usize {
            self.lock()
                .orders
                .values()
                .filter(|o| {
                    o.payment_session_id == session_id && o.status == OrderStatus::Completed
                })
                .count()
        }

        pub fn promo(&self, promo_code_id: PromoCodeId) -> PromoCode {
            self.lock().promos[&promo_code_id].clone()
        }

        pub fn activity_count(&self, kind: ActivityKind) -> usize {
            self.lock()
                .activity
                .iter()
                .filter(|a| a.kind == kind)
                .count()
        }

        fn check_reads(&self) -> AcademyResult<()> {
            if self.lock().fail_reads {
                return Err(AcademyError::Internal("store offline".into()));
            }
            Ok(())
        }
    }

    impl LearnerRepository for MemoryStore {
        async fn find_by_id(&self, user_id: &UserId) -> AcademyResult<Option<Learner>> {
            self.check_reads()?;
            let state = self.lock();
            Ok(state.users.get(user_id).map(|(email, role)| Learner {
                user_id: *user_id,
                email: email.clone(),
                name: None,
                role: *role,
                courses_owned: state
                    .user_courses
                    .iter()
                    .filter(|(u, _)| u == user_id)
                    .map(|(_, c)| *c)
                    .collect(),
                favorites: state
                    .favorites
                    .iter()
                    .filter(|(u, _)| u == user_id)
                    .map(|(_, c)| *c)
                    .collect(),
            }))
        }

        async fn toggle_favorite(
            &self,
            user_id: &UserId,
            course_id: &CourseId,
        ) -> AcademyResult<bool> {
            let mut state = self.lock();
            let entry = (*user_id, *course_id);
            if let Some(pos) = state.favorites.iter().position(|f| *f == entry) {
                state.favorites.remove(pos);
                Ok(false)
            } else {
                state.favorites.push(entry);
                Ok(true)
            }
        }
    }

    impl CourseRepository for MemoryStore {
        async fn list_published(&self) -> AcademyResult<Vec<Course>> {
            Ok(self
                .lock()
                .courses
                .values()
                .filter(|c| c.published)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, course_id: &CourseId) -> AcademyResult<Option<Course>> {
            self.check_reads()?;
            Ok(self.lock().courses.get(course_id).cloned())
        }

        async fn find_lessons_by_media(
            &self,
            media_id: &str,
        ) -> AcademyResult<Vec<(CourseId, LessonId)>> {
            let mut found: Vec<_> = self
                .lock()
                .courses
                .values()
                .flat_map(|course| {
                    course
                        .lessons
                        .iter()
                        .filter(|l| matches!(&l.video, LessonVideo::Cdn { video_id } if video_id == media_id))
                        .map(|l| (course.course_id, l.lesson_id))
                })
                .collect();
            found.sort();
            Ok(found)
        }

        async fn find_file(
            &self,
            file_id: &LessonFileId,
        ) -> AcademyResult<Option<(CourseId, LessonFile)>> {
            Ok(self.lock().courses.values().find_map(|course| {
                course
                    .lessons
                    .iter()
                    .find_map(|l| l.find_file(file_id))
                    .map(|f| (course.course_id, f.clone()))
            }))
        }

        async fn update_pricing(&self, course: &Course) -> AcademyResult<()> {
            self.lock().courses.insert(course.course_id, course.clone());
            Ok(())
        }
    }

    impl OrderRepository for MemoryStore {
        async fn find_by_session(&self, payment_session_id: &str) -> AcademyResult<Option<Order>> {
            Ok(self.lock().orders.get(payment_session_id).cloned())
        }

        async fn create_pending(&self, order: &Order) -> AcademyResult<()> {
            self.lock()
                .orders
                .entry(order.payment_session_id.clone())
                .or_insert_with(|| order.clone());
            Ok(())
        }

        /// Whole fulfillment under one lock, like the single transaction
        async fn fulfill(&self, order: &Order) -> AcademyResult<FulfillmentOutcome> {
            let mut state = self.lock();

            if state
                .orders
                .get(&order.payment_session_id)
                .is_some_and(|o| o.status.is_final())
            {
                return Ok(FulfillmentOutcome::Duplicate);
            }
            state
                .orders
                .insert(order.payment_session_id.clone(), order.clone());

            if let Some(promo) = order
                .promo_code_id
                .and_then(|id| state.promos.get_mut(&id))
            {
                if promo.used_by.insert(order.user_id) {
                    promo.used_count += 1;
                }
            }

            let entry = (order.user_id, order.course_id);
            let newly_granted = !state.user_courses.contains(&entry);
            if newly_granted {
                state.user_courses.push(entry);
                state
                    .activity
                    .push(Activity::course_purchased(order.user_id, order.course_id));
            }

            Ok(FulfillmentOutcome::Fulfilled { newly_granted })
        }

        async fn record_failed(&self, order: &Order) -> AcademyResult<bool> {
            let mut state = self.lock();
            match state.orders.get_mut(&order.payment_session_id) {
                Some(existing) if existing.status.is_final() => Ok(false),
                Some(existing) => {
                    existing.status = OrderStatus::Failed;
                    Ok(true)
                }
                None => {
                    state
                        .orders
                        .insert(order.payment_session_id.clone(), order.clone());
                    Ok(true)
                }
            }
        }
    }

    impl PromoCodeRepository for MemoryStore {
        async fn find_by_id(&self, promo_code_id: &PromoCodeId) -> AcademyResult<Option<PromoCode>> {
            Ok(self.lock().promos.get(promo_code_id).cloned())
        }

        async fn find_by_code(&self, code: &str) -> AcademyResult<Option<PromoCode>> {
            Ok(self
                .lock()
                .promos
                .values()
                .find(|p| p.code == code)
                .cloned())
        }

        async fn create(&self, promo: &PromoCode) -> AcademyResult<()> {
            let mut state = self.lock();
            if state.promos.values().any(|p| p.code == promo.code) {
                return Err(AcademyError::PromoCodeTaken);
            }
            state.promos.insert(promo.promo_code_id, promo.clone());
            Ok(())
        }
    }

    impl ProgressRepository for MemoryStore {
        async fn record(
            &self,
            user_id: &UserId,
            course_id: &CourseId,
            lesson_id: &LessonId,
            watch_time_secs: i32,
            completed: bool,
        ) -> AcademyResult<ProgressRecorded> {
            let mut state = self.lock();
            let progress = state
                .progress
                .entry((*user_id, *course_id, *lesson_id))
                .or_insert_with(|| LessonProgress::new(*user_id, *course_id, *lesson_id));
            let newly_completed = progress.apply(watch_time_secs, completed, Utc::now());

            Ok(ProgressRecorded {
                progress: progress.clone(),
                newly_completed,
            })
        }

        async fn list_for_course(
            &self,
            user_id: &UserId,
            course_id: &CourseId,
        ) -> AcademyResult<Vec<LessonProgress>> {
            Ok(self
                .lock()
                .progress
                .values()
                .filter(|p| &p.user_id == user_id && &p.course_id == course_id)
                .cloned()
                .collect())
        }
    }

    impl ActivityRepository for MemoryStore {
        async fn record(&self, activity: &Activity) -> AcademyResult<()> {
            self.lock().activity.push(activity.clone());
            Ok(())
        }
    }

    /// Records checkout requests; webhooks go through the real Stripe
    /// verification and decoding
    #[derive(Clone, Default)]
    pub struct FakeGateway {
        pub requests: Arc<Mutex<Vec<CheckoutRequest>>>,
        pub unavailable: bool,
    }

    impl FakeGateway {
        pub fn last_request(&self) -> CheckoutRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl PaymentGateway for FakeGateway {
        async fn create_checkout_session(
            &self,
            request: &CheckoutRequest,
        ) -> AcademyResult<CheckoutSession> {
            if self.unavailable {
                return Err(AcademyError::PaymentGateway("connection refused".into()));
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            let n = requests.len();
            Ok(CheckoutSession {
                session_id: format!("cs_test_{n}"),
                url: format!("https://checkout.example.com/pay/cs_test_{n}"),
            })
        }

        fn parse_webhook(
            &self,
            payload: &[u8],
            signature_header: Option<&str>,
        ) -> AcademyResult<PaymentEvent> {
            let header = signature_header
                .ok_or_else(|| AcademyError::InvalidSignature("missing signature header".into()))?;
            verify_signature(
                payload,
                header,
                WEBHOOK_SECRET,
                Duration::from_secs(300),
                Utc::now().timestamp(),
            )?;
            parse_event(payload)
        }
    }

    #[derive(Clone, Default)]
    pub struct MemoryBlobs {
        pub blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemoryBlobs {
        pub fn put(&self, key: &str, bytes: &[u8]) {
            self.blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
        }
    }

    impl BlobStore for MemoryBlobs {
        async fn open(&self, storage_key: &str) -> AcademyResult<BlobObject> {
            let bytes = self
                .blobs
                .lock()
                .unwrap()
                .get(storage_key)
                .cloned()
                .ok_or(AcademyError::FileNotFound)?;
            Ok(BlobObject {
                size: bytes.len() as u64,
                reader: Box::pin(std::io::Cursor::new(bytes)),
            })
        }
    }

    // ------------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------------

    pub fn lesson(course_id: CourseId, order: i32, video: LessonVideo) -> Lesson {
        Lesson {
            lesson_id: LessonId::new(),
            course_id,
            title: LocalizedText::new(format!("Урок {order}"), format!("Lesson {order}")),
            description: LocalizedText::new("Описание", "Description"),
            video,
            duration_secs: Some(600),
            order,
            files: Vec::new(),
        }
    }

    /// A published course with three lessons: a CDN video, a legacy video
    /// with one attachment, and a text-only lesson
    pub fn course(price: i64, created_at: DateTime<Utc>) -> Course {
        let course_id = CourseId::new();
        let first = lesson(
            course_id,
            1,
            LessonVideo::Cdn {
                video_id: MEDIA_ID.to_string(),
            },
        );
        let mut second = lesson(
            course_id,
            2,
            LessonVideo::Legacy {
                url: "https://videos.example.com/2.mp4".into(),
            },
        );
        second.files.push(LessonFile {
            file_id: LessonFileId::new(),
            lesson_id: second.lesson_id,
            file_name: "Рабочая тетрадь.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 8,
            storage_key: format!("lessons/{}/workbook.pdf", second.lesson_id),
        });
        let third = lesson(course_id, 3, LessonVideo::None);

        Course {
            course_id,
            title: LocalizedText::new("Курс", "Course"),
            description: LocalizedText::new("О курсе", "About"),
            price: Money::from_minor(price),
            original_price: Money::from_minor(price),
            discount: 0,
            published: true,
            featured: false,
            is_new_course: false,
            new_until: None,
            lessons: vec![third, first, second],
            created_at,
            updated_at: created_at,
        }
    }

    pub fn promo(percent: u8, expires_at: DateTime<Utc>, course_id: Option<CourseId>) -> PromoCode {
        PromoCode {
            promo_code_id: PromoCodeId::new(),
            code: format!("SAVE{percent}"),
            discount_percent: percent,
            expires_at,
            course_id,
            used_count: 0,
            max_uses: None,
            used_by: Default::default(),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn completed_event(
        session_id: &str,
        course_id: CourseId,
        user_id: UserId,
        amount: i64,
        promo_code_id: Option<PromoCodeId>,
    ) -> Vec<u8> {
        let mut metadata = serde_json::json!({
            "courseId": course_id.to_string(),
            "userId": user_id.to_string(),
        });
        if let Some(promo) = promo_code_id {
            metadata["promoCodeId"] = serde_json::Value::String(promo.to_string());
        }
        serde_json::json!({
            "id": format!("evt_{session_id}"),
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": session_id,
                "amount_total": amount,
                "currency": "usd",
                "payment_status": "paid",
                "metadata": metadata,
            }}
        })
        .to_string()
        .into_bytes()
    }

    pub fn expired_event(session_id: &str, course_id: CourseId, user_id: UserId) -> Vec<u8> {
        serde_json::json!({
            "id": format!("evt_exp_{session_id}"),
            "type": "checkout.session.expired",
            "data": { "object": {
                "id": session_id,
                "payment_status": "unpaid",
                "metadata": {
                    "courseId": course_id.to_string(),
                    "userId": user_id.to_string(),
                },
            }}
        })
        .to_string()
        .into_bytes()
    }

    pub fn sign(payload: &[u8]) -> String {
        crate::infra::stripe::signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), payload)
    }
}

#[cfg(test)]
mod access_tests {
    use std::sync::Arc;

    use chrono::Utc;
    use kernel::id::{CourseId, LessonId, UserId};
    use kernel::identity::RequestIdentity;

    use super::fakes::{MemoryStore, course};
    use crate::application::CheckAccessUseCase;
    use crate::domain::value_object::{access::AccessReason, learner_role::LearnerRole};
    use crate::error::AcademyError;

    fn use_case(store: &MemoryStore) -> CheckAccessUseCase<MemoryStore, MemoryStore> {
        CheckAccessUseCase::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_anonymous_is_not_authenticated() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));

        let decision = use_case(&store)
            .check_course(RequestIdentity::anonymous(), &course_id.to_string())
            .await;

        assert!(!decision.has_access);
        assert_eq!(decision.reason, AccessReason::NotAuthenticated);
        assert!(decision.course_title.is_none());
    }

    #[tokio::test]
    async fn test_access_iff_admin_or_owner() {
        let store = MemoryStore::default();
        let owned = store.add_course(course(5000, Utc::now()));
        let not_owned = store.add_course(course(5000, Utc::now()));
        let admin = store.add_user(LearnerRole::Admin);
        let owner = store.add_user(LearnerRole::User);
        let stranger = store.add_user(LearnerRole::User);
        store.grant(owner, owned);

        let cases = [
            (admin, owned, true, AccessReason::AdminAccess),
            (admin, not_owned, true, AccessReason::AdminAccess),
            (owner, owned, true, AccessReason::Purchased),
            (owner, not_owned, false, AccessReason::NotPurchased),
            (stranger, owned, false, AccessReason::NotPurchased),
            (stranger, not_owned, false, AccessReason::NotPurchased),
        ];

        for (user_id, course_id, expected, reason) in cases {
            let decision = use_case(&store)
                .check_course(
                    RequestIdentity::authenticated(user_id),
                    &course_id.to_string(),
                )
                .await;
            assert_eq!(decision.has_access, expected, "{reason:?}");
            assert_eq!(decision.reason, reason);
        }
    }

    #[tokio::test]
    async fn test_denial_carries_course_context() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let decision = use_case(&store)
            .check_course(RequestIdentity::authenticated(user_id), &course_id.to_string())
            .await;

        assert_eq!(decision.reason.code(), "not_purchased");
        assert_eq!(decision.course_price.unwrap().minor(), 5000);
        assert_eq!(decision.course_title.unwrap().en, "Course");
        assert_eq!(decision.user_role, Some(LearnerRole::User));
    }

    #[tokio::test]
    async fn test_unknown_user_course_and_malformed_ids() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let ghost = use_case(&store)
            .check_course(RequestIdentity::authenticated(UserId::new()), &course_id.to_string())
            .await;
        assert_eq!(ghost.reason, AccessReason::UserNotFound);

        let missing = use_case(&store)
            .check_course(
                RequestIdentity::authenticated(user_id),
                &CourseId::new().to_string(),
            )
            .await;
        assert_eq!(missing.reason, AccessReason::CourseNotFound);

        let malformed = use_case(&store)
            .check_course(RequestIdentity::authenticated(user_id), "not-an-id")
            .await;
        assert_eq!(malformed.reason, AccessReason::CourseNotFound);
    }

    #[tokio::test]
    async fn test_lesson_outside_course_is_not_found() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let admin = store.add_user(LearnerRole::Admin);

        let decision = use_case(&store)
            .check_lesson(
                RequestIdentity::authenticated(admin),
                &course_id.to_string(),
                &LessonId::new().to_string(),
            )
            .await;

        assert!(!decision.has_access);
        assert_eq!(decision.reason, AccessReason::CourseNotFound);
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let admin = store.add_user(LearnerRole::Admin);
        store.lock().fail_reads = true;

        let decision = use_case(&store)
            .check_course(RequestIdentity::authenticated(admin), &course_id.to_string())
            .await;
        assert!(!decision.has_access);
        assert_eq!(decision.reason, AccessReason::CheckFailed);

        let err = use_case(&store)
            .require_course(RequestIdentity::authenticated(admin), course_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::AccessCheckFailed));
        assert_eq!(err.status_code().as_u16(), 503);
    }

    #[tokio::test]
    async fn test_require_maps_denials_to_errors() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let anonymous = use_case(&store)
            .require_course(RequestIdentity::anonymous(), course_id)
            .await
            .unwrap_err();
        assert!(matches!(anonymous, AcademyError::NotAuthenticated));

        let denied = use_case(&store)
            .require_course(RequestIdentity::authenticated(user_id), course_id)
            .await
            .unwrap_err();
        assert!(matches!(denied, AcademyError::AccessDenied));
        assert_eq!(denied.code(), "not_purchased");
    }
}

#[cfg(test)]
mod fulfillment_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use kernel::identity::RequestIdentity;

    use super::fakes::{
        FakeGateway, MemoryStore, completed_event, course, expired_event, promo, sign,
    };
    use crate::application::{
        AcademyConfig, CheckAccessUseCase, FulfillPaymentUseCase, WebhookOutcome,
    };
    use crate::domain::entity::{activity::ActivityKind, order::OrderStatus};
    use crate::domain::value_object::{access::AccessReason, learner_role::LearnerRole};
    use crate::error::AcademyError;

    type Fulfill = FulfillPaymentUseCase<MemoryStore, MemoryStore, MemoryStore, FakeGateway>;

    fn use_case(store: &MemoryStore) -> Fulfill {
        FulfillPaymentUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FakeGateway::default()),
            Arc::new(AcademyConfig::development()),
        )
    }

    #[tokio::test]
    async fn test_completed_checkout_grants_access() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let access = CheckAccessUseCase::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let identity = RequestIdentity::authenticated(user_id);

        let before = access.check_course(identity, &course_id.to_string()).await;
        assert!(!before.has_access);
        assert_eq!(before.reason, AccessReason::NotPurchased);

        let payload = completed_event("cs_1", course_id, user_id, 5000, None);
        let outcome = use_case(&store)
            .execute(&payload, Some(&sign(&payload)))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Fulfilled);

        let after = access.check_course(identity, &course_id.to_string()).await;
        assert!(after.has_access);
        assert_eq!(after.reason, AccessReason::Purchased);

        let order = store.order("cs_1").unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.amount.minor(), 5000);
        assert!(order.completed_at.is_some());
        assert_eq!(store.activity_count(ActivityKind::CoursePurchased), 1);
    }

    #[tokio::test]
    async fn test_redelivery_is_a_no_op() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let payload = completed_event("cs_1", course_id, user_id, 5000, None);
        let header = sign(&payload);
        let use_case = use_case(&store);

        let first = use_case.execute(&payload, Some(&header)).await.unwrap();
        let second = use_case.execute(&payload, Some(&header)).await.unwrap();

        assert_eq!(first, WebhookOutcome::Fulfilled);
        assert_eq!(second, WebhookOutcome::Duplicate);
        assert_eq!(store.owned_count(user_id, course_id), 1);
        assert_eq!(store.completed_orders("cs_1"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_deliveries_grant_once() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let payload = completed_event("cs_race", course_id, user_id, 5000, None);
        let header = sign(&payload);
        let use_case = use_case(&store);

        let (a, b) = tokio::join!(
            use_case.execute(&payload, Some(&header)),
            use_case.execute(&payload, Some(&header)),
        );

        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == WebhookOutcome::Duplicate);
        assert_eq!(
            outcomes,
            vec![WebhookOutcome::Fulfilled, WebhookOutcome::Duplicate]
        );
        assert_eq!(store.owned_count(user_id, course_id), 1);
        assert_eq!(store.completed_orders("cs_race"), 1);
        assert_eq!(store.activity_count(ActivityKind::CoursePurchased), 1);
    }

    #[tokio::test]
    async fn test_second_session_for_owned_course_records_order_only() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let use_case = use_case(&store);

        for session in ["cs_a", "cs_b"] {
            let payload = completed_event(session, course_id, user_id, 5000, None);
            let outcome = use_case
                .execute(&payload, Some(&sign(&payload)))
                .await
                .unwrap();
            assert_eq!(outcome, WebhookOutcome::Fulfilled);
        }

        assert_eq!(store.owned_count(user_id, course_id), 1);
        assert_eq!(store.completed_orders("cs_a"), 1);
        assert_eq!(store.completed_orders("cs_b"), 1);
    }

    #[tokio::test]
    async fn test_promo_redemption_recorded_on_fulfillment() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let promo_id = store.add_promo(promo(20, Utc::now() + Duration::days(1), None));

        let payload = completed_event("cs_promo", course_id, user_id, 800, Some(promo_id));
        use_case(&store)
            .execute(&payload, Some(&sign(&payload)))
            .await
            .unwrap();

        let order = store.order("cs_promo").unwrap();
        assert_eq!(order.promo_code_id, Some(promo_id));
        assert_eq!(order.discount_amount.minor(), 200);

        let promo = store.promo(promo_id);
        assert_eq!(promo.used_count, 1);
        assert!(promo.used_by.contains(&user_id));
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected_before_processing() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let payload = completed_event("cs_1", course_id, user_id, 5000, None);

        let unsigned = use_case(&store).execute(&payload, None).await.unwrap_err();
        assert!(matches!(unsigned, AcademyError::InvalidSignature(_)));

        let forged = crate::infra::stripe::signature_header(
            "whsec_attacker",
            Utc::now().timestamp(),
            &payload,
        );
        let err = use_case(&store)
            .execute(&payload, Some(&forged))
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::InvalidSignature(_)));
        assert_eq!(err.status_code().as_u16(), 400);
        assert_eq!(store.owned_count(user_id, course_id), 0);
    }

    #[tokio::test]
    async fn test_missing_metadata_is_permanent() {
        let store = MemoryStore::default();
        let payload = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "amount_total": 5000,
                "currency": "usd",
                "payment_status": "paid",
                "metadata": {}
            }}
        })
        .to_string()
        .into_bytes();

        let err = use_case(&store)
            .execute(&payload, Some(&sign(&payload)))
            .await
            .unwrap_err();

        assert!(matches!(err, AcademyError::ValidationFailed(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unknown_user_or_course_is_permanent() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let ghost_user = completed_event("cs_1", course_id, kernel::id::UserId::new(), 5000, None);
        let err = use_case(&store)
            .execute(&ghost_user, Some(&sign(&ghost_user)))
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::UserNotFound));
        assert!(!err.is_transient());

        let ghost_course =
            completed_event("cs_2", kernel::id::CourseId::new(), user_id, 5000, None);
        let err = use_case(&store)
            .execute(&ghost_course, Some(&sign(&ghost_course)))
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::CourseNotFound));
        assert!(store.order("cs_2").is_none());
    }

    #[tokio::test]
    async fn test_expired_session_records_failed_order() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let use_case = use_case(&store);

        let expired = expired_event("cs_exp", course_id, user_id);
        let outcome = use_case
            .execute(&expired, Some(&sign(&expired)))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::FailedRecorded);
        assert_eq!(store.order("cs_exp").unwrap().status, OrderStatus::Failed);

        // A late completion for a failed session does not grant access
        let completed = completed_event("cs_exp", course_id, user_id, 5000, None);
        let outcome = use_case
            .execute(&completed, Some(&sign(&completed)))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Duplicate);
        assert_eq!(store.owned_count(user_id, course_id), 0);
    }

    #[tokio::test]
    async fn test_failure_after_completion_keeps_order_completed() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let use_case = use_case(&store);

        let completed = completed_event("cs_1", course_id, user_id, 5000, None);
        use_case
            .execute(&completed, Some(&sign(&completed)))
            .await
            .unwrap();

        let expired = expired_event("cs_1", course_id, user_id);
        let outcome = use_case
            .execute(&expired, Some(&sign(&expired)))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Duplicate);
        assert_eq!(store.order("cs_1").unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_unrelated_event_is_ignored() {
        let store = MemoryStore::default();
        let payload = br#"{"id":"evt_9","type":"invoice.paid","data":{"object":{}}}"#;

        let outcome = use_case(&store)
            .execute(payload, Some(&sign(payload)))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
    }
}

#[cfg(test)]
mod checkout_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use kernel::id::CourseId;
    use kernel::identity::RequestIdentity;

    use super::fakes::{FakeGateway, MemoryStore, course, promo};
    use crate::application::{
        AcademyConfig, CheckoutInput, CheckoutOutput, InitiateCheckoutUseCase,
    };
    use crate::domain::entity::order::OrderStatus;
    use crate::domain::value_object::{learner_role::LearnerRole, localized_text::Locale};
    use crate::error::{AcademyError, AcademyResult};

    async fn checkout(
        store: &MemoryStore,
        gateway: &FakeGateway,
        identity: RequestIdentity,
        course_id: CourseId,
        promo_code_id: Option<String>,
    ) -> AcademyResult<CheckoutOutput> {
        InitiateCheckoutUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            Arc::new(AcademyConfig::development()),
        )
        .execute(
            identity,
            CheckoutInput {
                course_id: course_id.to_string(),
                promo_code_id,
                locale: Locale::En,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_promo_discount_applied() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let promo_id = store.add_promo(promo(20, Utc::now() + Duration::days(1), None));

        let output = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(user_id),
            course_id,
            Some(promo_id.to_string()),
        )
        .await
        .unwrap();

        assert_eq!(output.amount.minor(), 800);
        assert_eq!(output.discount_percent, Some(20));

        let request = gateway.last_request();
        assert_eq!(request.amount.minor(), 800);
        assert_eq!(request.product_name, "Course");
        assert_eq!(request.metadata.user_id, user_id);
        assert_eq!(request.metadata.course_id, course_id);
        assert_eq!(request.metadata.promo_code_id, Some(promo_id));
        assert!(request.success_url.contains(&course_id.to_string()));

        let pending = store.order(&output.session_id).unwrap();
        assert_eq!(pending.status, OrderStatus::Pending);
        assert_eq!(pending.discount_amount.minor(), 200);
    }

    #[tokio::test]
    async fn test_inapplicable_promos_charge_full_price() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let expired = promo(20, Utc::now() - Duration::minutes(1), None);
        let other_course = promo(20, Utc::now() + Duration::days(1), Some(CourseId::new()));
        let mut exhausted = promo(20, Utc::now() + Duration::days(1), None);
        exhausted.max_uses = Some(1);
        exhausted.used_count = 1;
        let mut inactive = promo(20, Utc::now() + Duration::days(1), None);
        inactive.active = false;

        for promo in [expired, other_course, exhausted, inactive] {
            let gateway = FakeGateway::default();
            let promo_id = store.add_promo(promo);

            let output = checkout(
                &store,
                &gateway,
                RequestIdentity::authenticated(user_id),
                course_id,
                Some(promo_id.to_string()),
            )
            .await
            .unwrap();

            assert_eq!(output.amount.minor(), 1000);
            assert_eq!(output.discount_percent, None);
            assert_eq!(gateway.last_request().metadata.promo_code_id, None);
        }
    }

    #[tokio::test]
    async fn test_malformed_promo_id_is_ignored() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let output = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(user_id),
            course_id,
            Some("SPRING".into()),
        )
        .await
        .unwrap();

        assert_eq!(output.amount.minor(), 1000);
    }

    #[tokio::test]
    async fn test_checkout_rejections() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let owner = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);

        let anonymous = checkout(&store, &gateway, RequestIdentity::anonymous(), course_id, None)
            .await
            .unwrap_err();
        assert!(matches!(anonymous, AcademyError::NotAuthenticated));

        let owned = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(owner),
            course_id,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(owned, AcademyError::AlreadyOwned));
        assert_eq!(owned.code(), "already_owned");

        let missing = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(owner),
            CourseId::new(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, AcademyError::CourseNotFound));

        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unpublished_course_hidden_from_learners() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let mut draft = course(1000, Utc::now());
        draft.published = false;
        let course_id = store.add_course(draft);
        let user_id = store.add_user(LearnerRole::User);

        let err = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(user_id),
            course_id,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AcademyError::CourseNotFound));
    }

    #[tokio::test]
    async fn test_free_course_cannot_be_checked_out() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let course_id = store.add_course(course(0, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let err = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(user_id),
            course_id,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AcademyError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_transient() {
        let store = MemoryStore::default();
        let gateway = FakeGateway {
            unavailable: true,
            ..Default::default()
        };
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);

        let err = checkout(
            &store,
            &gateway,
            RequestIdentity::authenticated(user_id),
            course_id,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AcademyError::PaymentGateway(_)));
        assert!(err.is_transient());
        assert_eq!(err.status_code().as_u16(), 502);
        assert!(store.lock().orders.is_empty());
    }
}

#[cfg(test)]
mod promo_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use kernel::identity::RequestIdentity;

    use super::fakes::{MemoryStore, course, promo};
    use crate::application::{CreatePromoInput, ManageCourseUseCase, ValidatePromoUseCase};
    use crate::domain::entity::promo_code::PromoRejection;
    use crate::domain::value_object::learner_role::LearnerRole;
    use crate::error::AcademyError;

    fn validator(store: &MemoryStore) -> ValidatePromoUseCase<MemoryStore, MemoryStore, MemoryStore> {
        ValidatePromoUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_valid_code_quotes_discounted_price() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let promo_id = store.add_promo(promo(20, Utc::now() + Duration::days(1), None));

        let validation = validator(&store)
            .execute(
                RequestIdentity::authenticated(user_id),
                " save20 ",
                &course_id.to_string(),
            )
            .await
            .unwrap();

        assert!(validation.valid);
        assert_eq!(validation.promo_code_id, Some(promo_id));
        assert_eq!(validation.final_price.minor(), 800);
        assert_eq!(validation.original_price.minor(), 1000);
        assert_eq!(validation.reason, None);
    }

    #[tokio::test]
    async fn test_rejections_report_reason_and_full_price() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let mut used = promo(30, Utc::now() + Duration::days(1), None);
        used.used_by.insert(user_id);
        store.add_promo(used);

        let unknown = validator(&store)
            .execute(
                RequestIdentity::authenticated(user_id),
                "NOPE",
                &course_id.to_string(),
            )
            .await
            .unwrap();
        assert!(!unknown.valid);
        assert_eq!(unknown.reason, Some(PromoRejection::NotFound));
        assert_eq!(unknown.final_price.minor(), 1000);

        let reused = validator(&store)
            .execute(
                RequestIdentity::authenticated(user_id),
                "SAVE30",
                &course_id.to_string(),
            )
            .await
            .unwrap();
        assert_eq!(reused.reason, Some(PromoRejection::AlreadyUsed));
    }

    #[tokio::test]
    async fn test_validation_requires_identity() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));

        let err = validator(&store)
            .execute(RequestIdentity::anonymous(), "SAVE20", &course_id.to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AcademyError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_admin_creates_promo_and_duplicates_conflict() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let admin = store.add_user(LearnerRole::Admin);
        let manage = ManageCourseUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        let input = || CreatePromoInput {
            code: "launch".into(),
            discount_percent: 15,
            expires_at: Utc::now() + Duration::days(30),
            course_id: Some(course_id.to_string()),
            max_uses: Some(100),
        };

        let created = manage
            .create_promo(RequestIdentity::authenticated(admin), input())
            .await
            .unwrap();
        assert_eq!(created.code, "LAUNCH");
        assert_eq!(created.course_id, Some(course_id));

        let err = manage
            .create_promo(RequestIdentity::authenticated(admin), input())
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::PromoCodeTaken));
        assert_eq!(err.status_code().as_u16(), 409);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_promo() {
        let store = MemoryStore::default();
        let user_id = store.add_user(LearnerRole::User);
        let manage = ManageCourseUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );

        let err = manage
            .create_promo(
                RequestIdentity::authenticated(user_id),
                CreatePromoInput {
                    code: "FREE".into(),
                    discount_percent: 100,
                    expires_at: Utc::now() + Duration::days(1),
                    course_id: None,
                    max_uses: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AcademyError::AccessDenied));
        assert!(store.lock().promos.is_empty());
    }
}

#[cfg(test)]
mod catalog_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use kernel::identity::RequestIdentity;

    use super::fakes::{MemoryStore, course, lesson};
    use crate::application::{CatalogUseCase, ManageCourseUseCase};
    use crate::domain::entity::lesson::LessonVideo;
    use crate::domain::value_object::learner_role::LearnerRole;
    use crate::error::AcademyError;

    fn catalog(store: &MemoryStore) -> CatalogUseCase<MemoryStore, MemoryStore> {
        CatalogUseCase::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_listing_puts_featured_first_then_newest() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let old = store.add_course(course(1000, now - Duration::days(10)));
        let new = store.add_course(course(1000, now));
        let mut featured = course(1000, now - Duration::days(30));
        featured.featured = true;
        let featured = store.add_course(featured);
        let mut hidden = course(1000, now);
        hidden.published = false;
        store.add_course(hidden);

        let ids: Vec<_> = catalog(&store)
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.course_id)
            .collect();

        assert_eq!(ids, vec![featured, new, old]);
    }

    #[tokio::test]
    async fn test_detail_sorts_lessons_and_hides_drafts() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let mut draft = course(1000, Utc::now());
        draft.published = false;
        let draft_id = store.add_course(draft);

        let detail = catalog(&store).detail(&course_id.to_string()).await.unwrap();
        let orders: Vec<i32> = detail.lessons.iter().map(|l| l.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);

        let err = catalog(&store)
            .detail(&draft_id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::CourseNotFound));
    }

    #[tokio::test]
    async fn test_lesson_view_links_neighbours() {
        let store = MemoryStore::default();
        let fixture = course(1000, Utc::now());
        let ordered: Vec<_> = fixture
            .ordered_lessons()
            .iter()
            .map(|l| l.lesson_id)
            .collect();
        let course_id = store.add_course(fixture);
        let owner = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);

        let view = catalog(&store)
            .lesson(
                RequestIdentity::authenticated(owner),
                &course_id.to_string(),
                &ordered[1].to_string(),
            )
            .await
            .unwrap();

        assert_eq!(view.lesson.lesson_id, ordered[1]);
        assert_eq!(view.previous_lesson_id, Some(ordered[0]));
        assert_eq!(view.next_lesson_id, Some(ordered[2]));
        assert_eq!(view.lesson.files.len(), 1);
    }

    #[tokio::test]
    async fn test_lesson_view_requires_entitlement() {
        let store = MemoryStore::default();
        let fixture = course(1000, Utc::now());
        let lesson_id = fixture.lessons[0].lesson_id;
        let course_id = store.add_course(fixture);
        let stranger = store.add_user(LearnerRole::User);

        let err = catalog(&store)
            .lesson(
                RequestIdentity::authenticated(stranger),
                &course_id.to_string(),
                &lesson_id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AcademyError::AccessDenied));
        assert_eq!(err.status_code().as_u16(), 403);
    }

    #[test]
    fn test_navigation_skips_lessons_sharing_an_order() {
        let mut fixture = course(1000, Utc::now());
        let course_id = fixture.course_id;
        fixture.lessons = vec![
            lesson(course_id, 10, LessonVideo::None),
            lesson(course_id, 20, LessonVideo::None),
            lesson(course_id, 20, LessonVideo::None),
            lesson(course_id, 40, LessonVideo::None),
        ];
        let ids: Vec<_> = fixture.lessons.iter().map(|l| l.lesson_id).collect();

        assert_eq!(fixture.adjacent_lessons(&ids[0]), (None, Some(ids[1])));
        let (previous, next) = fixture.adjacent_lessons(&ids[2]);
        assert_eq!(previous, Some(ids[0]));
        assert_eq!(next, Some(ids[3]));
        assert_eq!(fixture.adjacent_lessons(&ids[3]).1, None);
    }

    #[test]
    fn test_new_badge_expires_without_a_write() {
        let now = Utc::now();
        let mut fixture = course(1000, now);
        fixture.is_new_course = true;
        fixture.new_until = Some(now + Duration::hours(1));

        assert!(fixture.is_still_new(now));
        assert!(!fixture.is_still_new(now + Duration::hours(1)));
        assert!(!fixture.is_still_new(now + Duration::hours(2)));

        fixture.new_until = None;
        assert!(!fixture.is_still_new(now));

        fixture.new_until = Some(now + Duration::hours(1));
        fixture.is_new_course = false;
        assert!(!fixture.is_still_new(now));
    }

    #[tokio::test]
    async fn test_admin_pricing_recomputes_discount() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let admin = store.add_user(LearnerRole::Admin);
        let user = store.add_user(LearnerRole::User);
        let manage = ManageCourseUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );

        let denied = manage
            .update_pricing(
                RequestIdentity::authenticated(user),
                &course_id.to_string(),
                1,
                1000,
            )
            .await
            .unwrap_err();
        assert!(matches!(denied, AcademyError::AccessDenied));

        let updated = manage
            .update_pricing(
                RequestIdentity::authenticated(admin),
                &course_id.to_string(),
                2999,
                4999,
            )
            .await
            .unwrap();
        assert_eq!(updated.discount, 40);
        assert_eq!(store.lock().courses[&course_id].price.minor(), 2999);
    }
}

#[cfg(test)]
mod media_tests {
    use std::sync::Arc;

    use chrono::Utc;
    use kernel::id::LessonFileId;
    use kernel::identity::RequestIdentity;
    use tokio::io::AsyncReadExt;

    use super::fakes::{MEDIA_ID, MemoryBlobs, MemoryStore, course};
    use crate::application::{AcademyConfig, DownloadFileUseCase, MediaAccessUseCase};
    use crate::domain::services::sign_media_token;
    use crate::domain::value_object::learner_role::LearnerRole;
    use crate::error::AcademyError;

    fn media(store: &MemoryStore, config: AcademyConfig) -> MediaAccessUseCase<MemoryStore, MemoryStore> {
        MediaAccessUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(config),
        )
    }

    #[tokio::test]
    async fn test_owner_gets_signed_embed_url() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let owner = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);
        let config = AcademyConfig {
            media_token_secret: "cdn-secret".into(),
            media_library_id: "12345".into(),
            ..AcademyConfig::default()
        };

        let token = media(&store, config)
            .issue_token(RequestIdentity::authenticated(owner), MEDIA_ID)
            .await
            .unwrap();

        assert_eq!(token.expires_in, 7200);
        assert_eq!(token.media_id, MEDIA_ID);
        assert_eq!(
            token.token,
            sign_media_token("cdn-secret", MEDIA_ID, token.expires)
        );
        assert!(token.expires > Utc::now().timestamp());
        assert!(token.url.starts_with("https://iframe.mediadelivery.net/embed/12345/vid-1?"));
        assert!(token.url.contains(&format!("token={}", token.token)));
        assert!(token.url.contains(&format!("expires={}", token.expires)));
    }

    #[tokio::test]
    async fn test_media_token_denials() {
        let store = MemoryStore::default();
        store.add_course(course(1000, Utc::now()));
        let stranger = store.add_user(LearnerRole::User);

        let anonymous = media(&store, AcademyConfig::development())
            .issue_token(RequestIdentity::anonymous(), MEDIA_ID)
            .await
            .unwrap_err();
        assert!(matches!(anonymous, AcademyError::NotAuthenticated));

        let denied = media(&store, AcademyConfig::development())
            .issue_token(RequestIdentity::authenticated(stranger), MEDIA_ID)
            .await
            .unwrap_err();
        assert!(matches!(denied, AcademyError::AccessDenied));

        let unknown = media(&store, AcademyConfig::development())
            .issue_token(RequestIdentity::authenticated(stranger), "vid-unknown")
            .await
            .unwrap_err();
        assert!(matches!(unknown, AcademyError::MediaNotFound));
    }

    #[tokio::test]
    async fn test_shared_video_admits_owner_of_either_course() {
        let store = MemoryStore::default();
        let first = store.add_course(course(1000, Utc::now()));
        let second = store.add_course(course(2000, Utc::now()));
        let first_owner = store.add_user(LearnerRole::User);
        let second_owner = store.add_user(LearnerRole::User);
        let stranger = store.add_user(LearnerRole::User);
        store.grant(first_owner, first);
        store.grant(second_owner, second);

        // Whichever course sorts first, one of the owners only matches the
        // later lesson
        for owner in [first_owner, second_owner] {
            let token = media(&store, AcademyConfig::development())
                .issue_token(RequestIdentity::authenticated(owner), MEDIA_ID)
                .await
                .unwrap();
            assert_eq!(token.media_id, MEDIA_ID);
        }

        let denied = media(&store, AcademyConfig::development())
            .issue_token(RequestIdentity::authenticated(stranger), MEDIA_ID)
            .await
            .unwrap_err();
        assert!(matches!(denied, AcademyError::AccessDenied));
    }

    #[tokio::test]
    async fn test_entitled_download_streams_blob() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let fixture = course(1000, Utc::now());
        let file = fixture.lessons[2].files[0].clone();
        blobs.put(&file.storage_key, b"%PDF-1.7");
        store.add_course(fixture);
        let admin = store.add_user(LearnerRole::Admin);
        let stranger = store.add_user(LearnerRole::User);
        let downloads = DownloadFileUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(blobs),
        );

        let mut download = downloads
            .open(RequestIdentity::authenticated(admin), &file.file_id.to_string())
            .await
            .unwrap();
        let mut bytes = Vec::new();
        download.blob.reader.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        assert_eq!(download.blob.size, 8);
        assert_eq!(download.file.content_type, "application/pdf");

        let denied = downloads
            .open(RequestIdentity::authenticated(stranger), &file.file_id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(denied, AcademyError::AccessDenied));

        let missing = downloads
            .open(
                RequestIdentity::authenticated(admin),
                &LessonFileId::new().to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, AcademyError::FileNotFound));
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let store = MemoryStore::default();
        let fixture = course(1000, Utc::now());
        let file = fixture.lessons[2].files[0].clone();
        store.add_course(fixture);
        let admin = store.add_user(LearnerRole::Admin);
        let downloads = DownloadFileUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(MemoryBlobs::default()),
        );

        let err = downloads
            .open(RequestIdentity::authenticated(admin), &file.file_id.to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AcademyError::FileNotFound));
    }
}

#[cfg(test)]
mod progress_tests {
    use std::sync::Arc;

    use chrono::Utc;
    use kernel::identity::RequestIdentity;

    use super::fakes::{MemoryStore, course};
    use crate::application::{ToggleFavoriteUseCase, TrackProgressUseCase};
    use crate::domain::entity::activity::ActivityKind;
    use crate::domain::value_object::learner_role::LearnerRole;
    use crate::error::AcademyError;

    type Tracker = TrackProgressUseCase<MemoryStore, MemoryStore, MemoryStore, MemoryStore>;

    fn tracker(store: &MemoryStore) -> Tracker {
        TrackProgressUseCase::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_watch_time_grows_and_completion_sticks() {
        let store = MemoryStore::default();
        let fixture = course(1000, Utc::now());
        let lesson_id = fixture.lessons[0].lesson_id.to_string();
        let course_id = store.add_course(fixture);
        let owner = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);
        let identity = RequestIdentity::authenticated(owner);
        let course_id = course_id.to_string();

        let first = tracker(&store)
            .record(identity, &course_id, &lesson_id, 120, false)
            .await
            .unwrap();
        assert!(!first.newly_completed);

        let completed = tracker(&store)
            .record(identity, &course_id, &lesson_id, 60, true)
            .await
            .unwrap();
        assert!(completed.newly_completed);
        assert_eq!(completed.progress.watch_time_secs, 120);
        let completed_at = completed.progress.completed_at;
        assert!(completed_at.is_some());

        let again = tracker(&store)
            .record(identity, &course_id, &lesson_id, 300, false)
            .await
            .unwrap();
        assert!(!again.newly_completed);
        assert!(again.progress.completed);
        assert_eq!(again.progress.watch_time_secs, 300);
        assert_eq!(again.progress.completed_at, completed_at);

        assert_eq!(store.activity_count(ActivityKind::LessonCompleted), 1);

        let summary = tracker(&store)
            .course_progress(identity, &course_id)
            .await
            .unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.total, 3);
    }

    #[tokio::test]
    async fn test_progress_requires_entitlement_and_valid_input() {
        let store = MemoryStore::default();
        let fixture = course(1000, Utc::now());
        let lesson_id = fixture.lessons[0].lesson_id.to_string();
        let course_id = store.add_course(fixture);
        let stranger = store.add_user(LearnerRole::User);
        let owner = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);

        let denied = tracker(&store)
            .record(
                RequestIdentity::authenticated(stranger),
                &course_id.to_string(),
                &lesson_id,
                10,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(denied, AcademyError::AccessDenied));

        let negative = tracker(&store)
            .record(
                RequestIdentity::authenticated(owner),
                &course_id.to_string(),
                &lesson_id,
                -1,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(negative, AcademyError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_favorite_toggles() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(1000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let favorites = ToggleFavoriteUseCase::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let identity = RequestIdentity::authenticated(user_id);

        assert!(favorites.execute(identity, &course_id.to_string()).await.unwrap());
        assert!(!favorites.execute(identity, &course_id.to_string()).await.unwrap());

        let err = favorites
            .execute(RequestIdentity::anonymous(), &course_id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AcademyError::NotAuthenticated));
    }
}

#[cfg(test)]
mod http_tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use kernel::identity::RequestIdentity;
    use tower::ServiceExt;

    use super::fakes::{
        FakeGateway, MemoryBlobs, MemoryStore, completed_event, course, sign,
    };
    use crate::application::AcademyConfig;
    use crate::domain::value_object::learner_role::LearnerRole;
    use crate::infra::stripe::SIGNATURE_HEADER;
    use crate::presentation::handlers::content_disposition;
    use crate::presentation::router::academy_router_generic;

    fn app(store: &MemoryStore, blobs: &MemoryBlobs) -> Router {
        academy_router_generic(
            store.clone(),
            FakeGateway::default(),
            blobs.clone(),
            Arc::new(AcademyConfig::development()),
        )
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str, identity: RequestIdentity) -> Request<Body> {
        Request::get(uri)
            .extension(identity)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_access_endpoint_reports_decision() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));

        let response = app(&store, &MemoryBlobs::default())
            .oneshot(get(
                &format!("/courses/{course_id}/access"),
                RequestIdentity::anonymous(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["hasAccess"], false);
        assert_eq!(body["reason"], "not_authenticated");
        assert!(body.get("courseTitle").is_none());
    }

    #[tokio::test]
    async fn test_webhook_then_access_over_http() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let user_id = store.add_user(LearnerRole::User);
        let payload = completed_event("cs_http", course_id, user_id, 5000, None);

        let response = app(&store, &blobs)
            .oneshot(
                Request::post("/webhooks/payment")
                    .header(SIGNATURE_HEADER, sign(&payload))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["received"], true);
        assert_eq!(body["outcome"], "fulfilled");

        let response = app(&store, &blobs)
            .oneshot(get(
                &format!("/courses/{course_id}/access?locale=en"),
                RequestIdentity::authenticated(user_id),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["hasAccess"], true);
        assert_eq!(body["reason"], "purchased");
        assert_eq!(body["courseTitle"], "Course");
        assert_eq!(body["coursePrice"], 50.0);
    }

    #[tokio::test]
    async fn test_webhook_status_codes() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();

        let unsigned = app(&store, &blobs)
            .oneshot(
                Request::post("/webhooks/payment")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unsigned.status(), StatusCode::BAD_REQUEST);
        let body = json_body(unsigned).await;
        assert_eq!(body["code"], "invalid_signature");

        let malformed = br#"{"id":"evt","type":"checkout.session.completed","data":{"object":{"id":"cs","payment_status":"paid","metadata":{}}}}"#;
        let rejected = app(&store, &blobs)
            .oneshot(
                Request::post("/webhooks/payment")
                    .header(SIGNATURE_HEADER, sign(malformed))
                    .body(Body::from(malformed.to_vec()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::OK);
        assert_eq!(json_body(rejected).await["outcome"], "rejected");
    }

    #[tokio::test]
    async fn test_checkout_conflict_carries_reason_code() {
        let store = MemoryStore::default();
        let course_id = store.add_course(course(5000, Utc::now()));
        let owner = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);

        let response = app(&store, &MemoryBlobs::default())
            .oneshot(
                Request::post("/checkout")
                    .extension(RequestIdentity::authenticated(owner))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "courseId": course_id.to_string() }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], "already_owned");
        assert_eq!(body["status"], 409);
    }

    #[tokio::test]
    async fn test_media_token_requires_sign_in() {
        let store = MemoryStore::default();
        store.add_course(course(5000, Utc::now()));

        let response = app(&store, &MemoryBlobs::default())
            .oneshot(get("/media/vid-1/token", RequestIdentity::anonymous()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "not_authenticated");
    }

    #[tokio::test]
    async fn test_file_download_headers_and_body() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let fixture = course(5000, Utc::now());
        let file = fixture.lessons[2].files[0].clone();
        blobs.put(&file.storage_key, b"%PDF-1.7");
        let course_id = store.add_course(fixture);
        let owner = store.add_user(LearnerRole::User);
        let stranger = store.add_user(LearnerRole::User);
        store.grant(owner, course_id);
        let uri = format!("/files/{}", file.file_id);

        let response = app(&store, &blobs)
            .oneshot(get(&uri, RequestIdentity::authenticated(owner)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_LENGTH], "8");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains("filename*=UTF-8''"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7");

        let denied = app(&store, &blobs)
            .oneshot(get(&uri, RequestIdentity::authenticated(stranger)))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_content_disposition_encodes_non_ascii_names() {
        let value = content_disposition("Рабочая тетрадь.pdf");

        assert!(value.starts_with("attachment; filename=\""));
        assert!(value.ends_with(
            "filename*=UTF-8''%D0%A0%D0%B0%D0%B1%D0%BE%D1%87%D0%B0%D1%8F%20%D1%82%D0%B5%D1%82%D1%80%D0%B0%D0%B4%D1%8C.pdf"
        ));
        assert!(value.is_ascii());

        assert_eq!(
            content_disposition("notes \"v2\".txt"),
            "attachment; filename=\"notes _v2_.txt\"; filename*=UTF-8''notes%20%22v2%22.txt"
        );
    }
}
