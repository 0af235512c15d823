//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    MemoryIdentityProvider, MemoryImageStore, MemoryNewsletterRepository, MemoryReplyRepository,
    MemorySubscriptionRepository, MemoryUserRepository,
};
use crate::domain::{
    Account, AccountService, DashboardService, DisplayName, EmailAddress, NewsletterService,
    ReplyService, Role, SubscriptionService, UserId,
};

use super::state::HttpState;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// The fixed instant test clocks report.
pub fn test_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
        .single()
        .expect("valid test timestamp")
}

struct TestClock;

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        test_timestamp().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        test_timestamp()
    }
}

/// In-memory stores backing a [`HttpState`] built by [`test_state`].
pub struct TestStores {
    /// Newsletter store.
    pub newsletters: Arc<MemoryNewsletterRepository>,
    /// Account store.
    pub users: Arc<MemoryUserRepository>,
    /// Subscription store.
    pub subscriptions: Arc<MemorySubscriptionRepository>,
    /// Reply store.
    pub replies: Arc<MemoryReplyRepository>,
    /// Identity provider.
    pub identity: Arc<MemoryIdentityProvider>,
}

/// Build a fully in-memory [`HttpState`] plus handles to its stores so
/// tests can seed data behind the handlers.
pub fn test_state() -> (HttpState, TestStores) {
    test_state_with_identity(MemoryIdentityProvider::new())
}

/// Like [`test_state`], seeding the given identity provider.
pub fn test_state_with_identity(identity: MemoryIdentityProvider) -> (HttpState, TestStores) {
    let newsletters = Arc::new(MemoryNewsletterRepository::new());
    let users = Arc::new(MemoryUserRepository::new());
    let subscriptions = Arc::new(MemorySubscriptionRepository::new(Arc::clone(&newsletters)));
    let replies = Arc::new(MemoryReplyRepository::new(
        Arc::clone(&newsletters),
        Arc::clone(&users),
    ));
    let identity = Arc::new(identity);
    let clock: Arc<dyn Clock> = Arc::new(TestClock);

    let state = HttpState::new(
        AccountService::new(
            Arc::clone(&identity) as _,
            Arc::clone(&users) as _,
            Arc::clone(&clock),
        ),
        NewsletterService::new(
            Arc::clone(&newsletters) as _,
            Arc::clone(&subscriptions) as _,
            Arc::clone(&replies) as _,
            Arc::clone(&clock),
        ),
        SubscriptionService::new(
            Arc::clone(&subscriptions) as _,
            Arc::clone(&newsletters) as _,
            Arc::clone(&clock),
        ),
        ReplyService::new(
            Arc::clone(&replies) as _,
            Arc::clone(&subscriptions) as _,
            Arc::clone(&newsletters) as _,
            Arc::clone(&clock),
        ),
        DashboardService::new(
            Arc::clone(&newsletters) as _,
            Arc::clone(&users) as _,
            Arc::clone(&replies) as _,
            Arc::clone(&clock),
        ),
        Arc::new(MemoryImageStore::new()),
    );

    (
        state,
        TestStores {
            newsletters,
            users,
            subscriptions,
            replies,
            identity,
        },
    )
}

/// Seed an account directly into the store, bypassing the provider.
pub async fn seed_account(stores: &TestStores, email: &str, role: Role) -> Account {
    use crate::domain::ports::UserRepository;

    let account = Account::new(
        UserId::random(),
        EmailAddress::new(email).expect("valid email"),
        DisplayName::new("Seeded Account").expect("valid name"),
        role,
        false,
        test_timestamp(),
    );
    stores
        .users
        .insert_if_absent(&account)
        .await
        .expect("seed account")
}

/// Email used for the seeded administrator login.
pub const ADMIN_EMAIL: &str = "admin@example.com";
/// Email used for the seeded subscriber login.
pub const SUBSCRIBER_EMAIL: &str = "reader@example.com";
/// Password shared by the seeded logins.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// In-memory state with a verified administrator and subscriber identity
/// ready to log in through `POST /api/v1/auth/login`.
pub async fn test_app_state() -> (HttpState, TestStores) {
    let identity = MemoryIdentityProvider::new()
        .with_verified_identity(
            EmailAddress::new(ADMIN_EMAIL).expect("valid email"),
            TEST_PASSWORD,
        )
        .with_verified_identity(
            EmailAddress::new(SUBSCRIBER_EMAIL).expect("valid email"),
            TEST_PASSWORD,
        );
    let (state, stores) = test_state_with_identity(identity);
    // The admin profile must pre-exist with its role; subscriber profiles
    // are created by the login flow itself.
    seed_account(&stores, ADMIN_EMAIL, Role::Admin).await;
    (state, stores)
}

/// Log in through the auth handler and return the session cookie.
pub async fn login_cookie<S, B, E>(
    app: &S,
    email: &str,
    password: &str,
) -> actix_web::cookie::Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = E,
        >,
    B: actix_web::body::MessageBody,
    E: std::fmt::Debug,
{
    let res = actix_web::test::call_service(
        app,
        actix_web::test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(serde_json::json!({ "email": email, "password": password }))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success(), "login failed: {}", res.status());
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

/// Session cookie for the seeded administrator.
pub async fn admin_login_cookie<S, B, E>(app: &S) -> actix_web::cookie::Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = E,
        >,
    B: actix_web::body::MessageBody,
    E: std::fmt::Debug,
{
    login_cookie(app, ADMIN_EMAIL, TEST_PASSWORD).await
}

/// Session cookie for the seeded subscriber.
pub async fn subscriber_login_cookie<S, B, E>(app: &S) -> actix_web::cookie::Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = E,
        >,
    B: actix_web::body::MessageBody,
    E: std::fmt::Debug,
{
    login_cookie(app, SUBSCRIBER_EMAIL, TEST_PASSWORD).await
}
