//! Server construction and dependency wiring.
//!
//! Database-backed adapters are used when a pool is configured; otherwise
//! every port falls back to its in-memory implementation so the server
//! still runs end-to-end in development.

mod config;

pub use config::{IdentityProviderConfig, ServerConfig};

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, web};
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::ports::{
    IdentityProvider, ImageStore, MemoryIdentityProvider, MemoryImageStore,
    MemoryNewsletterRepository, MemoryReplyRepository, MemorySubscriptionRepository,
    MemoryUserRepository, NewsletterRepository, ReplyRepository, SubscriptionRepository,
    UserRepository,
};
use crate::domain::{
    Account, AccountService, DashboardService, DisplayName, EmailAddress, NewsletterService,
    ReplyService, Role, SubscriptionService, UserId,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::{auth, dashboard, images, newsletters, replies, subscriptions, users};
use crate::middleware::Trace;
use crate::outbound::identity::HttpIdentityProvider;
use crate::outbound::images::HttpImageStore;
use crate::outbound::persistence::{
    DieselNewsletterRepository, DieselReplyRepository, DieselSubscriptionRepository,
    DieselUserRepository,
};

/// Email of the administrator seeded in the no-provider development mode.
const DEV_ADMIN_EMAIL: &str = "admin@newsecho.dev";
/// Password of the seeded development administrator.
const DEV_ADMIN_PASSWORD: &str = "password";

struct Ports {
    newsletters: Arc<dyn NewsletterRepository>,
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    replies: Arc<dyn ReplyRepository>,
    identity: Arc<dyn IdentityProvider>,
    images: Arc<dyn ImageStore>,
}

async fn build_ports(config: &ServerConfig) -> Ports {
    let http_client = reqwest::Client::new();

    let identity: Arc<dyn IdentityProvider> = match &config.identity {
        Some(identity) => Arc::new(HttpIdentityProvider::new(
            http_client.clone(),
            identity.base_url.clone(),
            identity.api_key.clone(),
        )),
        None => {
            warn!(email = DEV_ADMIN_EMAIL, "no identity provider configured, seeding dev admin");
            Arc::new(dev_identity_provider())
        }
    };

    let images: Arc<dyn ImageStore> = match &config.image_upload_url {
        Some(upload_url) => Arc::new(HttpImageStore::new(http_client, upload_url.clone())),
        None => Arc::new(MemoryImageStore::new()),
    };

    match &config.db_pool {
        Some(pool) => Ports {
            newsletters: Arc::new(DieselNewsletterRepository::new(pool.clone())),
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            subscriptions: Arc::new(DieselSubscriptionRepository::new(pool.clone())),
            replies: Arc::new(DieselReplyRepository::new(pool.clone())),
            identity,
            images,
        },
        None => {
            let newsletters = Arc::new(MemoryNewsletterRepository::new());
            let users = Arc::new(MemoryUserRepository::new());
            let subscriptions =
                Arc::new(MemorySubscriptionRepository::new(Arc::clone(&newsletters)));
            let replies = Arc::new(MemoryReplyRepository::new(
                Arc::clone(&newsletters),
                Arc::clone(&users),
            ));
            if config.identity.is_none() {
                seed_dev_admin(users.as_ref()).await;
            }
            Ports {
                newsletters,
                users,
                subscriptions,
                replies,
                identity,
                images,
            }
        }
    }
}

fn dev_identity_provider() -> MemoryIdentityProvider {
    match EmailAddress::new(DEV_ADMIN_EMAIL) {
        Ok(email) => {
            MemoryIdentityProvider::new().with_verified_identity(email, DEV_ADMIN_PASSWORD)
        }
        Err(err) => {
            warn!(error = %err, "dev admin email rejected, starting with an empty provider");
            MemoryIdentityProvider::new()
        }
    }
}

async fn seed_dev_admin(users: &MemoryUserRepository) {
    let clock = DefaultClock;
    let account = EmailAddress::new(DEV_ADMIN_EMAIL)
        .ok()
        .zip(DisplayName::new("NewsEcho Admin").ok())
        .map(|(email, display_name)| {
            Account::new(
                UserId::random(),
                email,
                display_name,
                Role::Admin,
                false,
                clock.utc(),
            )
        });
    if let Some(account) = account {
        if let Err(err) = users.insert_if_absent(&account).await {
            warn!(error = %err, "failed to seed dev admin account");
        }
    }
}

fn build_services(ports: &Ports) -> HttpState {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    HttpState::new(
        AccountService::new(
            Arc::clone(&ports.identity),
            Arc::clone(&ports.users),
            Arc::clone(&clock),
        ),
        NewsletterService::new(
            Arc::clone(&ports.newsletters),
            Arc::clone(&ports.subscriptions),
            Arc::clone(&ports.replies),
            Arc::clone(&clock),
        ),
        SubscriptionService::new(
            Arc::clone(&ports.subscriptions),
            Arc::clone(&ports.newsletters),
            Arc::clone(&clock),
        ),
        ReplyService::new(
            Arc::clone(&ports.replies),
            Arc::clone(&ports.subscriptions),
            Arc::clone(&ports.newsletters),
            Arc::clone(&clock),
        ),
        DashboardService::new(
            Arc::clone(&ports.newsletters),
            Arc::clone(&ports.users),
            Arc::clone(&ports.replies),
            clock,
        ),
        Arc::clone(&ports.images),
    )
}

/// Build dependencies, bind, and run the HTTP server until shutdown.
///
/// # Errors
///
/// Returns an [`std::io::Error`] when the listener cannot bind.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let ports = build_ports(&config).await;
    let state = web::Data::new(build_services(&ports));
    let health_state = web::Data::new(HealthState::new());
    // Clone for the server factory so the readiness probe stays reachable.
    let server_health_state = health_state.clone();

    let key = config.key.clone();
    let cookie_secure = config.cookie_secure;
    let same_site = config.same_site;

    let server = HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".to_owned())
            .cookie_path("/".to_owned())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(same_site)
            .build();

        let api = web::scope("/api/v1")
            .wrap(session)
            .service(auth::signup)
            .service(auth::login)
            .service(auth::logout)
            .service(auth::verify)
            .service(auth::reset_password)
            .service(auth::me)
            .service(newsletters::create_newsletter)
            .service(newsletters::list_newsletters)
            .service(newsletters::get_newsletter)
            .service(newsletters::update_newsletter)
            .service(newsletters::delete_newsletter)
            .service(newsletters::browse_newsletters)
            .service(subscriptions::subscribe)
            .service(subscriptions::unsubscribe)
            .service(subscriptions::list_subscriptions)
            .service(replies::submit_reply)
            .service(replies::list_own_replies)
            .service(replies::list_replies)
            .service(replies::mark_reply_read)
            .service(dashboard::dashboard)
            .service(users::list_subscribers)
            .service(users::set_user_disabled)
            .service(users::delete_user)
            .service(users::get_settings)
            .service(users::update_settings)
            .service(images::upload_image);

        let mut app = App::new()
            .app_data(state.clone())
            .app_data(server_health_state.clone())
            // Raw image uploads exceed Actix's default payload cap.
            .app_data(web::PayloadConfig::new(images::IMAGE_MAX_BYTES + 1024))
            .wrap(Trace)
            .service(api)
            .service(ready)
            .service(live);

        #[cfg(debug_assertions)]
        {
            app = app
                .service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
        }

        app
    })
    .bind(config.bind_addr)?;

    info!(addr = %config.bind_addr, "listening");
    health_state.mark_ready();
    server.run().await
}
