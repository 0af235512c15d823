//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};

use crate::outbound::persistence::DbPool;

/// Connection settings for the external identity provider.
#[derive(Clone)]
pub struct IdentityProviderConfig {
    /// Base URL of the provider's REST API.
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) identity: Option<IdentityProviderConfig>,
    pub(crate) image_upload_url: Option<String>,
}

impl ServerConfig {
    /// Construct a server configuration from the session settings.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool: None,
            identity: None,
            image_upload_url: None,
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// Without one, the server falls back to in-memory stores; useful for
    /// local development and tests, useless for production.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Attach the external identity provider.
    ///
    /// Without one, an in-memory provider pre-seeded with a development
    /// administrator is used.
    #[must_use]
    pub fn with_identity_provider(mut self, identity: IdentityProviderConfig) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Attach the external image host upload endpoint.
    #[must_use]
    pub fn with_image_host(mut self, upload_url: impl Into<String>) -> Self {
        self.image_upload_url = Some(upload_url.into());
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
