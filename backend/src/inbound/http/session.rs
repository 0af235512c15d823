//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! This is the single authorization seam: every protected handler goes
//! through [`SessionContext::require_user`] or
//! [`SessionContext::require_admin`] instead of re-implementing its own
//! gate. The session cookie carries the user id and a role claim set at
//! login.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, Role, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Authenticated caller extracted from the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser {
    /// Account identifier.
    pub user_id: UserId,
    /// Role claim stored at login.
    pub role: Role,
}

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user's id and role claim.
    pub fn persist(&self, user_id: &UserId, role: Role) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user_id.to_string())
            .and_then(|()| self.0.insert(ROLE_KEY, role.to_string()))
            .map_err(|err| Error::internal(format!("failed to persist session: {err}")))
    }

    /// Drop the session entirely.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// Fetch the current session user, if one is established.
    pub fn user(&self) -> Result<Option<SessionUser>, Error> {
        let raw_id = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|err| Error::internal(format!("failed to read session: {err}")))?;
        let raw_role = self
            .0
            .get::<String>(ROLE_KEY)
            .map_err(|err| Error::internal(format!("failed to read session: {err}")))?;

        let (Some(raw_id), Some(raw_role)) = (raw_id, raw_role) else {
            return Ok(None);
        };
        let Ok(user_id) = UserId::new(&raw_id) else {
            tracing::warn!("invalid user id in session cookie");
            return Ok(None);
        };
        let Ok(role) = raw_role.parse::<Role>() else {
            tracing::warn!("invalid role claim in session cookie");
            return Ok(None);
        };
        Ok(Some(SessionUser { user_id, role }))
    }

    /// Require an authenticated caller or return `401 Unauthorized`.
    pub fn require_user(&self) -> Result<SessionUser, Error> {
        self.user()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Require an authenticated administrator.
    ///
    /// Missing sessions map to `401`; authenticated non-admins to `403`.
    pub fn require_admin(&self) -> Result<SessionUser, Error> {
        let user = self.require_user()?;
        if user.role != Role::Admin {
            return Err(Error::forbidden("administrator access required"));
        }
        Ok(user)
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
