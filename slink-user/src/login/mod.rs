pub mod pam_provider;
pub mod static_provider;

use std::sync::Arc;

use async_trait::async_trait;

use slink_proto::types::{AuthRes, FailReason, Identity, NextHop};

use crate::routing::UnknownRoute;

/// The trait LoginProvider defines the interface for a login provider
/// that checks the credentials of one request against some backend.
#[async_trait]
pub trait LoginProvider {
    /// The identity is handed over exactly as received on the wire, the
    /// provider decides how its fields are decoded.
    async fn login(&self, identity: &Identity) -> Result<Grant, LoginError>;

    /// Verdict used when a request blows up in a way the provider did not report itself
    fn fault(&self) -> FailReason {
        FailReason::Fatal
    }
}

/// ArcLoginProvider is simply an alias on a structure that is used
/// in many places in the code
pub type ArcLoginProvider = Arc<dyn LoginProvider + Send + Sync>;

/// A successful login
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub next_hop: NextHop,
    /// Username without its '@server' suffix
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    UnknownServer(#[from] UnknownRoute),
    #[error("no such user")]
    NoSuchUser,
    #[error("bad password")]
    BadPassword,
    #[error("rejected by the authentication backend: {0}")]
    Rejected(String),
    #[error("fatal error: {0:#}")]
    Fatal(anyhow::Error),
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl LoginError {
    pub fn reason(&self) -> FailReason {
        match self {
            Self::UnknownServer(_) => FailReason::UnknownServer,
            Self::NoSuchUser => FailReason::NoSuchUser,
            Self::BadPassword => FailReason::BadPassword,
            Self::Rejected(reason) => FailReason::Backend(reason.clone()),
            Self::Fatal(_) => FailReason::Fatal,
            Self::Internal(_) => FailReason::Internal,
        }
    }
}

impl From<Grant> for AuthRes {
    fn from(grant: Grant) -> Self {
        AuthRes::Success {
            next_hop: grant.next_hop,
            user: grant.username,
        }
    }
}

impl From<LoginError> for AuthRes {
    fn from(err: LoginError) -> Self {
        AuthRes::Failed(err.reason())
    }
}
