use futures::Future;

use super::decode::request;
use super::types::*;

/// Where a helper stands with respect to the line it is handling.
///
/// Dispatching and executing happen inside [`State::progress`], so the only
/// observable states are waiting for a line, holding a verdict that must be
/// written, and closed.
#[derive(Debug)]
pub enum State {
    Idle,
    Responding(Verdict),
    Closed,
}

impl State {
    pub fn new() -> Self {
        Self::Idle
    }

    /// Consume one input line, `None` meaning the end of the stream.
    ///
    /// `login` is only called for well-formed `username` requests.
    pub async fn progress<X, F>(&mut self, line: Option<&[u8]>, login: X)
    where
        X: FnOnce(Identity) -> F,
        F: Future<Output = AuthRes>,
    {
        let new_state = match (std::mem::replace(self, State::Idle), line) {
            (Self::Closed, _) => {
                tracing::error!("Input stream is already closed, ignoring line");
                Self::Closed
            }
            (_, None) => Self::Closed,
            (_, Some(line)) => match request(line) {
                None => {
                    tracing::warn!("Request has neither the 'none' nor the 'username' shape");
                    Self::Responding(Verdict::Denied(FailReason::InvalidArguments))
                }
                Some(Request::None { channel }) => {
                    tracing::debug!(channel=%String::from_utf8_lossy(&channel), "anonymous request");
                    Self::Responding(Verdict::Anonymous)
                }
                Some(Request::Username { channel, identity }) => {
                    tracing::debug!(channel=%String::from_utf8_lossy(&channel), identity=?identity, "username request");
                    Self::Responding(login(identity).await.into())
                }
            },
        };
        tracing::debug!(state=?new_state, "Made progress");
        *self = new_state;
    }

    pub fn response(&self) -> Option<&Verdict> {
        match self {
            Self::Responding(verdict) => Some(verdict),
            _ => None,
        }
    }

    /// The verdict has been written out, wait for the next line.
    pub fn responded(&mut self) {
        if let Self::Responding(_) = self {
            *self = Self::Idle;
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
