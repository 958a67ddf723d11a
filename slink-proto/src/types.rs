use std::fmt;

/// A request line, already split and dispatched on its arity and keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `<channel> none`: the proxy only wants a route, no credentials are checked.
    None { channel: Vec<u8> },
    /// `<channel> username <identity> <password>`
    Username { channel: Vec<u8>, identity: Identity },
}

/// Credentials exactly as they were received on the wire.
///
/// Whether the fields are percent-decoded is up to the backend: the static
/// table decodes them, the PAM backend hands the username over untouched.
#[derive(Clone, PartialEq)]
pub struct Identity {
    pub user: Vec<u8>,
    pub password: Vec<u8>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user", &String::from_utf8_lossy(&self.user))
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the proxy should send the client once authenticated.
#[derive(Debug, Clone, PartialEq)]
pub enum NextHop {
    /// `!`: no restriction, the proxy uses its default route.
    Any,
    /// `none`: the backend does not do any routing.
    Unrouted,
    /// A backend address taken from the routing table, eg. `127.0.0.1:1080`.
    Address(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailReason {
    UnknownServer,
    BadPassword,
    NoSuchUser,
    /// The static backend hit something it did not expect (undecodable credentials...)
    Fatal,
    /// The OS backend hit something it did not expect
    Internal,
    /// The request has neither the `none` nor the `username` shape
    InvalidArguments,
    /// Reason reported by the authentication backend itself
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthRes {
    Success { next_hop: NextHop, user: String },
    Failed(FailReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// `OK ! none`
    Anonymous,
    /// `OK <next-hop> username <user>`
    Granted { next_hop: NextHop, user: String },
    /// `ERR <message>`
    Denied(FailReason),
}

impl From<AuthRes> for Verdict {
    fn from(res: AuthRes) -> Self {
        match res {
            AuthRes::Success { next_hop, user } => Self::Granted { next_hop, user },
            AuthRes::Failed(reason) => Self::Denied(reason),
        }
    }
}
