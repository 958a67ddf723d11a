use std::collections::HashMap;

use slink_proto::types::NextHop;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown server '{0}'")]
pub struct UnknownRoute(pub String);

/// Maps the server part of an identity (`user@server`) to a proxy address.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl RouteTable {
    pub fn new(routes: HashMap<String, String>) -> Self {
        Self { routes }
    }

    /// Split a decoded identity into its bare username and its next hop.
    ///
    /// Only the last '@' separates the server, so usernames may contain '@'
    /// themselves. An identity without '@' is not restricted to any server.
    /// A trailing '@' is a lookup of the empty server name.
    pub fn resolve<'a>(&self, identity: &'a str) -> Result<(&'a str, NextHop), UnknownRoute> {
        let (user, server) = match identity.rsplit_once('@') {
            None => return Ok((identity, NextHop::Any)),
            Some(parts) => parts,
        };

        match self.routes.get(server) {
            Some(addr) => Ok((user, NextHop::Address(addr.clone()))),
            None => Err(UnknownRoute(server.to_string())),
        }
    }
}
