use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use slink_proto::types::Identity;

use crate::config::*;
use crate::login::*;
use crate::routing::RouteTable;

const PHC_ARGON2_PREFIX: &str = "$argon2";

/// Checks identities against the tables of the configuration file.
///
/// Tables are read once, the provider never mutates them afterwards.
pub struct StaticLoginProvider {
    routes: RouteTable,
    users: HashMap<String, Arc<UserEntry>>,
}

impl StaticLoginProvider {
    pub fn new(config: StaticConfig) -> Result<Self> {
        for (username, entry) in config.users.iter() {
            if is_password_hash(&entry.password) {
                parse_password_hash(&entry.password)
                    .map_err(|e| anyhow!("User {}: {:#}", username, e))?;
            }
        }
        if config.users.is_empty() {
            tracing::warn!("No user configured, every login will fail");
        }

        let users = config
            .users
            .into_iter()
            .map(|(k, v)| (k, Arc::new(v)))
            .collect::<HashMap<_, _>>();

        tracing::info!(users = users.len(), routes = config.routes.len(), "static tables loaded");
        Ok(Self {
            routes: RouteTable::new(config.routes),
            users,
        })
    }
}

#[async_trait]
impl LoginProvider for StaticLoginProvider {
    async fn login(&self, identity: &Identity) -> Result<Grant, LoginError> {
        let (identity, password) = identity
            .decoded()
            .map_err(|e| LoginError::Fatal(e.into()))?;

        let (username, next_hop) = self.routes.resolve(&identity)?;
        tracing::debug!(user=%username, next_hop=?next_hop, "login");

        let user = match self.users.get(username) {
            None => return Err(LoginError::NoSuchUser),
            Some(u) => u,
        };

        tracing::debug!(user=%username, "verify password");
        if !check_password(&password, &user.password).map_err(LoginError::Fatal)? {
            return Err(LoginError::BadPassword);
        }

        tracing::debug!(user=%username, "logged");
        Ok(Grant {
            next_hop,
            username: username.to_string(),
        })
    }
}

fn is_password_hash(stored: &str) -> bool {
    stored.starts_with(PHC_ARGON2_PREFIX)
}

/// `stored` is either an argon2 PHC string or a clear text password
pub fn check_password(password: &str, stored: &str) -> Result<bool> {
    match is_password_hash(stored) {
        true => verify_password(password, stored),
        false => Ok(password == stored),
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
        Argon2,
    };
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Argon2 error: {}", e))?
        .to_string())
}

/// Parse a PHC string and check argon2 can actually verify against it:
/// known algorithm, valid params, salt and hash output present.
fn parse_password_hash(hash: &str) -> Result<argon2::PasswordHash<'_>> {
    use argon2::{password_hash::PasswordHash, Params};

    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow!("Invalid hashed password: {}", e))?;
    if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
        bail!("Invalid hashed password: salt or hash output is missing");
    }
    Params::try_from(&parsed_hash)
        .map_err(|e| anyhow!("Unusable hashed password: {}", e))?;
    Ok(parsed_hash)
}

/// `Ok(false)` means a wrong password, any other problem with the hash is an error
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    use argon2::{
        password_hash::{Error, PasswordVerifier},
        Argon2,
    };
    let parsed_hash = parse_password_hash(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => bail!("Unable to verify hashed password: {}", e),
    }
}

/// Add or replace a user in a static configuration, storing only a hash of its password.
///
/// A login containing '@' can only be reached with an explicit `@server` suffix.
pub fn set_user(config: &mut StaticConfig, login: &str, password: &str) -> Result<()> {
    let hash = hash_password(password)?;
    config
        .users
        .insert(login.to_string(), UserEntry { password: hash });
    Ok(())
}
