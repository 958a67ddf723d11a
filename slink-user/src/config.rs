use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "backend")]
pub enum HelperConfig {
    /// Users and passwords are listed in the configuration itself
    Static(StaticConfig),
    /// Passwords are checked by the operating system
    Pam(PamConfig),
}

pub type UserList = HashMap<String, UserEntry>;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StaticConfig {
    /// Symbolic server name (the part after '@' in an identity) to proxy address
    #[serde(default)]
    pub routes: HashMap<String, String>,
    #[serde(default)]
    pub users: UserList,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserEntry {
    /// Either an argon2 PHC string or the password in clear text
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PamConfig {
    #[serde(default = "default_pam_service")]
    pub service: String,
}

impl StaticConfig {
    /// Tables used by `--dev`, NOT INTENDED FOR PRODUCTION
    pub fn demo() -> Self {
        let routes = [
            ("localhost", "127.0.0.1:1080"),
            ("localhostv6", "[::1]:1080"),
        ]
        .into_iter()
        .map(|(name, addr)| (name.to_string(), addr.to_string()))
        .collect();

        let users = [("test", "test123"), ("test2", "test2")]
            .into_iter()
            .map(|(name, password)| {
                (
                    name.to_string(),
                    UserEntry {
                        password: password.to_string(),
                    },
                )
            })
            .collect();

        Self { routes, users }
    }
}

impl Default for PamConfig {
    fn default() -> Self {
        Self {
            service: default_pam_service(),
        }
    }
}

pub fn read_config<T: serde::de::DeserializeOwned>(config_file: PathBuf) -> Result<T> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(config_file.as_path())?;

    let mut config = String::new();
    file.read_to_string(&mut config)?;

    Ok(toml::from_str(&config)?)
}

pub fn write_config<T: Serialize>(config_file: PathBuf, config: &T) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(config_file.as_path())?;

    file.write_all(toml::to_string(config)?.as_bytes())?;

    Ok(())
}

fn default_pam_service() -> String {
    "passwd".into()
}
