use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use slink_proto::types::{FailReason, Identity, NextHop};

use crate::config::PamConfig;
use crate::login::*;

/// A message sent by the OS authentication stack during a conversation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prompt<'a> {
    /// Asks for a secret, whether the terminal would echo it or not
    Credential(&'a str),
    Info(&'a str),
    Error(&'a str),
    /// Radio buttons, binary challenges, anything we don't know how to answer
    Unsupported,
}

/// Answers the prompts of a single authentication attempt.
///
/// Built for one request and dropped with it: the password never outlives
/// the attempt it belongs to.
pub struct PasswordConversation<D: Write = std::io::Stderr> {
    password: String,
    diagnostics: D,
}

impl PasswordConversation {
    pub fn new(password: String) -> Self {
        Self::with_diagnostics(password, std::io::stderr())
    }
}

impl<D: Write> PasswordConversation<D> {
    pub fn with_diagnostics(password: String, diagnostics: D) -> Self {
        Self {
            password,
            diagnostics,
        }
    }

    /// `None` aborts the conversation
    pub fn answer(&mut self, prompt: Prompt<'_>) -> Option<String> {
        match prompt {
            Prompt::Credential(_) => Some(self.password.clone()),
            Prompt::Info(text) | Prompt::Error(text) => {
                let text = text.trim_end_matches('\n').replace(['\r', '\n'], " ");
                if let Err(e) = writeln!(self.diagnostics, "ERR {}", text) {
                    tracing::warn!(err=%e, "unable to forward PAM message");
                }
                Some(String::new())
            }
            Prompt::Unsupported => {
                tracing::warn!("Unsupported PAM prompt, aborting the conversation");
                None
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PamFailure {
    /// The stack processed the request and said no
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One blocking authentication attempt against an OS authentication stack.
pub trait PamBackend: Send + Sync {
    fn authenticate(
        &self,
        service: &str,
        user: &str,
        conversation: PasswordConversation,
    ) -> Result<(), PamFailure>;
}

pub struct PamLoginProvider {
    service: String,
    backend: Arc<dyn PamBackend>,
}

impl PamLoginProvider {
    #[cfg(feature = "pam")]
    pub fn new(config: PamConfig) -> Result<Self> {
        Ok(Self::with_backend(config, system::SystemPam))
    }

    #[cfg(not(feature = "pam"))]
    pub fn new(_config: PamConfig) -> Result<Self> {
        anyhow::bail!("This helper was built without PAM support, rebuild it with the 'pam' feature")
    }

    pub fn with_backend(config: PamConfig, backend: impl PamBackend + 'static) -> Self {
        tracing::info!(service = %config.service, "PAM backend ready");
        Self {
            service: config.service,
            backend: Arc::new(backend),
        }
    }
}

fn wire_string(raw: &[u8], what: &str) -> Result<String, LoginError> {
    let value = String::from_utf8(raw.to_vec())
        .map_err(|_| LoginError::Internal(anyhow!("{} is not valid UTF-8", what)))?;
    if value.contains('\0') {
        return Err(LoginError::Internal(anyhow!("{} contains a NUL byte", what)));
    }
    Ok(value)
}

#[async_trait]
impl LoginProvider for PamLoginProvider {
    async fn login(&self, identity: &Identity) -> Result<Grant, LoginError> {
        // PAM receives the fields untouched, no percent-decoding here
        let username = wire_string(&identity.user, "username")?;
        let password = wire_string(&identity.password, "password")?;
        tracing::debug!(user=%username, service=%self.service, "login");

        let backend = self.backend.clone();
        let service = self.service.clone();
        let user = username.clone();
        let attempt = tokio::task::spawn_blocking(move || {
            backend.authenticate(&service, &user, PasswordConversation::new(password))
        })
        .await;

        match attempt {
            Ok(Ok(())) => {
                tracing::debug!(user=%username, "logged");
                Ok(Grant {
                    next_hop: NextHop::Unrouted,
                    username,
                })
            }
            Ok(Err(PamFailure::Rejected(reason))) => Err(LoginError::Rejected(reason)),
            Ok(Err(PamFailure::Other(e))) => Err(LoginError::Internal(e)),
            Err(e) => Err(LoginError::Internal(anyhow!("PAM task failed: {}", e))),
        }
    }

    fn fault(&self) -> FailReason {
        FailReason::Internal
    }
}

#[cfg(feature = "pam")]
mod system {
    use std::ffi::{CStr, CString};
    use std::io::Write;

    use anyhow::anyhow;
    use pam_client::{Context, ConversationHandler, ErrorCode, Flag};

    use super::*;

    impl<D: Write> PasswordConversation<D> {
        fn reply(&mut self, prompt: Prompt<'_>) -> Result<CString, ErrorCode> {
            match self.answer(prompt) {
                Some(value) => CString::new(value).map_err(|_| ErrorCode::CONV_ERR),
                None => Err(ErrorCode::CONV_ERR),
            }
        }
    }

    impl<D: Write> ConversationHandler for PasswordConversation<D> {
        fn prompt_echo_on(&mut self, prompt: &CStr) -> Result<CString, ErrorCode> {
            self.reply(Prompt::Credential(&prompt.to_string_lossy()))
        }

        fn prompt_echo_off(&mut self, prompt: &CStr) -> Result<CString, ErrorCode> {
            self.reply(Prompt::Credential(&prompt.to_string_lossy()))
        }

        fn text_info(&mut self, msg: &CStr) {
            self.answer(Prompt::Info(&msg.to_string_lossy()));
        }

        fn error_msg(&mut self, msg: &CStr) {
            self.answer(Prompt::Error(&msg.to_string_lossy()));
        }

        fn radio_prompt(&mut self, _prompt: &CStr) -> Result<bool, ErrorCode> {
            self.answer(Prompt::Unsupported);
            Err(ErrorCode::CONV_ERR)
        }
    }

    /// The system PAM library, through `pam-client`
    pub struct SystemPam;

    impl PamBackend for SystemPam {
        fn authenticate(
            &self,
            service: &str,
            user: &str,
            conversation: PasswordConversation,
        ) -> Result<(), PamFailure> {
            let mut context = Context::new(service, Some(user), conversation)
                .map_err(|e| anyhow!("Unable to start a PAM transaction: {}", e))?;
            context
                .authenticate(Flag::NONE)
                .map_err(|e| PamFailure::Rejected(e.to_string()))
        }
    }
}
