use std::panic::AssertUnwindSafe;

use anyhow::Result;
use futures::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::bytes::BytesMut;

use slink_proto::{
    encode::Encode,
    flow::State,
    types::{AuthRes, Identity, Verdict},
};
use slink_user::login::ArcLoginProvider;

/// Reads requests from `reader` and writes one verdict per request to `writer`.
///
/// Requests are handled strictly one after the other. Nothing a single
/// request does (malformed line, backend error, panic) stops the loop, only
/// the end of the input stream or an I/O error on the streams themselves do.
pub struct HelperLoop<R, W> {
    login: ArcLoginProvider,
    reader: R,
    writer: W,
    state: State,
    read_buf: Vec<u8>,
    write_buf: BytesMut,
}

impl<R, W> HelperLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, login: ArcLoginProvider) -> Self {
        Self {
            login,
            reader,
            writer,
            state: State::new(),
            read_buf: Vec::new(),
            write_buf: BytesMut::new(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            let bread = self.reader.read_until(b'\n', &mut self.read_buf).await?;
            let line = match (bread, self.read_buf.last()) {
                (0, _) => None,
                (_, Some(b'\n')) => Some(&self.read_buf[..]),
                _ => {
                    tracing::warn!(
                        len = self.read_buf.len(),
                        "Input ended in the middle of a line, dropping it"
                    );
                    None
                }
            };

            // Make some progress in our local state
            let provider = self.login.clone();
            let fault = provider.fault();
            let login = move |identity: Identity| async move {
                match provider.login(&identity).await {
                    Ok(grant) => AuthRes::from(grant),
                    Err(e) => {
                        tracing::info!(err=%e, "login failed");
                        AuthRes::from(e)
                    }
                }
            };
            let progress = AssertUnwindSafe(self.state.progress(line, login))
                .catch_unwind()
                .await;
            if progress.is_err() {
                tracing::error!("Request handling panicked, answering with a generic error");
                self.state = State::Responding(Verdict::Denied(fault));
            }

            if self.state.is_closed() {
                tracing::info!("Input stream closed, exiting helper loop");
                self.writer.flush().await?;
                return Ok(());
            }

            // Send the verdict right away, the proxy waits for it
            if let Some(verdict) = self.state.response() {
                tracing::trace!(verdict=?verdict, "Sent verdict");
                verdict.encode(&mut self.write_buf)?;
                self.writer.write_all(&self.write_buf).await?;
                self.writer.flush().await?;
            }
            self.state.responded();

            // Reset buffers
            self.read_buf.clear();
            self.write_buf.clear();
        }
    }
}
