use anyhow::Result;
use tokio_util::bytes::{BufMut, BytesMut};

use super::types::*;

pub trait Encode {
    fn encode(&self, out: &mut BytesMut) -> Result<()>;
}

fn sp_enc(out: &mut BytesMut) {
    out.put(&[0x20][..])
}

fn lf_enc(out: &mut BytesMut) {
    out.put(&[0x0A][..])
}

/// Write free text (usernames, backend reasons) so that it can never
/// break the one-verdict-per-line framing: CR and LF become spaces.
fn text_enc(out: &mut BytesMut, text: &str) {
    for b in text.bytes() {
        match b {
            b'\r' | b'\n' => out.put_u8(b' '),
            _ => out.put_u8(b),
        }
    }
}

impl Encode for NextHop {
    fn encode(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Self::Any => out.put(&b"!"[..]),
            Self::Unrouted => out.put(&b"none"[..]),
            Self::Address(addr) => text_enc(out, addr),
        }
        Ok(())
    }
}

impl Encode for FailReason {
    fn encode(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Self::UnknownServer => out.put(&b"Unknown server"[..]),
            Self::BadPassword => out.put(&b"Authentication failure (bad password)"[..]),
            Self::NoSuchUser => out.put(&b"Authentication failure (no such user)"[..]),
            Self::Fatal => out.put(&b"Fatal error"[..]),
            Self::Internal => out.put(&b"Internal error"[..]),
            Self::InvalidArguments => out.put(&b"Invalid number of argument"[..]),
            Self::Backend(reason) => text_enc(out, reason.trim_end()),
        }
        Ok(())
    }
}

impl Encode for Verdict {
    fn encode(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Self::Anonymous => {
                out.put(&b"OK ! none"[..]);
                lf_enc(out);
            }
            Self::Granted { next_hop, user } => {
                out.put(&b"OK"[..]);
                sp_enc(out);
                next_hop.encode(out)?;
                sp_enc(out);
                out.put(&b"username"[..]);
                sp_enc(out);
                text_enc(out, user);
                lf_enc(out);
            }
            Self::Denied(reason) => {
                out.put(&b"ERR"[..]);
                sp_enc(out);
                reason.encode(out)?;
                lf_enc(out);
            }
        }
        Ok(())
    }
}
