use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1, take_while_m_n},
    combinator::map,
    multi::fold_many0,
    sequence::preceded,
    IResult,
};

use super::types::*;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{0} is not valid UTF-8 once percent-decoded")]
    NotUtf8(&'static str),
}

/// Dispatch a raw line on its arity and mode keyword.
///
/// Returns `None` when the line has neither the `none` nor the `username`
/// shape; the caller answers with `ERR Invalid number of argument`.
pub fn request(line: &[u8]) -> Option<Request> {
    match fields(line).as_slice() {
        [channel, b"none"] => Some(Request::None {
            channel: channel.to_vec(),
        }),
        [channel, b"username", user, password] => Some(Request::Username {
            channel: channel.to_vec(),
            identity: Identity {
                user: user.to_vec(),
                password: password.to_vec(),
            },
        }),
        _ => None,
    }
}

/// Split a line on single spaces, after removing its terminator.
///
/// Consecutive spaces yield empty fields, they are not merged.
pub fn fields(line: &[u8]) -> Vec<&[u8]> {
    strip_terminator(line).split(|c| *c == b' ').collect()
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

// -----------------------------------------------------------------
//
// PERCENT DECODING
//
// -----------------------------------------------------------------

enum Piece<'a> {
    Byte(u8),
    Raw(&'a [u8]),
}

fn is_hex_digit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

fn escape(input: &[u8]) -> IResult<&[u8], u8> {
    preceded(
        tag(b"%"),
        map(take_while_m_n(2, 2, is_hex_digit), |h: &[u8]| {
            hex_value(h[0]) << 4 | hex_value(h[1])
        }),
    )(input)
}

fn piece(input: &[u8]) -> IResult<&[u8], Piece> {
    alt((
        map(escape, Piece::Byte),
        map(take_while1(|c: u8| c != b'%'), Piece::Raw),
        // a lone '%' or one not followed by two hex digits stays as is
        map(tag(b"%"), Piece::Raw),
    ))(input)
}

/// Replace every `%XX` escape with the byte it stands for.
///
/// Never fails: anything that is not a well-formed escape is copied through.
/// Decoded bytes (NUL included) are plain data.
pub fn percent_decode(input: &[u8]) -> Vec<u8> {
    let decoded = fold_many0(
        piece,
        || Vec::with_capacity(input.len()),
        |mut out, p| {
            match p {
                Piece::Byte(b) => out.push(b),
                Piece::Raw(raw) => out.extend_from_slice(raw),
            }
            out
        },
    )(input);

    match decoded {
        Ok((_, out)) => out,
        Err(_) => input.to_vec(),
    }
}

fn percent_decode_str(input: &[u8], what: &'static str) -> Result<String, DecodeError> {
    String::from_utf8(percent_decode(input)).map_err(|_| DecodeError::NotUtf8(what))
}

impl Identity {
    /// Percent-decoded `(user, password)`
    pub fn decoded(&self) -> Result<(String, String), DecodeError> {
        Ok((
            percent_decode_str(&self.user, "identity")?,
            percent_decode_str(&self.password, "password")?,
        ))
    }
}
