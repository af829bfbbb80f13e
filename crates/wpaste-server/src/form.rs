//! `application/x-www-form-urlencoded` bodies for create and edit.
//!
//! The payload field `f` is decoded to its exact bytes, so binary payloads
//! survive the round trip. The other fields are text.

use axum::http::{header, HeaderMap};
use percent_encoding::percent_decode;

use crate::error::{ServerError, ServerResult};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fields of a create or edit form.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PasteForm {
    pub f: Option<Vec<u8>>,
    pub name: Option<String>,
    pub e: Option<String>,
    pub ap: Option<String>,
    pub ep: Option<String>,
}

impl PasteForm {
    /// Check the content type, then parse `body`.
    pub fn from_request(headers: &HeaderMap, body: &[u8]) -> ServerResult<Self> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
            return Err(ServerError::UnsupportedMediaType(content_type.to_string()));
        }
        Ok(Self::parse(body))
    }

    /// Parse a urlencoded body. The first occurrence of a field wins and
    /// unknown fields are ignored.
    pub fn parse(body: &[u8]) -> Self {
        let mut form = Self::default();
        for pair in body.split(|&b| b == b'&').filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.iter().position(|&b| b == b'=') {
                Some(at) => (&pair[..at], &pair[at + 1..]),
                None => (pair, &pair[pair.len()..]),
            };
            let value = decode(value);
            match decode(key).as_slice() {
                b"f" => {
                    form.f.get_or_insert(value);
                }
                b"name" => {
                    form.name.get_or_insert_with(|| text(&value));
                }
                b"e" => {
                    form.e.get_or_insert_with(|| text(&value));
                }
                b"ap" => {
                    form.ap.get_or_insert_with(|| text(&value));
                }
                b"ep" => {
                    form.ep.get_or_insert_with(|| text(&value));
                }
                _ => {}
            }
        }
        form
    }
}

/// `+` is a space, then `%XX` escapes become raw bytes.
fn decode(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
