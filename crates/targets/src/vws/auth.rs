//! VWS request signing
//!
//! Every request carries an `authorization: VWS <access_key>:<signature>`
//! header. The signature is an HMAC-SHA1 over a canonical string built from
//! the method, a Content-MD5 of the exact body bytes, the content type, the
//! RFC1123 date header value, and the request path. The server recomputes
//! the same value independently; any byte difference rejects the request.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::config::VwsCredentials;

type HmacSha1 = Hmac<Sha1>;

/// Render a timestamp in the RFC1123 form VWS expects in the `date` header,
/// e.g. `Sun, 07 May 2023 12:00:00 GMT`.
///
/// The rendered string must be sent as the `date` header AND used inside the
/// signed string; pass the same value to both places.
pub fn rfc1123_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Compute the authorization header value for a request.
///
/// Pure given its inputs: timestamp generation is the caller's
/// responsibility, so the signer can be tested against fixed vectors.
/// `content_type` is the empty string for requests with no body.
pub fn sign_request(
    method: &str,
    path: &str,
    content_type: &str,
    body: &[u8],
    credentials: &VwsCredentials,
    date: &str,
) -> String {
    let content_md5 = hex::encode(Md5::digest(body));
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}\n{}",
        method, content_md5, content_type, date, path
    );

    let mut mac = HmacSha1::new_from_slice(credentials.secret_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

    format!("VWS {}:{}", credentials.access_key, signature)
}
