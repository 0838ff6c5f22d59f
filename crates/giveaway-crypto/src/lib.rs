/// Giveaway Crypto Library
///
/// Signed capability tokens: a participation link carries everything needed
/// to authorize one entry, so no server-side session is consulted to accept it.
///
/// Wire format: `base64url(json) "." base64url(hmac_sha256(base64url(json)))`.
pub mod token;

pub use token::{DEFAULT_MAX_AGE_SECS, Intent, PARTICIPATE, TokenCodec};
