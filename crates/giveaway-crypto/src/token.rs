use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64URL};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Tokens older (or newer) than this relative to the verifier's clock are rejected.
pub const DEFAULT_MAX_AGE_SECS: i64 = 7 * 24 * 3600;

/// Intent discriminator carried by participation links.
pub const PARTICIPATE: &str = "participate";

/// The signed claim inside a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "g")]
    pub giveaway_id: i64,
    /// Unix seconds at issuance. Absent decodes as 0 and is rejected.
    #[serde(rename = "ts", default)]
    pub issued_at: i64,
    #[serde(rename = "n")]
    pub action: String,
}

impl Intent {
    pub fn participate(giveaway_id: i64, issued_at: i64) -> Self {
        Self {
            giveaway_id,
            issued_at,
            action: PARTICIPATE.to_string(),
        }
    }
}

/// Issues and verifies capability tokens under one process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
    max_age_secs: i64,
}

impl TokenCodec {
    pub fn new(secret: &[u8], max_age_secs: i64) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("Token secret must not be empty"));
        }
        if max_age_secs <= 0 {
            return Err(anyhow!("Token max age must be positive"));
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow!("Invalid token secret: {}", e))?;
        Ok(Self { mac, max_age_secs })
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    /// Encode and sign an intent.
    pub fn issue(&self, intent: &Intent) -> Result<String> {
        let body = serde_json::to_vec(intent)?;
        let payload = B64URL.encode(body);
        let signature = self.sign(payload.as_bytes());
        Ok(format!("{}.{}", payload, B64URL.encode(signature)))
    }

    /// Issue a participation token stamped with the current time.
    pub fn issue_participation(&self, giveaway_id: i64) -> Result<String> {
        self.issue(&Intent::participate(
            giveaway_id,
            chrono::Utc::now().timestamp(),
        ))
    }

    /// Verify against the current clock.
    pub fn verify(&self, token: &str) -> Option<Intent> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify against an explicit clock reading (unix seconds).
    ///
    /// Every failure collapses to `None`: callers answer tampered, malformed
    /// and expired links identically.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<Intent> {
        let (payload, signature) = token.split_once('.')?;
        let signature = B64URL.decode(signature).ok()?;

        // verify_slice compares in constant time
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let body = B64URL.decode(payload).ok()?;
        let intent: Intent = serde_json::from_slice(&body).ok()?;

        if intent.issued_at <= 0 {
            return None;
        }
        let age = now.checked_sub(intent.issued_at)?.checked_abs()?;
        if age > self.max_age_secs {
            return None;
        }
        Some(intent)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
