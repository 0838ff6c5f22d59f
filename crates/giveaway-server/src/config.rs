use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;

use giveaway_engine::ChannelRef;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub hmac_secret: String,
    pub admin_token: String,
    pub bot_token: String,
    pub platform_base_url: String,
    pub platform_timeout: Duration,
    pub mandatory_channels: Vec<ChannelRef>,
    pub membership_check_every: Duration,
    pub auto_draw_every: Duration,
    pub token_max_age_secs: i64,
    pub debounce_window: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let host = var("GIVEAWAY_HOST", "0.0.0.0");
        let port: u16 = var("GIVEAWAY_PORT", "3000")
            .parse()
            .context("GIVEAWAY_PORT is not a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("GIVEAWAY_HOST is not an IP address")?;

        let hmac_secret = secret(&get, "GIVEAWAY_HMAC_SECRET")?;
        let admin_token = secret(&get, "GIVEAWAY_ADMIN_TOKEN")?;
        let bot_token = get("GIVEAWAY_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            bail!("GIVEAWAY_BOT_TOKEN is unset");
        }

        let raw_channels = var("GIVEAWAY_MANDATORY_CHANNELS", "");
        let mandatory_channels = ChannelRef::parse_list(&raw_channels);
        let listed = raw_channels.split(',').filter(|s| !s.trim().is_empty()).count();
        if mandatory_channels.len() != listed {
            warn!(
                "Ignored {} unparseable entries in GIVEAWAY_MANDATORY_CHANNELS",
                listed - mandatory_channels.len()
            );
        }

        Ok(Self {
            addr,
            db_path: var("GIVEAWAY_DB_PATH", "giveaway.db").into(),
            hmac_secret,
            admin_token,
            bot_token,
            platform_base_url: var("GIVEAWAY_PLATFORM_BASE_URL", "https://api.telegram.org"),
            platform_timeout: Duration::from_secs(number(&get, "GIVEAWAY_PLATFORM_TIMEOUT_SECS", 10)?),
            mandatory_channels,
            membership_check_every: Duration::from_secs(
                number(&get, "GIVEAWAY_CHECK_MEMBERSHIP_EVERY_HOURS", 6)?
                    .checked_mul(3600)
                    .context("GIVEAWAY_CHECK_MEMBERSHIP_EVERY_HOURS is too large")?,
            ),
            auto_draw_every: Duration::from_secs(number(&get, "GIVEAWAY_AUTO_DRAW_SCAN_SECONDS", 30)?),
            token_max_age_secs: i64::try_from(number(
                &get,
                "GIVEAWAY_TOKEN_MAX_AGE_SECS",
                giveaway_crypto::DEFAULT_MAX_AGE_SECS as u64,
            )?)?,
            debounce_window: Duration::from_millis(number(&get, "GIVEAWAY_DEBOUNCE_MILLIS", 2000)?),
        })
    }
}

fn secret(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    let value = get(key).unwrap_or_default();
    if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        bail!("{} is unset or still a placeholder. Set it in your .env file and restart.", key);
    }
    Ok(value)
}

/// Positive integer setting with a default.
fn number(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let n: u64 = raw.trim().parse().with_context(|| format!("{} must be a number", key))?;
    if n == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("GIVEAWAY_HMAC_SECRET", "s3cr3t-hmac"),
        ("GIVEAWAY_ADMIN_TOKEN", "adm1n"),
        ("GIVEAWAY_BOT_TOKEN", "123:abc"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.db_path, PathBuf::from("giveaway.db"));
        assert_eq!(config.membership_check_every, Duration::from_secs(6 * 3600));
        assert_eq!(config.auto_draw_every, Duration::from_secs(30));
        assert_eq!(config.token_max_age_secs, 604_800);
        assert_eq!(config.debounce_window, Duration::from_millis(2000));
        assert!(config.mandatory_channels.is_empty());
    }

    #[test]
    fn placeholder_secrets_are_refused() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("GIVEAWAY_HMAC_SECRET", "dev-secret-change-me");
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
        assert!(Config::from_lookup(lookup(&REQUIRED[1..])).is_err());
    }

    #[test]
    fn mandatory_channels_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GIVEAWAY_MANDATORY_CHANNELS", "@news, https://t.me/club, -1009, junk"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.mandatory_channels,
            vec![
                ChannelRef::Username("news".into()),
                ChannelRef::Username("club".into()),
                ChannelRef::Id(-1009),
            ]
        );
    }

    #[test]
    fn zero_intervals_are_refused() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GIVEAWAY_AUTO_DRAW_SCAN_SECONDS", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn oversized_check_interval_is_refused() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GIVEAWAY_CHECK_MEMBERSHIP_EVERY_HOURS", "18446744073709551615"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
