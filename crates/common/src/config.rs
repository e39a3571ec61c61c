use crate::{Error, Result};

/// Process-level settings loaded from environment variables at startup.
///
/// Trading parameters live in the TOML bot file pointed to by
/// `bot_config_path`; this struct only carries what is needed to find that
/// file and to stand up the paper broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Bot config file path
    pub bot_config_path: String,

    // Paper broker
    pub paper_feed_path: String,
    pub paper_spread_points: f64,
    pub paper_point: f64,
    pub paper_digits: u32,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Separated from `from_env` so the
    /// parsing rules can be exercised without touching process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let paper_point: f64 = parse_or(&lookup, "PAPER_POINT", 0.01)?;
        if paper_point <= 0.0 {
            return Err(Error::Config(format!(
                "PAPER_POINT must be positive, got {paper_point}"
            )));
        }

        Ok(Config {
            bot_config_path: lookup("BOT_CONFIG_PATH")
                .unwrap_or_else(|| "config/bot.toml".to_string()),
            paper_feed_path: required(&lookup, "PAPER_FEED_PATH")?,
            paper_spread_points: parse_or(&lookup, "PAPER_SPREAD_POINTS", 2.0)?,
            paper_point,
            paper_digits: parse_or(&lookup, "PAPER_DIGITS", 2)?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let cfg = Config::from_lookup(lookup_from(&[("PAPER_FEED_PATH", "data/bars.json")])).unwrap();
        assert_eq!(cfg.bot_config_path, "config/bot.toml");
        assert_eq!(cfg.paper_feed_path, "data/bars.json");
        assert_eq!(cfg.paper_spread_points, 2.0);
        assert_eq!(cfg.paper_point, 0.01);
        assert_eq!(cfg.paper_digits, 2);
    }

    #[test]
    fn missing_feed_path_is_a_config_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("PAPER_FEED_PATH")));
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("PAPER_FEED_PATH", "bars.json"),
            ("PAPER_SPREAD_POINTS", "wide"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn non_positive_point_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("PAPER_FEED_PATH", "bars.json"),
            ("PAPER_POINT", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
