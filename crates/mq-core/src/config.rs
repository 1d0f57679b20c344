use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    cache::{DEFAULT_MEMBERS_TTL, MAX_TTL},
    errors::Error,
    formatting::DEFAULT_INLINE_RESULTS_LIMIT,
    Result,
};

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub telegram_allowed_users: Vec<i64>,

    // Queries
    pub members_cache_ttl: Duration,
    pub query_timeout: Duration,
    pub inline_results_limit: usize,

    // Observed members
    pub roster_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let telegram_allowed_users = parse_csv_i64(env_str("TELEGRAM_ALLOWED_USERS"));

        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        if telegram_allowed_users.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ALLOWED_USERS environment variable is required".to_string(),
            ));
        }

        let members_cache_ttl = parse_cache_ttl(env_u64("MEMBERS_CACHE_TTL"))?;
        let query_timeout = Duration::from_millis(env_u64("QUERY_TIMEOUT_MS").unwrap_or(60_000));
        let inline_results_limit =
            env_usize("INLINE_RESULTS_LIMIT").unwrap_or(DEFAULT_INLINE_RESULTS_LIMIT);

        let roster_file =
            PathBuf::from(env_str("ROSTER_FILE").unwrap_or("/tmp/mq-roster.json".to_string()));

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            members_cache_ttl,
            query_timeout,
            inline_results_limit,
            roster_file,
        })
    }
}

fn parse_cache_ttl(secs: Option<u64>) -> Result<Duration> {
    let Some(secs) = secs else {
        return Ok(DEFAULT_MEMBERS_TTL);
    };
    let ttl = Duration::from_secs(secs);
    if ttl > MAX_TTL {
        return Err(Error::Config(format!(
            "MEMBERS_CACHE_TTL must be at most {} seconds",
            MAX_TTL.as_secs()
        )));
    }
    Ok(ttl)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
