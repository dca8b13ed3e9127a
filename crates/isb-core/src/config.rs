use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, rate_limit::SpamPolicy, Result};

pub const DEFAULT_ENROLL_URL: &str = "https://nn.isphera.ru/#form";

/// Typed configuration loaded from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Layout
    pub data_dir: PathBuf,
    pub pictures_dir: PathBuf,
    pub logs_dir: PathBuf,

    // Audit
    pub audit_log_json: bool,

    // Spam detection
    pub spam: SpamPolicy,
    /// Ban senders on a `Block` verdict. Off unless explicitly enabled.
    pub auto_ban_spammers: bool,

    // Behavior
    pub enroll_url: String,
    pub console_enabled: bool,
    pub initial_admins: Vec<i64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let cwd = env::current_dir()?;
        let data_dir = env_path("ISB_DATA_DIR").unwrap_or_else(|| cwd.join("Json"));
        let pictures_dir = env_path("ISB_PICTURES_DIR").unwrap_or_else(|| cwd.join("Pictures"));
        let logs_dir = env_path("ISB_LOGS_DIR").unwrap_or_else(|| cwd.join("Logs"));

        for dir in [&data_dir, &pictures_dir, &logs_dir] {
            fs::create_dir_all(dir)?;
        }

        let defaults = SpamPolicy::default();
        let spam = SpamPolicy {
            window: env_u64("SPAM_WINDOW_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.window),
            strike_window: env_u64("STRIKE_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.strike_window),
            strike_limit: env_u32("STRIKE_LIMIT").unwrap_or(defaults.strike_limit),
        };
        validate_spam_policy(&spam)?;

        Ok(Self {
            telegram_bot_token,
            data_dir,
            pictures_dir,
            logs_dir,
            audit_log_json: env_bool("AUDIT_LOG_JSON").unwrap_or(false),
            spam,
            auto_ban_spammers: env_bool("AUTO_BAN_SPAMMERS").unwrap_or(false),
            enroll_url: env_str("ENROLL_URL")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_ENROLL_URL.to_string()),
            console_enabled: env_bool("ISB_CONSOLE").unwrap_or(true),
            initial_admins: parse_csv_i64(env_str("ISB_INITIAL_ADMINS")),
        })
    }

    pub fn admins_file(&self) -> PathBuf {
        self.data_dir.join("Admins.json")
    }

    pub fn banned_file(&self) -> PathBuf {
        self.data_dir.join("BannedUsers.json")
    }
}

fn validate_spam_policy(p: &SpamPolicy) -> Result<()> {
    if p.window.is_zero() || p.strike_window.is_zero() {
        return Err(Error::Config(
            "SPAM_WINDOW_MS and STRIKE_WINDOW_SECS must be positive".to_string(),
        ));
    }
    if p.strike_limit == 0 {
        return Err(Error::Config("STRIKE_LIMIT must be at least 1".to_string()));
    }
    Ok(())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

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
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    let quoted = val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')));
    if quoted {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
