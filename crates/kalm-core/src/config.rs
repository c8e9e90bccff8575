use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    ingestion::{PollSettings, UpdateMode},
    Result,
};

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub update_mode: UpdateMode,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub poll_timeout: Duration,
    pub poll_retry_delay: Duration,

    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,

    // ElevenLabs
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_model: String,

    // HTTP
    pub http_bind: SocketAddr,
    pub request_timeout: Duration,

    // Bot behavior
    pub voice_store_path: PathBuf,
    pub live_call_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let openai_api_key = required("OPENAI_API_KEY")?;
        let elevenlabs_api_key = required("ELEVENLABS_API_KEY")?;

        let update_mode = match env_str("UPDATE_MODE").and_then(non_empty) {
            None => UpdateMode::Polling,
            Some(raw) => UpdateMode::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "UPDATE_MODE must be 'polling' or 'webhook', got '{raw}'"
                ))
            })?,
        };
        let webhook_url = env_str("WEBHOOK_URL").and_then(non_empty);
        if update_mode == UpdateMode::Webhook && webhook_url.is_none() {
            return Err(Error::Config(
                "WEBHOOK_URL is required when UPDATE_MODE=webhook".to_string(),
            ));
        }
        let webhook_secret = env_str("WEBHOOK_SECRET").and_then(non_empty);

        let poll_timeout = Duration::from_secs(env_u64("POLL_TIMEOUT_SECS").unwrap_or(30));
        let poll_retry_delay = Duration::from_secs(env_u64("POLL_RETRY_SECS").unwrap_or(5));

        let openai_model = env_str("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        // Rachel: calm, supportive default voice.
        let elevenlabs_voice_id = env_str("ELEVENLABS_VOICE_ID")
            .and_then(non_empty)
            .unwrap_or_else(|| "21m00Tcm4TlvDq8ikWAM".to_string());
        let elevenlabs_model = env_str("ELEVENLABS_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "eleven_multilingual_v2".to_string());

        let http_bind_raw = env_str("HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let http_bind = http_bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("HTTP_BIND '{http_bind_raw}' is invalid: {e}")))?;
        let request_timeout =
            Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS").unwrap_or(30).max(1));

        let voice_store_path = env_path("VOICE_STORE_PATH")
            .unwrap_or_else(|| PathBuf::from("/tmp/kalm-voices.json"));
        let live_call_url = env_str("LIVE_CALL_URL").and_then(non_empty);

        Ok(Self {
            telegram_bot_token,
            update_mode,
            webhook_url,
            webhook_secret,
            poll_timeout,
            poll_retry_delay,
            openai_api_key,
            openai_model,
            elevenlabs_api_key,
            elevenlabs_voice_id,
            elevenlabs_model,
            http_bind,
            request_timeout,
            voice_store_path,
            live_call_url,
        })
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            wait: self.poll_timeout,
            retry_delay: self.poll_retry_delay,
        }
    }
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
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

        let line = line.strip_prefix("export ").unwrap_or(line);
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

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
