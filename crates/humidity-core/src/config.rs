use crate::error::{HumidityError, Result};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d+(?:ms|s|m|h))+$").expect("valid regex"))
}

fn duration_part_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)(ms|s|m|h)").expect("valid regex"))
}

/// Parse a compact duration such as `10s`, `500ms` or `1m30s`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if !duration_regex().is_match(raw) {
        return Err(HumidityError::Config(format!(
            "invalid duration '{raw}': expected e.g. 10s, 500ms, 1m30s"
        )));
    }
    let mut total = Duration::ZERO;
    for caps in duration_part_regex().captures_iter(raw) {
        let n: u64 = caps[1]
            .parse()
            .map_err(|_| HumidityError::Config(format!("duration '{raw}' is out of range")))?;
        let part = match &caps[2] {
            "ms" => Duration::from_millis(n),
            "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(n.saturating_mul(60)),
            _ => Duration::from_secs(n.saturating_mul(3600)),
        };
        total = total.saturating_add(part);
    }
    Ok(total)
}

/// Render a duration in the same compact form `parse_duration` accepts.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms != 0 && ms % 3_600_000 == 0 {
        format!("{}h", ms / 3_600_000)
    } else if ms != 0 && ms % 60_000 == 0 {
        format!("{}m", ms / 60_000)
    } else if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

fn de_duration<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    let raw = String::deserialize(d)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn ser_duration<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_duration(*d))
}

// ---------------------------------------------------------------------------
// WeatherConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub user_agent: String,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "de_duration",
        serialize_with = "ser_duration"
    )]
    pub timeout: Duration,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_weather_base_url() -> String {
    paths::DEFAULT_WEATHER_BASE_URL.to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            timeout: default_request_timeout(),
            base_url: default_weather_base_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// MailgunConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailgunConfig {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_mailgun_base_url")]
    pub base_url: String,
}

fn default_mailgun_base_url() -> String {
    paths::DEFAULT_MAILGUN_BASE_URL.to_string()
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_night_periods")]
    pub night_periods: usize,
    #[serde(
        default = "default_run_timeout",
        deserialize_with = "de_duration",
        serialize_with = "ser_duration"
    )]
    pub run_timeout: Duration,
    #[serde(default)]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub mailgun: MailgunConfig,
}

/// Upper bound for every configured timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

fn default_night_periods() -> usize {
    7
}

fn default_run_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Config {
    /// Read, parse and validate the YAML config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            HumidityError::Config(format!("read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(data)?;
        config.validate_and_normalize()?;
        Ok(config)
    }

    fn validate_and_normalize(&mut self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(invalid("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(invalid("longitude must be between -180 and 180"));
        }
        if self.night_periods == 0 {
            return Err(invalid("night_periods must be at least 1"));
        }
        if self.run_timeout.is_zero() {
            return Err(invalid("run_timeout must be positive"));
        }
        if self.run_timeout > MAX_TIMEOUT {
            return Err(invalid("run_timeout must be at most 24h"));
        }
        if self.weather.user_agent.trim().is_empty() {
            return Err(invalid("weather.user_agent is required"));
        }
        if self.weather.timeout.is_zero() {
            return Err(invalid("weather.timeout must be positive"));
        }
        if self.weather.timeout > MAX_TIMEOUT {
            return Err(invalid("weather.timeout must be at most 24h"));
        }
        for (key, value) in [
            ("mailgun.domain", &self.mailgun.domain),
            ("mailgun.api_key", &self.mailgun.api_key),
            ("mailgun.from", &self.mailgun.from),
            ("mailgun.to", &self.mailgun.to),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(&format!("{key} is required")));
            }
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(invalid("state_dir is required"));
        }
        self.state_dir = paths::absolutize(&self.state_dir)
            .map_err(|e| HumidityError::Config(format!("resolve state_dir: {e}")))?;
        self.weather.base_url = self.weather.base_url.trim_end_matches('/').to_string();
        self.mailgun.base_url = self.mailgun.base_url.trim_end_matches('/').to_string();
        Ok(())
    }

    /// Copy of the config that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.mailgun.api_key = "********".to_string();
        copy
    }
}

fn invalid(msg: &str) -> HumidityError {
    HumidityError::Config(msg.to_string())
}
