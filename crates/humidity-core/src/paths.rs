use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

pub const STATE_FILE: &str = "state.json";

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_MAILGUN_BASE_URL: &str = "https://api.mailgun.net/v3";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE)
}

/// Resolve `path` against the current directory unless it is already absolute.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
