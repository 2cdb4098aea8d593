use crate::output::{print_fields, print_json};
use anyhow::Context;
use humidity_core::{config::Config, state::StateStore};
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;
    let store = StateStore::open(&config.state_dir).context("failed to open state store")?;
    let state = store.load().context("failed to load state")?;

    if json {
        #[derive(serde::Serialize)]
        struct StateOutput<'a> {
            path: &'a Path,
            #[serde(flatten)]
            state: &'a humidity_core::state::PersistedState,
        }

        return print_json(&StateOutput {
            path: store.path(),
            state: &state,
        });
    }

    print_fields(&[
        ("State file", store.path().display().to_string()),
        (
            "Last recommendation",
            state
                .last_recommendation
                .map(|r| format!("{r}%"))
                .unwrap_or_else(|| "none".to_string()),
        ),
        (
            "Last run",
            state
                .last_run
                .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                .unwrap_or_else(|| "never".to_string()),
        ),
    ]);
    Ok(())
}
