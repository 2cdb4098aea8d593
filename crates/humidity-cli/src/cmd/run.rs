use crate::output::print_json;
use anyhow::Context;
use humidity_core::{config::Config, deadline::Deadline, run::Reminder};
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;
    // Covers client setup as well as the run itself.
    let deadline = Deadline::after(config.run_timeout);
    let reminder = Reminder::from_config(&config).context("failed to set up run")?;
    let outcome = reminder.run(&deadline).context("run failed")?;

    if json {
        return print_json(&outcome);
    }

    if outcome.notified {
        println!(
            "Recommended indoor humidity: {}% (median overnight low {:.1}°F). Notified {}.",
            outcome.recommendation, outcome.median_low_f, config.mailgun.to
        );
    } else {
        println!(
            "Recommended indoor humidity unchanged at {}% (median overnight low {:.1}°F).",
            outcome.recommendation, outcome.median_low_f
        );
    }
    Ok(())
}
