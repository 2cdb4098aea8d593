use crate::output::{print_fields, print_json};
use anyhow::Context;
use humidity_core::config::{format_duration, Config};
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("invalid config")?;
    let shown = config.redacted();

    if json {
        return print_json(&shown);
    }

    println!("Config OK: {}", config_path.display());
    println!();
    print_fields(&[
        (
            "Location",
            format!("{:.4}, {:.4}", shown.latitude, shown.longitude),
        ),
        ("Night periods", shown.night_periods.to_string()),
        ("Run timeout", format_duration(shown.run_timeout)),
        ("Request timeout", format_duration(shown.weather.timeout)),
        ("Forecast API", shown.weather.base_url.clone()),
        ("User-Agent", shown.weather.user_agent.clone()),
        ("Mailgun domain", shown.mailgun.domain.clone()),
        ("Mailgun API key", shown.mailgun.api_key.clone()),
        ("From", shown.mailgun.from.clone()),
        ("To", shown.mailgun.to.clone()),
        ("State dir", shown.state_dir.display().to_string()),
    ]);
    Ok(())
}
