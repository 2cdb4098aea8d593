//! One reminder run: fetch, aggregate, decide, notify, persist.

use crate::config::Config;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::forecast::{ForecastSource, NwsClient};
use crate::humidity;
use crate::notify::{MailgunClient, Message, Notifier};
use crate::state::{PersistedState, StateStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Aggregating,
    Deciding,
    Notifying,
    Persisting,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Aggregating => "aggregating",
            Stage::Deciding => "deciding",
            Stage::Notifying => "notifying",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Settings / outcome
// ---------------------------------------------------------------------------

/// The slice of configuration a run needs.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub latitude: f64,
    pub longitude: f64,
    pub night_periods: usize,
    pub from: String,
    pub to: String,
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            latitude: config.latitude,
            longitude: config.longitude,
            night_periods: config.night_periods,
            from: config.mailgun.from.clone(),
            to: config.mailgun.to.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub recommendation: i32,
    pub previous: Option<i32>,
    pub median_low_f: f64,
    pub lows_f: Vec<f64>,
    pub notified: bool,
    pub ran_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reminder
// ---------------------------------------------------------------------------

pub struct Reminder<F, N> {
    source: F,
    notifier: N,
    store: StateStore,
    settings: RunSettings,
}

impl Reminder<NwsClient, MailgunClient> {
    /// Wire the weather.gov and Mailgun clients from a validated config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = NwsClient::new(
            &config.weather.base_url,
            &config.weather.user_agent,
            config.weather.timeout,
        )?;
        let notifier = MailgunClient::new(
            &config.mailgun.base_url,
            &config.mailgun.domain,
            &config.mailgun.api_key,
            config.weather.timeout,
        )?;
        let store = StateStore::open(&config.state_dir)?;
        Ok(Self::new(source, notifier, store, RunSettings::from(config)))
    }
}

impl<F: ForecastSource, N: Notifier> Reminder<F, N> {
    pub fn new(source: F, notifier: N, store: StateStore, settings: RunSettings) -> Self {
        Self {
            source,
            notifier,
            store,
            settings,
        }
    }

    /// Execute one run. On any error nothing is persisted, so the next run
    /// starts again from the previous state.
    pub fn run(&self, deadline: &Deadline) -> Result<RunOutcome> {
        enter(Stage::Fetching);
        deadline.check(Stage::Fetching)?;
        let periods = self.source.forecast_periods(
            self.settings.latitude,
            self.settings.longitude,
            deadline,
        )?;

        enter(Stage::Aggregating);
        let lows = humidity::select_nighttime_lows(&periods, self.settings.night_periods)?;
        let median_low = humidity::median(&lows);
        let recommendation =
            humidity::round_down_to_nearest_five(humidity::recommend(median_low));

        enter(Stage::Deciding);
        let prior = self.store.load()?;
        let previous = prior.last_recommendation;
        let changed = previous != Some(recommendation);

        if changed {
            tracing::info!(
                recommendation,
                ?previous,
                median_low_f = median_low,
                "humidity recommendation changed to {recommendation}% (median overnight low {median_low:.1}°F)"
            );
            enter(Stage::Notifying);
            let message =
                compose_message(&self.settings, recommendation, median_low, &lows, previous);
            self.notifier.send(&message, deadline)?;
        } else {
            tracing::info!(
                recommendation,
                "humidity recommendation unchanged at {recommendation}%"
            );
        }

        // A completed send is always recorded, deadline or not.
        enter(Stage::Persisting);
        let ran_at = Utc::now();
        self.store.save(&PersistedState::new(recommendation, ran_at))?;

        enter(Stage::Done);
        Ok(RunOutcome {
            recommendation,
            previous,
            median_low_f: median_low,
            lows_f: lows,
            notified: changed,
            ran_at,
        })
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "run stage");
}

// ---------------------------------------------------------------------------
// Message composition
// ---------------------------------------------------------------------------

pub fn compose_message(
    settings: &RunSettings,
    recommendation: i32,
    median_low: f64,
    lows: &[f64],
    previous: Option<i32>,
) -> Message {
    Message {
        from: settings.from.clone(),
        to: settings.to.clone(),
        subject: format!("Indoor Humidity Update: {recommendation}%"),
        body: email_body(recommendation, median_low, lows, previous),
    }
}

pub fn email_body(
    recommendation: i32,
    median_low: f64,
    lows: &[f64],
    previous: Option<i32>,
) -> String {
    let mut body = format!("The recommended indoor humidity is now {recommendation}%.\n\n");
    body.push_str(&format!(
        "Median overnight low for the next {} nights: {median_low:.1}°F.\n",
        lows.len()
    ));
    body.push_str(&format!("Forecast overnight lows: {}.\n", format_lows(lows)));
    match previous {
        Some(p) => body.push_str(&format!("Previous recommendation: {p}%.\n")),
        None => body.push_str("This is the first stored recommendation.\n"),
    }
    body.push_str("\nThis message was generated automatically by humidity-reminder.\n");
    body
}

fn format_lows(lows: &[f64]) -> String {
    lows.iter()
        .map(|low| format!("{:.0}°F", low.round()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HumidityError;
    use crate::forecast::ForecastPeriod;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::TempDir;

    // -- fakes ----------------------------------------------------------------

    struct FixedForecast(Vec<ForecastPeriod>);

    impl ForecastSource for FixedForecast {
        fn forecast_periods(&self, _: f64, _: f64, _: &Deadline) -> Result<Vec<ForecastPeriod>> {
            Ok(self.0.clone())
        }
    }

    struct FailingForecast;

    impl ForecastSource for FailingForecast {
        fn forecast_periods(&self, _: f64, _: f64, _: &Deadline) -> Result<Vec<ForecastPeriod>> {
            Err(HumidityError::Gateway(
                "points request failed: 503 Service Unavailable".into(),
            ))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<Message>>,
        fail: bool,
    }

    impl Notifier for &RecordingNotifier {
        fn send(&self, message: &Message, _: &Deadline) -> Result<()> {
            if self.fail {
                return Err(HumidityError::NotifierRejected {
                    status: "401 Unauthorized".into(),
                    body: "Forbidden".into(),
                });
            }
            self.sent.borrow_mut().push(message.clone());
            Ok(())
        }
    }

    // -- helpers --------------------------------------------------------------

    fn nights(temps: &[i32]) -> Vec<ForecastPeriod> {
        let start = chrono::DateTime::parse_from_rfc3339("2024-11-18T18:00:00-05:00").unwrap();
        temps
            .iter()
            .enumerate()
            .flat_map(|(i, &t)| {
                [
                    ForecastPeriod {
                        name: format!("Day {i}"),
                        start,
                        is_night: false,
                        temperature: t + 12,
                        unit: "F".into(),
                    },
                    ForecastPeriod {
                        name: format!("Night {i}"),
                        start,
                        is_night: true,
                        temperature: t,
                        unit: "F".into(),
                    },
                ]
            })
            .collect()
    }

    fn settings() -> RunSettings {
        RunSettings {
            latitude: 42.28,
            longitude: -83.74,
            night_periods: 7,
            from: "bot@mg.example.com".into(),
            to: "me@example.com".into(),
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(30))
    }

    // median of these is 28°F -> 30%
    const COLD_WEEK: [i32; 7] = [30, 25, 28, 31, 22, 27, 29];

    // -- scenarios ------------------------------------------------------------

    #[test]
    fn first_run_notifies_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let notifier = RecordingNotifier::default();
        let reminder = Reminder::new(
            FixedForecast(nights(&COLD_WEEK)),
            &notifier,
            store.clone(),
            settings(),
        );

        let before = Utc::now();
        let outcome = reminder.run(&deadline()).unwrap();

        assert_eq!(outcome.recommendation, 30);
        assert_eq!(outcome.median_low_f, 28.0);
        assert!(outcome.notified);
        assert_eq!(outcome.previous, None);

        let sent = notifier.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Indoor Humidity Update: 30%");
        assert_eq!(sent[0].to, "me@example.com");
        assert!(sent[0].body.contains("30%"));
        assert!(sent[0].body.contains("first stored recommendation"));

        let saved = store.load().unwrap();
        assert_eq!(saved.last_recommendation, Some(30));
        assert!(saved.last_run.unwrap() >= before);
    }

    #[test]
    fn unchanged_recommendation_skips_mail_but_touches_state() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 11, 17, 23, 0, 0).unwrap();
        store.save(&PersistedState::new(30, earlier)).unwrap();

        let notifier = RecordingNotifier::default();
        let reminder = Reminder::new(
            FixedForecast(nights(&COLD_WEEK)),
            &notifier,
            store.clone(),
            settings(),
        );
        let outcome = reminder.run(&deadline()).unwrap();

        assert!(!outcome.notified);
        assert!(notifier.sent.borrow().is_empty());
        let saved = store.load().unwrap();
        assert_eq!(saved.last_recommendation, Some(30));
        assert!(saved.last_run.unwrap() > earlier);
    }

    #[test]
    fn changed_recommendation_mentions_previous_value() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        store.save(&PersistedState::new(40, Utc::now())).unwrap();

        let notifier = RecordingNotifier::default();
        let reminder = Reminder::new(
            FixedForecast(nights(&COLD_WEEK)),
            &notifier,
            store.clone(),
            settings(),
        );
        let outcome = reminder.run(&deadline()).unwrap();

        assert_eq!(outcome.previous, Some(40));
        let sent = notifier.sent.borrow();
        assert!(sent[0].body.contains("Previous recommendation: 40%."));
        assert_eq!(store.load().unwrap().last_recommendation, Some(30));
    }

    #[test]
    fn failed_notification_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap();
        store.save(&PersistedState::new(45, earlier)).unwrap();
        let snapshot = std::fs::read(store.path()).unwrap();

        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let reminder = Reminder::new(
            FixedForecast(nights(&COLD_WEEK)),
            &notifier,
            store.clone(),
            settings(),
        );
        let err = reminder.run(&deadline()).unwrap_err();

        assert!(matches!(err, HumidityError::NotifierRejected { .. }));
        assert_eq!(std::fs::read(store.path()).unwrap(), snapshot);
    }

    #[test]
    fn gateway_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let notifier = RecordingNotifier::default();
        let reminder = Reminder::new(FailingForecast, &notifier, store.clone(), settings());

        let err = reminder.run(&deadline()).unwrap_err();
        assert!(matches!(err, HumidityError::Gateway(_)));
        assert!(!store.path().exists());
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn too_few_nights_fails_before_deciding() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let notifier = RecordingNotifier::default();
        let reminder = Reminder::new(
            FixedForecast(nights(&[30, 25, 28])),
            &notifier,
            store.clone(),
            settings(),
        );

        let err = reminder.run(&deadline()).unwrap_err();
        assert!(matches!(
            err,
            HumidityError::InsufficientData {
                found: 3,
                required: 7
            }
        ));
        assert!(!store.path().exists());
    }

    struct SlowNotifier;

    impl Notifier for SlowNotifier {
        fn send(&self, _: &Message, deadline: &Deadline) -> Result<()> {
            while !deadline.is_expired() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }
    }

    #[test]
    fn deadline_passing_after_send_still_saves_state() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let reminder = Reminder::new(
            FixedForecast(nights(&COLD_WEEK)),
            SlowNotifier,
            store.clone(),
            settings(),
        );

        let deadline = Deadline::after(Duration::from_millis(50));
        let outcome = reminder.run(&deadline).unwrap();

        assert!(deadline.is_expired());
        assert!(outcome.notified);
        assert_eq!(store.load().unwrap().last_recommendation, Some(30));
    }

    #[test]
    fn expired_deadline_fails_without_persisting() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let notifier = RecordingNotifier::default();
        let reminder = Reminder::new(
            FixedForecast(nights(&COLD_WEEK)),
            &notifier,
            store.clone(),
            settings(),
        );

        let err = reminder.run(&Deadline::after(Duration::ZERO)).unwrap_err();
        assert!(matches!(
            err,
            HumidityError::DeadlineExceeded {
                stage: Stage::Fetching
            }
        ));
        assert!(!store.path().exists());
    }

    // -- message --------------------------------------------------------------

    #[test]
    fn body_lists_rounded_lows_and_median() {
        let body = email_body(30, 27.5, &[27.4, 27.6, 32.0, 14.0], None);
        assert_eq!(
            body,
            "The recommended indoor humidity is now 30%.\n\n\
             Median overnight low for the next 4 nights: 27.5°F.\n\
             Forecast overnight lows: 27°F, 28°F, 32°F, 14°F.\n\
             This is the first stored recommendation.\n\
             \nThis message was generated automatically by humidity-reminder.\n"
        );
    }

    #[test]
    fn body_with_previous_recommendation() {
        let body = email_body(35, 33.0, &[33.0], Some(40));
        assert!(body.contains("Previous recommendation: 40%.\n"));
        assert!(!body.contains("first stored"));
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Persisting.to_string(), "persisting");
        assert_eq!(
            HumidityError::DeadlineExceeded {
                stage: Stage::Notifying
            }
            .to_string(),
            "run deadline exceeded while notifying"
        );
    }
}
