use cadence::{CountedExt, MetricResult, NopMetricSink, StatsdClient, Timed, UdpMetricSink};
use sentry::ClientInitGuard;
use sentry_tracing::EventFilter;
use std::borrow::Cow;
use std::net::UdpSocket;
use std::time::Duration;
use strum_macros::Display as EnumToString;
use tracing::subscriber::set_global_default;
use tracing_actix_web_mozlog::{JsonStorageLayer, MozLogFormatLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::settings::Settings;

pub const SERVICE_NAME: &str = "kickpoints-admin";

#[derive(Debug, EnumToString, PartialEq, Eq)]
#[strum(serialize_all = "kebab_case")]
pub enum LogKey {
    ConnectionClose,
    FillExpiresAt,
    FillExpiresAtCommitted,
    FillExpiresAtExcluded,
    FillExpiresAtFailed,
    FillExpiresAtRolledBack,
    StatsDError,
    Test, // For test cases
}

/// Creates a tracing subscriber and sets it as the global default.
pub fn init_tracing<Sink>(service_name: &str, log_level: &str, sink: Sink)
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // Filter out any events that are below `log_level`.
    let env_filter = EnvFilter::new(log_level);

    // Only ERROR events go to Sentry. The EnvFilter above governs the log
    // output itself.
    let sentry_layer = sentry_tracing::layer().event_filter(|md| match md.level() {
        &tracing::Level::ERROR => EventFilter::Event,
        _ => EventFilter::Ignore,
    });

    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(MozLogFormatLayer::new(service_name, sink))
        .with(sentry_layer);

    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}

/// An empty `sentry_dsn` yields a disabled client.
pub fn init_sentry(settings: &Settings) -> ClientInitGuard {
    sentry::init((
        settings.sentry_dsn.clone(),
        sentry::ClientOptions {
            environment: Some(Cow::from(settings.environment.clone())),
            // Suppress breadcrumbs.
            max_breadcrumbs: 0,
            release: sentry::release_name!(),
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
            ..Default::default()
        },
    ))
}

pub fn info(log_key: &LogKey, message: &str) {
    tracing::info!(r#type = log_key.to_string().as_str(), message);
}

pub fn error(log_key: &LogKey, message: &str, error: Option<&dyn std::error::Error>) {
    match error {
        Some(err) => tracing::error!(
            r#type = log_key.to_string().as_str(),
            "Message: '{}'. Original error: {}",
            message,
            err
        ),
        None => tracing::error!(r#type = log_key.to_string().as_str(), message),
    };
}

pub fn metric_name(key: &LogKey, suffix: &str) -> String {
    format!("{}-{}", key, suffix.to_lowercase())
}

pub struct StatsD {
    client: StatsdClient,
}

impl StatsD {
    pub fn new(settings: &Settings) -> MetricResult<Self> {
        let host = (settings.statsd_host.clone(), settings.statsd_port);
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let sink = UdpMetricSink::from(host, socket)?;
        Ok(StatsD {
            client: StatsdClient::from_sink(SERVICE_NAME, sink),
        })
    }

    /// Discards every metric.
    pub fn noop() -> Self {
        StatsD {
            client: StatsdClient::from_sink(SERVICE_NAME, NopMetricSink),
        }
    }

    pub fn incr(&self, key: &LogKey, suffix: &str) {
        let tag = metric_name(key, suffix);
        self.client
            .incr(&tag)
            .map_err(|e| {
                error(
                    &LogKey::StatsDError,
                    &format!("Could not increment statsd tag {}", tag),
                    Some(&e),
                );
            })
            .ok();
    }

    pub fn time(&self, key: &LogKey, suffix: &str, t: Duration) {
        let tag = metric_name(key, suffix);
        self.client
            .time(&tag, t.as_millis() as u64)
            .map_err(|e| {
                error(
                    &LogKey::StatsDError,
                    &format!("Could not record time {:?} for statsd tag {}", t, tag),
                    Some(&e),
                );
            })
            .ok();
    }
}
