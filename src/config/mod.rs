//! Configuration for every role.
//!
//! Settings come from an optional `config/default` file and the process
//! environment (upper-case keys such as `MQTT_LOCAL_IP` or `FREQUENCY`).
//! Whatever is available is read into `PartialSettings`, then merged with
//! defaults per role. Missing required keys and out-of-range values are
//! reported as `Error::Config`.

mod settings;

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};

use crate::app::Application;
use crate::frame;
use crate::utils::{Error, Result};

pub use settings::{
    CombinedSettings, DEFAULT_DURATION_SECS, DEFAULT_FUNCTION_PORT, DEFAULT_GRACE_SECS,
    DEFAULT_MQTT_PORT, HandlerSettings, MAX_FREQUENCY, MqttSettings, PartialSettings,
    PublisherSettings, RunSettings, ServerSettings, ServerlessPublisherSettings,
    SubscriberSettings,
};

/// Reads the config file (if any) and the environment.
pub fn load_partial() -> Result<PartialSettings> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default());

    let config = builder.build()?;
    Ok(config.try_deserialize()?)
}

pub fn load_publisher_settings() -> Result<PublisherSettings> {
    PublisherSettings::from_partial(&load_partial()?)
}

pub fn load_subscriber_settings() -> Result<SubscriberSettings> {
    SubscriberSettings::from_partial(&load_partial()?)
}

pub fn load_combined_settings() -> Result<CombinedSettings> {
    CombinedSettings::from_partial(&load_partial()?)
}

pub fn load_serverless_publisher_settings() -> Result<ServerlessPublisherSettings> {
    ServerlessPublisherSettings::from_partial(&load_partial()?)
}

pub fn load_handler_settings() -> Result<HandlerSettings> {
    HandlerSettings::from_partial(&load_partial()?)
}

/// Log level requested through `LOG_LEVEL`, defaulting to `info`.
pub fn log_level(partial: &PartialSettings) -> String {
    partial
        .log_level
        .clone()
        .unwrap_or_else(|| "info".to_string())
}

fn require<T: Clone>(value: &Option<T>, key: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| Error::Config(format!("{key} is not set")))
}

fn positive<T: PartialOrd + Default + Copy>(value: T, key: &str) -> Result<T> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(Error::Config(format!("{key} must be a positive integer")))
    }
}

fn application(partial: &PartialSettings) -> Result<Application> {
    partial
        .application
        .as_deref()
        .map(str::parse::<Application>)
        .transpose()
        .map(Option::unwrap_or_default)
}

impl MqttSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        let local_ip = require(&partial.mqtt_local_ip, "MQTT_LOCAL_IP")?;
        frame::validate_address(&local_ip)
            .map_err(|e| Error::Config(format!("MQTT_LOCAL_IP: {e}")))?;

        Ok(Self {
            local_ip,
            port: partial.mqtt_port.unwrap_or(DEFAULT_MQTT_PORT),
            logs: partial.mqtt_logs.as_deref() == Some("True"),
        })
    }
}

impl RunSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        let application = application(partial)?;
        let frequency = positive(require(&partial.frequency, "FREQUENCY")?, "FREQUENCY")?;
        if frequency > MAX_FREQUENCY {
            return Err(Error::Config(format!("FREQUENCY must be at most {MAX_FREQUENCY}")));
        }
        let duration_secs = positive(
            partial.duration.unwrap_or(DEFAULT_DURATION_SECS),
            "DURATION",
        )?;
        if frequency.checked_mul(duration_secs).is_none() {
            return Err(Error::Config(
                "FREQUENCY * DURATION overflows the message count".to_string(),
            ));
        }
        let corpus_dir = partial
            .corpus_dir
            .clone()
            .unwrap_or_else(|| application.default_corpus_dir().to_string());

        Ok(Self {
            application,
            frequency,
            duration_secs,
            corpus_dir: PathBuf::from(corpus_dir),
        })
    }
}

impl PublisherSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        Ok(Self {
            run: RunSettings::from_partial(partial)?,
            mqtt: MqttSettings::from_partial(partial)?,
            remote_ip: require(&partial.mqtt_remote_ip, "MQTT_REMOTE_IP")?,
            ack_timeout: partial.ack_timeout_secs.map(Duration::from_secs),
        })
    }
}

impl SubscriberSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        Ok(Self {
            application: application(partial)?,
            mqtt: MqttSettings::from_partial(partial)?,
            cpu_threads: positive(require(&partial.cpu_threads, "CPU_THREADS")?, "CPU_THREADS")?,
            endpoints_expected: require(&partial.endpoint_connected, "ENDPOINT_CONNECTED")?,
            grace: Duration::from_secs(partial.grace_secs.unwrap_or(DEFAULT_GRACE_SECS)),
            classify_rounds: partial.classify_rounds.unwrap_or_default(),
        })
    }
}

impl CombinedSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        Ok(Self {
            run: RunSettings::from_partial(partial)?,
            cpu_threads: positive(require(&partial.cpu_threads, "CPU_THREADS")?, "CPU_THREADS")?,
            classify_rounds: partial.classify_rounds.unwrap_or_default(),
        })
    }
}

impl ServerlessPublisherSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        Ok(Self {
            run: RunSettings::from_partial(partial)?,
            controller_ip: require(&partial.cloud_controller_ip, "CLOUD_CONTROLLER_IP")?,
            port: partial.server_port.unwrap_or(DEFAULT_FUNCTION_PORT),
        })
    }
}

impl HandlerSettings {
    pub fn from_partial(partial: &PartialSettings) -> Result<Self> {
        let default = ServerSettings::default();

        Ok(Self {
            server: ServerSettings {
                host: partial.server_host.clone().unwrap_or(default.host),
                port: partial.server_port.unwrap_or(default.port),
            },
            cpu_threads: positive(partial.cpu_threads.unwrap_or(1), "CPU_THREADS")?,
            classify_rounds: partial.classify_rounds.unwrap_or_default(),
        })
    }
}
