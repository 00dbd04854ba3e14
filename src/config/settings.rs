use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::app::Application;

/// Broker connection settings shared by the MQTT roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    /// Broker on this node. Also the reply address stamped into frames.
    pub local_ip: String,
    pub port: u16,
    /// Log every broker client event.
    pub logs: bool,
}

/// Parameters of a fixed-rate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub application: Application,
    /// Messages per second.
    pub frequency: u64,
    pub duration_secs: u64,
    pub corpus_dir: PathBuf,
}

impl RunSettings {
    /// Total number of work messages, `⌊F·D⌋`.
    pub fn max_msgs(&self) -> u64 {
        self.frequency * self.duration_secs
    }

    /// Target spacing between messages, `1/F`.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.frequency.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherSettings {
    pub run: RunSettings,
    pub mqtt: MqttSettings,
    /// Worker-side broker the frames are published to.
    pub remote_ip: String,
    /// How long to wait for outstanding acks; `None` waits forever.
    pub ack_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberSettings {
    pub application: Application,
    pub mqtt: MqttSettings,
    /// Worker pool size `N`.
    pub cpu_threads: usize,
    pub endpoints_expected: usize,
    pub grace: Duration,
    pub classify_rounds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSettings {
    pub run: RunSettings,
    pub cpu_threads: usize,
    pub classify_rounds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerlessPublisherSettings {
    pub run: RunSettings,
    pub controller_ip: String,
    pub port: u16,
}

/// Bind address of the serverless function handler.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    pub server: ServerSettings,
    pub cpu_threads: usize,
    pub classify_rounds: u64,
}

/// Raw settings as read from the config file and the environment.
///
/// Every field is optional; the role-specific `from_partial` constructors
/// fill the gaps from defaults and reject what is required but missing.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub application: Option<String>,
    pub mqtt_local_ip: Option<String>,
    pub mqtt_remote_ip: Option<String>,
    pub mqtt_logs: Option<String>,
    pub mqtt_port: Option<u16>,
    pub frequency: Option<u64>,
    pub duration: Option<u64>,
    pub corpus_dir: Option<String>,
    pub cpu_threads: Option<usize>,
    pub endpoint_connected: Option<usize>,
    pub grace_secs: Option<u64>,
    pub ack_timeout_secs: Option<u64>,
    pub classify_rounds: Option<u64>,
    pub cloud_controller_ip: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

pub const DEFAULT_DURATION_SECS: u64 = 300;
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_GRACE_SECS: u64 = 10;
pub const DEFAULT_FUNCTION_PORT: u16 = 8080;
/// Highest rate with a non-zero period at nanosecond resolution.
pub const MAX_FREQUENCY: u64 = 1_000_000_000;

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_FUNCTION_PORT,
        }
    }
}
