//! CLI for the continuum dataplane
//!
//! Subcommands:
//! - `publisher`: send items to a worker over MQTT and record ack latency
//! - `subscriber`: classify items from endpoints and ack them
//! - `combined`: generate and classify in one process
//! - `serverless-publisher`: invoke the image function over HTTP
//! - `serverless-handler`: serve the image function

use std::process::ExitCode;

use clap::Parser;
use continuum::combined::Combined;
use continuum::config;
use continuum::corpus::Corpus;
use continuum::publisher::Publisher;
use continuum::serverless::{self, ServerlessPublisher};
use continuum::subscriber::Subscriber;
use continuum::transport::MqttConnector;
use continuum::utils::{Result, logging};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "continuum", version)]
enum Command {
    /// Publish framed items to the remote broker and wait for acks
    Publisher,
    /// Process items from the local broker with a worker pool
    Subscriber,
    /// Produce and process items in a single process
    Combined,
    /// Send items to the serverless image function
    ServerlessPublisher,
    /// Run the serverless image function
    ServerlessHandler,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let level = config::load_partial()
        .map(|partial| config::log_level(&partial))
        .unwrap_or_else(|_| "info".to_string());
    logging::init(&level);

    match run(cmd).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one role. `Ok(false)` means the run ended without every ack.
async fn run(cmd: Command) -> Result<bool> {
    match cmd {
        Command::Publisher => {
            let settings = config::load_publisher_settings()?;
            let corpus = Corpus::load(
                &settings.run.corpus_dir,
                settings.run.application.corpus_extension(),
            )?;
            let connector = MqttConnector::new(settings.mqtt.port, settings.mqtt.logs);
            let report = Publisher::new(settings, connector, corpus).run().await?;
            if !report.all_acked() {
                warn!("Received {} of {} acks", report.acked, report.max_msgs);
            }
            Ok(report.all_acked())
        }
        Command::Subscriber => {
            let settings = config::load_subscriber_settings()?;
            let connector = MqttConnector::new(settings.mqtt.port, settings.mqtt.logs);
            let report = Subscriber::new(settings, connector).run().await?;
            info!("Subscriber finished: {:?}", report.metrics);
            Ok(true)
        }
        Command::Combined => {
            let settings = config::load_combined_settings()?;
            let corpus = Corpus::load(
                &settings.run.corpus_dir,
                settings.run.application.corpus_extension(),
            )?;
            let report = Combined::new(settings, corpus).run().await?;
            info!("Combined run finished with {} overruns", report.overruns);
            Ok(true)
        }
        Command::ServerlessPublisher => {
            let settings = config::load_serverless_publisher_settings()?;
            let corpus = Corpus::load(
                &settings.run.corpus_dir,
                settings.run.application.corpus_extension(),
            )?;
            let report = ServerlessPublisher::new(settings, corpus)?.run().await?;
            Ok(report.all_acked())
        }
        Command::ServerlessHandler => {
            serverless::serve(config::load_handler_settings()?).await?;
            Ok(true)
        }
    }
}
