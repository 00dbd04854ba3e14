//! # Continuum
//!
//! `continuum` is the latency-instrumented publish/subscribe dataplane of a
//! cloud-edge benchmark. Endpoints publish framed images or texts at a fixed
//! rate to a worker's broker; workers classify each item and ack it back to
//! the sender, which records the end-to-end latency.
//!
//! ## Core Modules
//!
//! - `frame`: The wire format: payload, origin timestamp and reply address.
//! - `transport`: Broker client adapters (MQTT and an in-memory network).
//! - `publisher`: The fixed-rate endpoint publisher and its ack listener.
//! - `subscriber`: The work queue, worker pool, reply routing and shutdown handshake.
//! - `serverless`: The HTTP variant, publisher and function handler.
//! - `combined`: A single-process baseline with no network hop.
//! - `pacing`: The slice-sleep rate controller shared by every producer.
//! - `classify`, `corpus`, `metrics`, `app`: Workload, input, counters and topic naming.
//! - `config`: Loading settings from the environment.
//! - `utils`: Error handling and logging.

pub mod app;
pub mod classify;
pub mod combined;
pub mod config;
pub mod corpus;
pub mod frame;
pub mod metrics;
pub mod pacing;
pub mod publisher;
pub mod serverless;
pub mod subscriber;
pub mod transport;
pub mod utils;
