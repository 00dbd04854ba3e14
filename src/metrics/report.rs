//! Single-line stdout records. These lines are the only machine-readable
//! output of a run; keep their wording stable.

use std::time::Duration;

/// Whole nanoseconds in `elapsed`, saturating at `u64::MAX`.
pub fn nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

pub fn latency_line(ns: u64) -> String {
    format!("Latency (ns): {ns}")
}

pub fn processing_line(ns: u64) -> String {
    format!("Processing (ns): {ns}")
}

/// Subscriber finish record, e.g. `Finished, processed images: 10`.
pub fn processed_line(noun: &str, count: u64) -> String {
    format!("Finished, processed {noun}: {count}")
}

/// Publisher finish record, e.g. `Finished, sent 10 images`.
pub fn sent_line(noun: &str, count: u64) -> String {
    format!("Finished, sent {count} {noun}")
}

/// Combined-mode finish record, e.g. `Finished, processed 10 images`.
pub fn combined_line(noun: &str, count: u64) -> String {
    format!("Finished, processed {count} {noun}")
}

pub fn latency(ns: u64) {
    println!("{}", latency_line(ns));
}

pub fn processing(elapsed: Duration) {
    println!("{}", processing_line(nanos(elapsed)));
}

pub fn processed(noun: &str, count: u64) {
    println!("{}", processed_line(noun, count));
}

pub fn sent(noun: &str, count: u64) {
    println!("{}", sent_line(noun, count));
}

pub fn combined(noun: &str, count: u64) {
    println!("{}", combined_line(noun, count));
}
