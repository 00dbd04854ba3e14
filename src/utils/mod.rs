//! The `utils` module holds the pieces every role shares: the error taxonomy
//! and tracing initialisation.

pub mod error;
pub mod logging;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
