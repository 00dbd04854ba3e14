use super::error::Error;
use super::logging;
use crate::frame::FrameError;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn test_parse_level() {
    assert_eq!(logging::parse_level("ERROR"), tracing::Level::ERROR);
    assert_eq!(logging::parse_level("warning"), tracing::Level::WARN);
    assert_eq!(logging::parse_level("trace"), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("nonsense"), tracing::Level::INFO);
}

#[test]
fn test_error_messages() {
    let err = Error::connect("10.0.0.1:1883", "connection refused");
    assert_eq!(
        err.to_string(),
        "cannot connect to 10.0.0.1:1883: connection refused"
    );

    let err: Error = FrameError::TooShort(10).into();
    assert!(matches!(err, Error::Decode(FrameError::TooShort(10))));
}
