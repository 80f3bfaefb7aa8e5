use montepi::error::{self, EXIT_FAILURE, EXIT_USAGE};
use montepi::MontePiError;
use std::time::Duration;

#[test]
fn test_invalid_input_is_reported_not_zero() {
    let err = montepi::estimate_pi(0, 4).unwrap_err();
    assert!(matches!(err, MontePiError::InvalidInput(_)));
    assert_eq!(error::exit_code(&err), EXIT_USAGE);

    let err = montepi::estimate_pi(10, 0).unwrap_err();
    assert!(matches!(err, MontePiError::InvalidInput(_)));
    assert!(err.to_string().contains("workers"));
}

#[test]
fn test_user_friendly_messages() {
    let msg = error::user_friendly_message(&MontePiError::InvalidInput("samples must be at least 1, got 0".into()));
    assert!(msg.contains("at least 1"));

    let msg = error::user_friendly_message(&MontePiError::Timeout(Duration::from_secs(2)));
    assert!(msg.contains("2s"));
    assert!(msg.contains("--timeout"));

    let msg = error::user_friendly_message(&MontePiError::Cancelled("x".into()));
    assert!(msg.to_lowercase().contains("cancelled"));
}

#[test]
fn test_exit_codes() {
    assert_eq!(error::exit_code(&MontePiError::ConfigError("x".into())), EXIT_USAGE);
    assert_eq!(error::exit_code(&MontePiError::WorkerFailure("x".into())), EXIT_FAILURE);
    assert_eq!(error::exit_code(&MontePiError::Timeout(Duration::from_secs(1))), EXIT_FAILURE);
    assert_eq!(error::exit_code(&MontePiError::Cancelled("x".into())), EXIT_FAILURE);
}

#[test]
fn test_error_source_and_conversions() {
    use std::error::Error;

    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
    let err: MontePiError = io.into();
    assert!(err.source().is_some());

    let parse = toml::from_str::<toml::Value>("samples = ").unwrap_err();
    let err: MontePiError = parse.into();
    assert!(matches!(err, MontePiError::ConfigError(_)));
    assert!(err.source().is_none());
}
