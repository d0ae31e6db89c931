//! Configuration Tests
//!
//! Loading the runtime's sequence policy from TOML text and files.

use crate::*;
use std::io::Write;
use tether::TetherBuilder;

#[test]
fn test_load_from_file() {
    init_test_logging();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[sequence]").unwrap();
    writeln!(file, "cancel-on-error = true").unwrap();
    writeln!(file, "aggregate = \"mirror-last-step\"").unwrap();

    let tether = TetherBuilder::from_toml_file(file.path()).unwrap().build();
    let config = tether.config();

    assert!(config.cancel_on_error);
    assert_eq!(config.aggregate, AggregatePolicy::MirrorLastStep);
    assert_eq!(config.resume, ResumeMode::ContinueNext);
}

#[test]
fn test_file_settings_reach_sequences() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");
    std::fs::write(&path, "[sequence]\ncancel-on-error = true\n").unwrap();

    let tether = TetherBuilder::from_toml_file(&path).unwrap().build();
    let seq = tether.sequence();
    seq.add_fn(Operation::failed);
    seq.add_fn(|| Operation::completed(1));

    assert_eq!(seq.start().state(), AsyncState::Failed);
    assert!(seq.operation(1).is_none());
}

#[test]
fn test_builder_overrides_file() {
    let tether = TetherBuilder::from_toml_str("[sequence]\nresume = \"retry-last\"")
        .unwrap()
        .resume_mode(ResumeMode::ContinueNext)
        .cancel_on_error(true)
        .build();

    assert_eq!(tether.config(), SequenceConfig::fail_fast());
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TetherBuilder::from_toml_file(dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert!(err.is_config_error());
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[sequence\ncancel-on-error = maybe").unwrap();

    let err = TetherBuilder::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_step_machine_uses_runtime_policy() {
    let tether = Tether::builder().config(SequenceConfig::fail_fast()).build();
    let machine = tether.step_machine();
    assert!(machine.sequence().cancel_on_error());
}
