//! Settings loader integration tests: exact field decoding and error surfaces.

use std::path::PathBuf;

use assert_fs::prelude::*;
use copyfiles_core::{CopyFilter, Settings, SettingsError, SETTINGS_FILE_NAME};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Valid files
// ---------------------------------------------------------------------------

#[rstest]
#[case(r#"{"SourceDir":"/tmp/in","DestDir":"/tmp/out"}"#, "/tmp/in", "/tmp/out")]
#[case(r#"{"SourceDir":"in","DestDir":"../out"}"#, "in", "../out")]
#[case(
    r#"{ "DestDir": "C:\\backup", "SourceDir": "C:\\drop" }"#,
    "C:\\drop",
    "C:\\backup"
)]
#[case(r#"{"SourceDir":"","DestDir":""}"#, "", "")]
#[case(r#"{"SourceDir":"/tmp/in"}"#, "/tmp/in", "")]
#[case(r#"{"DestDir":"/tmp/out"}"#, "", "/tmp/out")]
#[case(r#"{"sourcedir":"/tmp/in","destDir":"/tmp/out"}"#, "/tmp/in", "/tmp/out")]
fn load_returns_exact_json_values(
    #[case] json: &str,
    #[case] source: &str,
    #[case] dest: &str,
) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(SETTINGS_FILE_NAME);
    file.write_str(json).expect("write settings");

    let settings = Settings::load(file.path()).expect("load");
    assert_eq!(settings.source_dir, PathBuf::from(source));
    assert_eq!(settings.dest_dir, PathBuf::from(dest));
    assert_eq!(settings.copy_on, CopyFilter::Any);
}

#[test]
fn load_reads_copy_on_write() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(SETTINGS_FILE_NAME);
    file.write_str(r#"{"SourceDir":"a","DestDir":"b","CopyOn":"write"}"#)
        .expect("write settings");

    let settings = Settings::load(file.path()).expect("load");
    assert_eq!(settings.copy_on, CopyFilter::Write);
}

// ---------------------------------------------------------------------------
// 2. Fatal errors
// ---------------------------------------------------------------------------

#[test]
fn load_missing_file_returns_read_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let missing = dir.child(SETTINGS_FILE_NAME);
    missing.assert(predicate::path::missing());

    let err = Settings::load(missing.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Read { .. }), "got: {err}");
    assert!(err.to_string().contains(SETTINGS_FILE_NAME));
}

#[rstest]
#[case::not_json("SourceDir = /tmp/in")]
#[case::truncated(r#"{"SourceDir":"/tmp/in","DestDir":"#)]
#[case::wrong_type(r#"{"SourceDir":42,"DestDir":"/tmp/out"}"#)]
#[case::array(r#"["/tmp/in","/tmp/out"]"#)]
#[case::string(r#""/tmp/in""#)]
#[case::null("null")]
#[case::empty("")]
fn load_malformed_file_returns_parse_error(#[case] contents: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(SETTINGS_FILE_NAME);
    file.write_str(contents).expect("write settings");

    let err = Settings::load(file.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains(SETTINGS_FILE_NAME), "must contain file path, got: {msg}");
}

#[test]
fn load_directory_instead_of_file_returns_read_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = Settings::load(dir.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Read { .. }), "got: {err}");
}
