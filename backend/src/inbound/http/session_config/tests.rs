//! Unit tests for session configuration validation.

use super::*;
use rstest::{fixture, rstest};
use uuid::Uuid;

#[derive(Debug)]
struct TempKeyFile {
    path: PathBuf,
}

impl TempKeyFile {
    fn new(len: usize) -> Self {
        let path = std::env::temp_dir().join(format!("session-key-{}", Uuid::new_v4()));
        std::fs::write(&path, vec![b'a'; len]).expect("key file creation should succeed");
        Self { path }
    }
}

impl Drop for TempKeyFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[fixture]
fn key_file() -> TempKeyFile {
    TempKeyFile::new(SESSION_KEY_MIN_LEN)
}

fn release_toggles(key_file: &TempKeyFile) -> SessionToggles {
    SessionToggles {
        key_file: Some(key_file.path.clone()),
        cookie_secure: Some(true),
        same_site: Some("Strict".to_owned()),
        allow_ephemeral: Some(false),
    }
}

fn expect_error(result: Result<SessionSettings, SessionConfigError>) -> SessionConfigError {
    match result {
        Ok(_) => panic!("expected session settings to be rejected"),
        Err(error) => error,
    }
}

#[rstest]
fn release_accepts_explicit_settings(key_file: TempKeyFile) {
    let settings = session_settings(&release_toggles(&key_file), BuildMode::Release)
        .expect("valid settings");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
}

#[rstest]
fn release_missing_cookie_secure_is_rejected(key_file: TempKeyFile) {
    let toggles = SessionToggles {
        cookie_secure: None,
        ..release_toggles(&key_file)
    };
    let err = expect_error(session_settings(&toggles, BuildMode::Release));
    assert!(matches!(err, SessionConfigError::Missing { name: "cookie_secure" }));
}

#[rstest]
fn release_invalid_same_site_is_rejected(key_file: TempKeyFile) {
    let toggles = SessionToggles {
        same_site: Some("sideways".to_owned()),
        ..release_toggles(&key_file)
    };
    let err = expect_error(session_settings(&toggles, BuildMode::Release));
    assert!(matches!(err, SessionConfigError::Invalid { name: "same_site", .. }));
}

#[rstest]
fn release_same_site_none_requires_secure_cookie(key_file: TempKeyFile) {
    let toggles = SessionToggles {
        cookie_secure: Some(false),
        same_site: Some("None".to_owned()),
        ..release_toggles(&key_file)
    };
    let err = expect_error(session_settings(&toggles, BuildMode::Release));
    assert!(matches!(err, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn release_rejects_ephemeral_keys(key_file: TempKeyFile) {
    let toggles = SessionToggles {
        allow_ephemeral: Some(true),
        ..release_toggles(&key_file)
    };
    let err = expect_error(session_settings(&toggles, BuildMode::Release));
    assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_rejects_short_keys() {
    let short = TempKeyFile::new(SESSION_KEY_MIN_LEN - 1);
    let err = expect_error(session_settings(&release_toggles(&short), BuildMode::Release));
    assert!(matches!(err, SessionConfigError::KeyTooShort { .. }));
}

#[rstest]
fn release_missing_key_file_is_rejected(key_file: TempKeyFile) {
    let toggles = SessionToggles {
        key_file: Some(std::env::temp_dir().join(format!("absent-{}", Uuid::new_v4()))),
        ..release_toggles(&key_file)
    };
    let err = expect_error(session_settings(&toggles, BuildMode::Release));
    assert!(matches!(err, SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn debug_fills_gaps_with_defaults() {
    let toggles = SessionToggles {
        key_file: Some(std::env::temp_dir().join(format!("absent-{}", Uuid::new_v4()))),
        ..SessionToggles::default()
    };
    let settings = session_settings(&toggles, BuildMode::Debug).expect("debug defaults");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
fn fingerprint_is_stable_for_a_key(key_file: TempKeyFile) {
    let first = session_settings(&release_toggles(&key_file), BuildMode::Release)
        .expect("valid settings");
    let second = session_settings(&release_toggles(&key_file), BuildMode::Release)
        .expect("valid settings");
    assert_eq!(key_fingerprint(&first.key), key_fingerprint(&second.key));
}
