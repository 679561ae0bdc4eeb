//! Behaviour tests for session configuration toggles.
//!
//! These scenarios validate that release builds enforce explicit toggle
//! configuration and reject insecure or missing settings.

use std::cell::RefCell;
use std::path::PathBuf;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use uuid::Uuid;
use voucher_backend::inbound::http::session_config::{
    BuildMode, SessionConfigError, SessionSettings, SessionToggles, session_settings,
};

struct SessionConfigWorld {
    toggles: RefCell<SessionToggles>,
    mode: RefCell<BuildMode>,
    outcome: RefCell<Option<Result<SessionSettings, SessionConfigError>>>,
    key_files: RefCell<Vec<TempKeyFile>>,
}

impl SessionConfigWorld {
    fn new() -> Self {
        Self {
            toggles: RefCell::new(SessionToggles::default()),
            mode: RefCell::new(BuildMode::Release),
            outcome: RefCell::new(None),
            key_files: RefCell::new(Vec::new()),
        }
    }

    fn add_key_file(&self, len: usize) {
        let file = TempKeyFile::new(len).expect("key file creation should succeed");
        self.toggles.borrow_mut().key_file = Some(file.path.clone());
        self.key_files.borrow_mut().push(file);
    }

    fn evaluate(&self) {
        let result = session_settings(&self.toggles.borrow(), *self.mode.borrow());
        *self.outcome.borrow_mut() = Some(result);
    }

    fn with_settings<F>(&self, f: F)
    where
        F: FnOnce(&SessionSettings),
    {
        let outcome = self.outcome.borrow();
        let settings = outcome
            .as_ref()
            .expect("evaluation result")
            .as_ref()
            .expect("expected settings to succeed");
        f(settings);
    }

    fn with_error<F>(&self, f: F)
    where
        F: FnOnce(&SessionConfigError),
    {
        let outcome = self.outcome.borrow();
        let error = match outcome.as_ref().expect("evaluation result") {
            Ok(_) => panic!("expected settings to fail"),
            Err(error) => error,
        };
        f(error);
    }
}

#[derive(Debug)]
struct TempKeyFile {
    path: PathBuf,
}

impl TempKeyFile {
    fn new(len: usize) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("session-key-{}", Uuid::new_v4()));
        std::fs::write(&path, vec![b'a'; len])?;
        Ok(Self { path })
    }
}

impl Drop for TempKeyFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn parse_flag(value: &str) -> bool {
    value.parse().expect("boolean toggle")
}

#[fixture]
fn world() -> SessionConfigWorld {
    SessionConfigWorld::new()
}

#[given("a release build configuration")]
fn a_release_build_configuration(world: &SessionConfigWorld) {
    *world.mode.borrow_mut() = BuildMode::Release;
}

#[given("cookie_secure is set to {value}")]
fn cookie_secure_is_set(world: &SessionConfigWorld, value: String) {
    world.toggles.borrow_mut().cookie_secure = Some(parse_flag(&value));
}

#[given("same_site is set to {value}")]
fn same_site_is_set(world: &SessionConfigWorld, value: String) {
    world.toggles.borrow_mut().same_site = Some(value);
}

#[given("allow_ephemeral is set to {value}")]
fn allow_ephemeral_is_set(world: &SessionConfigWorld, value: String) {
    world.toggles.borrow_mut().allow_ephemeral = Some(parse_flag(&value));
}

#[given("a session key file with {len} bytes")]
fn a_session_key_file_with_bytes(world: &SessionConfigWorld, len: usize) {
    world.add_key_file(len);
}

#[when("the session configuration is loaded")]
fn the_session_configuration_is_loaded(world: &SessionConfigWorld) {
    world.evaluate();
}

#[then("the configuration load succeeds")]
fn the_configuration_load_succeeds(world: &SessionConfigWorld) {
    world.with_settings(|_| {});
}

#[then("the cookie secure flag is true")]
fn the_cookie_secure_flag_is_true(world: &SessionConfigWorld) {
    world.with_settings(|settings| {
        assert!(settings.cookie_secure);
    });
}

#[then("the SameSite policy is Strict")]
fn the_same_site_policy_is_strict(world: &SessionConfigWorld) {
    world.with_settings(|settings| {
        assert_eq!(settings.same_site, actix_web::cookie::SameSite::Strict);
    });
}

#[then("the configuration load fails due to missing cookie_secure")]
fn configuration_fails_missing_cookie_secure(world: &SessionConfigWorld) {
    world.with_error(|error| {
        assert!(matches!(
            error,
            SessionConfigError::Missing {
                name: "cookie_secure"
            }
        ));
    });
}

#[then("the configuration load fails because ephemeral keys are not allowed")]
fn configuration_fails_ephemeral_not_allowed(world: &SessionConfigWorld) {
    world.with_error(|error| {
        assert!(matches!(error, SessionConfigError::EphemeralNotAllowed));
    });
}

#[then("the configuration load fails because SameSite=None requires secure cookies")]
fn configuration_fails_insecure_same_site_none(world: &SessionConfigWorld) {
    world.with_error(|error| {
        assert!(matches!(error, SessionConfigError::InsecureSameSiteNone));
    });
}

#[then("the configuration load fails because the key is too short")]
fn configuration_fails_key_too_short(world: &SessionConfigWorld) {
    world.with_error(|error| {
        assert!(matches!(error, SessionConfigError::KeyTooShort { .. }));
    });
}

#[scenario(
    path = "tests/features/session_config.feature",
    name = "A complete release configuration loads"
)]
fn complete_release_configuration(world: SessionConfigWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_config.feature",
    name = "A release build requires cookie_secure"
)]
fn release_requires_cookie_secure(world: SessionConfigWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_config.feature",
    name = "A release build rejects ephemeral keys"
)]
fn release_rejects_ephemeral_keys(world: SessionConfigWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_config.feature",
    name = "SameSite=None needs secure cookies"
)]
fn same_site_none_needs_secure(world: SessionConfigWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_config.feature",
    name = "A release build rejects short keys"
)]
fn release_rejects_short_keys(world: SessionConfigWorld) {
    drop(world);
}
