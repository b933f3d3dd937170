//! Error types for E2E testing

use thiserror::Error;
use thirtyfour::prelude::WebDriverError;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Missing property {name} in {set} properties")]
    MissingProperty { set: String, name: String },

    #[error("Failed to load {path}: {reason}")]
    PropertiesLoad { path: String, reason: String },

    #[error("Line {line}: {reason}")]
    PropertiesSyntax { line: usize, reason: String },

    #[error("WebDriver server not ready after {0} attempts")]
    DriverNotReady(usize),

    #[error("Application not reachable at {0}")]
    AppUnreachable(String),

    #[error("No todo labelled '{0}'")]
    TodoNotFound(String),

    #[error("Edit field still reads '{remaining}' after {attempts} clear attempts")]
    EditFieldNotCleared { remaining: String, attempts: usize },

    #[error("Unknown filter '{0}' (expected ACTIVE, COMPLETED or ALL)")]
    UnknownFilter(String),

    #[error("Unknown browser '{0}' (expected chrome or firefox)")]
    UnknownBrowser(String),

    #[error("Unexpected counter text: '{0}'")]
    CounterFormat(String),

    #[error("Scenario panicked: {0}")]
    Panicked(String),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Why a scenario did not pass.
///
/// `Assertion` means the application misbehaved; `Harness` means the harness
/// or its collaborators (driver, browser, configuration) did.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error(transparent)]
    Harness(#[from] E2eError),
}

pub type ScenarioResult = Result<(), ScenarioError>;
