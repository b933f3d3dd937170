//! TodoMVC E2E Test Framework
//!
//! This crate drives the TodoMVC Vanilla JS application through a real
//! browser over WebDriver and checks it against the TodoMVC functional
//! specification:
//! - Reads environment settings and sample data from properties files
//! - Wraps each browser session in a page object with user-level operations
//! - Runs regression scenarios sequentially, one fresh session each
//! - Reports assertion failures separately from harness errors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── check_ready()            -> WebDriver /status, app   │
//! │    ├── run_scenario(scenario)   -> TestResult               │
//! │    │     ├── TodoMvc::open()    (new session, goto BASE_URL)│
//! │    │     ├── scenario body      (catch_unwind)              │
//! │    │     └── TodoMvc::quit()    (always)                    │
//! │    └── TestSuiteResult          -> exit code 0 / 1 / 2      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Properties                                                 │
//! │    ├── public.properties   (BASE_URL, SAMPLE_TODO_*)        │
//! │    └── private.properties  (local overrides)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod health;
pub mod properties;
pub mod runner;
pub mod scenarios;
pub mod todomvc;

pub use error::{E2eError, E2eResult, ScenarioError, ScenarioResult};
pub use properties::{Properties, PropertyName, PropertySet};
pub use runner::TestRunner;
pub use scenarios::Scenario;
pub use todomvc::{Filter, TodoMvc};
