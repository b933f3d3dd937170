//! Sequential scenario runner with guaranteed session teardown

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, error, info};

use crate::driver::DriverConfig;
use crate::error::{E2eError, E2eResult, ScenarioError, ScenarioResult};
use crate::health;
use crate::properties::{Properties, PropertyName, PropertySet};
use crate::scenarios::{Scenario, SampleTodos};
use crate::todomvc::TodoMvc;

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The application did not behave as specified
    Failed(String),
    /// The harness, driver or configuration broke before a verdict
    Errored(String),
}

impl Outcome {
    fn from_run(run: Result<ScenarioResult, Box<dyn Any + Send>>) -> Self {
        match run {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(ScenarioError::Assertion(reason))) => Outcome::Failed(reason),
            Ok(Err(ScenarioError::Harness(e))) => Outcome::Errored(e.to_string()),
            Err(panic) => Outcome::Errored(E2eError::Panicked(panic_message(&*panic)).to_string()),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed(reason) | Outcome::Errored(reason) => Some(reason),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Default)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    fn record(&mut self, result: TestResult) {
        self.total += 1;
        match &result.outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Errored(_) => self.errored += 1,
        }
        self.results.push(result);
    }

    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// 0 when everything passed, 2 if the harness itself broke anywhere,
    /// otherwise 1 for assertion failures.
    pub fn exit_code(&self) -> i32 {
        if self.errored > 0 {
            2
        } else if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub driver: DriverConfig,

    /// Directory holding `public.properties` and `private.properties`
    pub properties_dir: PathBuf,

    /// Wait for the WebDriver server and check the app before running
    pub preflight: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            properties_dir: PathBuf::from("."),
            preflight: true,
        }
    }
}

/// Runs scenarios one at a time, each in its own browser session
pub struct TestRunner {
    driver_config: DriverConfig,
    properties: Properties,
    preflight: bool,
}

impl TestRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            driver_config: config.driver,
            properties: Properties::new(config.properties_dir),
            preflight: config.preflight,
        }
    }

    /// Check the WebDriver server and the application are reachable
    pub async fn check_ready(&self) -> E2eResult<()> {
        health::wait_for_driver(&self.driver_config.webdriver_url, self.driver_config.ready_timeout)
            .await?;
        let base_url = self
            .properties
            .require(PropertySet::Public, PropertyName::BaseUrl)?;
        health::check_app(base_url).await
    }

    pub async fn run_all(&self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        self.run_scenarios(scenarios).await
    }

    pub async fn run_tagged(
        &self,
        scenarios: &[Scenario],
        tag: &str,
    ) -> E2eResult<TestSuiteResult> {
        let selected: Vec<Scenario> = scenarios
            .iter()
            .filter(|s| s.has_tag(tag))
            .copied()
            .collect();
        self.run_scenarios(&selected).await
    }

    /// Run scenarios whose name contains `pattern`
    pub async fn run_matching(
        &self,
        scenarios: &[Scenario],
        pattern: &str,
    ) -> E2eResult<TestSuiteResult> {
        let selected: Vec<Scenario> = scenarios
            .iter()
            .filter(|s| s.name.contains(pattern))
            .copied()
            .collect();
        self.run_scenarios(&selected).await
    }

    /// Run a list of scenarios in order.
    ///
    /// Sample data is resolved once, up front; if it is missing every
    /// scenario is reported as errored without opening a browser.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut suite = TestSuiteResult::default();

        if self.preflight && !scenarios.is_empty() {
            self.check_ready().await?;
        }

        info!("Running {} scenario(s)...", scenarios.len());

        match SampleTodos::from_properties(&self.properties) {
            Ok(todos) => {
                for scenario in scenarios {
                    let result = self.run_scenario(scenario, &todos).await;
                    log_result(&result);
                    suite.record(result);
                }
            }
            Err(e) => {
                let reason = e.to_string();
                for scenario in scenarios {
                    let result = TestResult {
                        name: scenario.name.to_string(),
                        outcome: Outcome::Errored(reason.clone()),
                        duration_ms: 0,
                    };
                    log_result(&result);
                    suite.record(result);
                }
            }
        }

        suite.duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} errored ({} ms)",
            suite.passed, suite.failed, suite.errored, suite.duration_ms
        );

        Ok(suite)
    }

    /// Run one scenario in a fresh session. The session is quit whether the
    /// body passes, fails an assertion, errors or panics.
    pub async fn run_scenario(&self, scenario: &Scenario, todos: &SampleTodos) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {} - {}", scenario.name, scenario.description);

        let outcome = match TodoMvc::open(&self.driver_config, &self.properties).await {
            Ok(app) => {
                let run = AssertUnwindSafe((scenario.body)(&app, todos))
                    .catch_unwind()
                    .await;
                app.quit().await;
                Outcome::from_run(run)
            }
            Err(e) => Outcome::Errored(e.to_string()),
        };

        TestResult {
            name: scenario.name.to_string(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn log_result(result: &TestResult) {
    match &result.outcome {
        Outcome::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
        Outcome::Failed(reason) => error!("✗ {} - {}", result.name, reason),
        Outcome::Errored(reason) => error!("! {} - harness error: {}", result.name, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: Outcome) -> TestResult {
        TestResult {
            name: "scenario".to_string(),
            outcome,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(Outcome::from_run(Ok(Ok(()))), Outcome::Passed);
        assert_eq!(
            Outcome::from_run(Ok(Err(ScenarioError::Assertion("counter wrong".into())))),
            Outcome::Failed("counter wrong".into())
        );
        assert!(matches!(
            Outcome::from_run(Ok(Err(E2eError::TodoNotFound("x".into()).into()))),
            Outcome::Errored(reason) if reason.contains("No todo labelled 'x'")
        ));
    }

    #[test]
    fn test_panic_is_harness_error() {
        let run = std::panic::catch_unwind(|| -> ScenarioResult { panic!("element vanished") });
        let outcome = Outcome::from_run(run);
        assert!(matches!(outcome, Outcome::Errored(reason) if reason.contains("element vanished")));
    }

    #[test]
    fn test_exit_codes() {
        let mut suite = TestSuiteResult::default();
        suite.record(result(Outcome::Passed));
        assert_eq!(suite.exit_code(), 0);
        assert!(suite.success());

        suite.record(result(Outcome::Failed("nope".into())));
        assert_eq!(suite.exit_code(), 1);

        suite.record(result(Outcome::Errored("driver gone".into())));
        assert_eq!(suite.exit_code(), 2);
        assert_eq!((suite.total, suite.passed, suite.failed, suite.errored), (3, 1, 1, 1));
    }

    #[tokio::test]
    async fn test_missing_samples_error_every_scenario_without_browser() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("public.properties"),
            "BASE_URL=http://127.0.0.1:9/\n",
        )
        .unwrap();

        let runner = TestRunner::with_config(RunnerConfig {
            properties_dir: dir.path().to_path_buf(),
            preflight: false,
            ..Default::default()
        });

        let scenarios = crate::scenarios::all();
        let suite = runner.run_tagged(&scenarios, "smoke").await.unwrap();

        assert!(suite.total > 0);
        assert_eq!(suite.errored, suite.total);
        assert!(suite.results.iter().all(|r| r
            .outcome
            .reason()
            .is_some_and(|reason| reason.contains("SAMPLE_TODO_ONE"))));
    }

    #[tokio::test]
    async fn test_empty_selection_skips_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TestRunner::with_config(RunnerConfig {
            properties_dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let suite = runner
            .run_matching(&crate::scenarios::all(), "no-such-scenario")
            .await
            .unwrap();
        assert_eq!(suite.total, 0);
        assert_eq!(suite.exit_code(), 0);
    }
}
