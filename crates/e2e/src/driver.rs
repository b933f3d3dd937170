//! WebDriver session setup

use std::str::FromStr;
use std::time::Duration;

use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            _ => Err(E2eError::UnknownBrowser(s.to_string())),
        }
    }
}

/// Configuration for WebDriver sessions
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// WebDriver server (chromedriver, geckodriver, Selenium grid)
    pub webdriver_url: String,

    /// Browser to request from the server
    pub browser: Browser,

    /// Run without a visible window
    pub headless: bool,

    /// How long element lookups poll before failing
    pub implicit_wait: Duration,

    /// Rounds of backspacing allowed when clearing an edit field
    pub clear_attempts: usize,

    /// How long to wait for the WebDriver server to report ready
    pub ready_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            browser: Browser::Chrome,
            headless: true,
            implicit_wait: Duration::from_secs(5),
            clear_attempts: 3,
            ready_timeout: Duration::from_secs(10),
        }
    }
}

/// Start a new browser session.
///
/// chromedriver and geckodriver create a throwaway profile per session, so
/// localStorage written by one scenario is never visible to the next.
pub async fn connect(config: &DriverConfig) -> E2eResult<WebDriver> {
    info!(
        "Starting {} session via {}",
        config.browser.as_str(),
        config.webdriver_url
    );

    let driver = match config.browser {
        Browser::Chrome => {
            let mut caps = DesiredCapabilities::chrome();
            if config.headless {
                caps.set_headless()?;
            }
            caps.add_arg("--no-first-run")?;
            WebDriver::new(config.webdriver_url.as_str(), caps).await?
        }
        Browser::Firefox => {
            let mut caps = DesiredCapabilities::firefox();
            if config.headless {
                caps.set_headless()?;
            }
            WebDriver::new(config.webdriver_url.as_str(), caps).await?
        }
    };

    let waited = driver.set_implicit_wait_timeout(config.implicit_wait).await;
    if let Err(e) = waited {
        let _ = driver.quit().await;
        return Err(e.into());
    }
    debug!("Implicit wait set to {:?}", config.implicit_wait);

    Ok(driver)
}
