//! Page object for the TodoMVC application
//!
//! [`TodoMvc`] owns one WebDriver session pointed at the application and
//! exposes what a user does with it: add, complete, edit, delete and filter
//! todos, and read back what the page shows. Todos have no stable id in the
//! DOM, so every operation finds them by label text and acts on the first
//! match.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

use crate::driver::{self, DriverConfig};
use crate::error::{E2eError, E2eResult};
use crate::properties::{Properties, PropertyName, PropertySet};

const TODO_INPUT: &str = "input.new-todo";
const TODO_LIST: &str = ".todo-list";
const TOGGLE_ALL: &str = "toggle-all";
const CLEAR_COMPLETED: &str = "clear-completed";
const DESTROY: &str = "destroy";
const COUNTER: &str = "todo-count";

/// localStorage key the Vanilla JS app persists its todos under
pub const STORAGE_KEY: &str = "todos-vanillajs";

/// Route filters the application understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Active,
    Completed,
    All,
}

impl Filter {
    /// Hash route for this filter, relative to the base URL
    pub fn route(&self) -> &'static str {
        match self {
            Filter::Active => "#/active",
            Filter::Completed => "#/completed",
            Filter::All => "#/",
        }
    }
}

impl FromStr for Filter {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Filter::Active),
            "COMPLETED" => Ok(Filter::Completed),
            "ALL" => Ok(Filter::All),
            _ => Err(E2eError::UnknownFilter(s.to_string())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Active => f.write_str("ACTIVE"),
            Filter::Completed => f.write_str("COMPLETED"),
            Filter::All => f.write_str("ALL"),
        }
    }
}

/// The "N items left" counter, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCount {
    pub remaining: usize,
    pub noun: String,
}

impl ItemCount {
    pub fn parse(text: &str) -> E2eResult<Self> {
        static COUNTER_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(items?)\b").expect("static regex"));

        let caps = COUNTER_RE
            .captures(text)
            .ok_or_else(|| E2eError::CounterFormat(text.to_string()))?;
        let remaining = caps[1]
            .parse()
            .map_err(|_| E2eError::CounterFormat(text.to_string()))?;

        Ok(Self {
            remaining,
            noun: caps[2].to_string(),
        })
    }

    /// "1 item", "0 items", "2 items"
    pub fn is_correctly_pluralized(&self) -> bool {
        (self.remaining == 1) == (self.noun == "item")
    }
}

/// A todo as the application stores it in localStorage
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredTodo {
    #[serde(default)]
    pub id: serde_json::Value,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Page object wrapping one browser session on the TodoMVC app
pub struct TodoMvc {
    driver: WebDriver,
    base_url: String,
    clear_attempts: usize,
}

impl TodoMvc {
    /// Open a new session and navigate to `BASE_URL`.
    ///
    /// The base URL is resolved before any browser is started, so a missing
    /// property never leaks a session.
    pub async fn open(config: &DriverConfig, properties: &Properties) -> E2eResult<Self> {
        let base_url = properties
            .require(PropertySet::Public, PropertyName::BaseUrl)?
            .to_string();

        let driver = driver::connect(config).await?;
        let app = Self {
            driver,
            base_url,
            clear_attempts: config.clear_attempts,
        };

        let visited = app.visit().await;
        match visited {
            Ok(()) => Ok(app),
            Err(e) => {
                app.quit().await;
                Err(e)
            }
        }
    }

    /// Navigate to the base URL
    pub async fn visit(&self) -> E2eResult<()> {
        self.visit_url(&self.base_url).await
    }

    pub async fn visit_url(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.driver.goto(url).await?;
        Ok(())
    }

    /// Open a new tab in this session and switch to it
    pub async fn open_new_tab(&self) -> E2eResult<()> {
        let handle = self.driver.new_tab().await?;
        self.driver.switch_to_window(handle).await?;
        Ok(())
    }

    /// Close the current window. The session stays alive if other windows
    /// remain open.
    pub async fn close(&self) -> E2eResult<()> {
        self.driver.close_window().await?;
        Ok(())
    }

    /// End the session. Failures are logged, never returned: by the time a
    /// session is torn down the scenario outcome is already decided.
    pub async fn quit(self) {
        if let Err(e) = self.driver.quit().await {
            warn!("Failed to quit WebDriver session: {}", e);
        }
    }

    pub async fn add_todo(&self, text: &str) -> E2eResult<()> {
        let input = self.driver.find(By::Css(TODO_INPUT)).await?;
        input.send_keys(text).await?;
        self.press(Key::Enter).await?;
        info!("Added todo '{}'", text);
        Ok(())
    }

    /// Labels whose text contains `text`. Substring match, may be empty.
    pub async fn todos_by_text(&self, text: &str) -> E2eResult<Vec<WebElement>> {
        let xpath = format!("//label[contains(text(), {})]", xpath_literal(text));
        Ok(self.driver.find_all(By::XPath(xpath.as_str())).await?)
    }

    pub async fn complete_todo(&self, text: &str) -> E2eResult<()> {
        let label = self.first_todo(text).await?;
        label.find(By::XPath("./../input")).await?.click().await?;
        Ok(())
    }

    /// Replace the text of the first todo matching `target` and commit with
    /// Enter. An empty replacement makes the application delete the todo.
    pub async fn edit_todo(&self, target: &str, replacement: &str) -> E2eResult<()> {
        self.edit(target, replacement, Key::Enter).await
    }

    /// Type a replacement into the first todo matching `target`, then
    /// abandon the edit with Escape.
    pub async fn edit_todo_and_escape(&self, target: &str, replacement: &str) -> E2eResult<()> {
        self.edit(target, replacement, Key::Escape).await
    }

    async fn edit(&self, target: &str, replacement: &str, finish: Key) -> E2eResult<()> {
        let label = self.first_todo(target).await?;
        self.driver
            .action_chain()
            .double_click_element(&label)
            .perform()
            .await?;

        let field = self.driver.active_element().await?;
        self.clear_field(&field).await?;
        field.send_keys(replacement).await?;
        self.press(finish).await
    }

    /// Backspace the focused field until it reads empty, giving up after
    /// `clear_attempts` rounds.
    async fn clear_field(&self, field: &WebElement) -> E2eResult<()> {
        let mut remaining = field.value().await?.unwrap_or_default();

        for _ in 0..self.clear_attempts {
            if remaining.is_empty() {
                return Ok(());
            }

            let mut chain = self.driver.action_chain().key_down(Key::End).key_up(Key::End);
            for _ in 0..remaining.chars().count() {
                chain = chain.key_down(Key::Backspace).key_up(Key::Backspace);
            }
            chain.perform().await?;

            remaining = field.value().await?.unwrap_or_default();
        }

        if remaining.is_empty() {
            Ok(())
        } else {
            Err(E2eError::EditFieldNotCleared {
                remaining,
                attempts: self.clear_attempts,
            })
        }
    }

    pub async fn input_has_focus(&self) -> E2eResult<bool> {
        let input = self.driver.find(By::Css(TODO_INPUT)).await?;
        let active = self.driver.active_element().await?;
        Ok(input.element_id() == active.element_id())
    }

    /// Click the toggle-all control. This flips state relative to what the
    /// control shows; it does not force a particular state.
    pub async fn toggle_all(&self) -> E2eResult<()> {
        self.driver.find(By::Id(TOGGLE_ALL)).await?.click().await?;
        Ok(())
    }

    /// Whether the first todo matching `text` is completed. Unmatched text
    /// reads as not completed.
    pub async fn todo_is_completed(&self, text: &str) -> E2eResult<bool> {
        let Some(label) = self.todos_by_text(text).await?.into_iter().next() else {
            return Ok(false);
        };
        let item = label.find(By::XPath("./../..")).await?;
        Ok(item.class_name().await?.as_deref() == Some("completed"))
    }

    pub async fn clear_completed_is_visible(&self) -> E2eResult<bool> {
        Ok(!self.find_clear_completed().await?.is_empty())
    }

    /// Click "Clear completed" if it is rendered
    pub async fn clear_completed(&self) -> E2eResult<()> {
        if let Some(button) = self.find_clear_completed().await?.into_iter().next() {
            button.click().await?;
        }
        Ok(())
    }

    /// Only rendered while at least one todo is completed
    async fn find_clear_completed(&self) -> E2eResult<Vec<WebElement>> {
        Ok(self.driver.find_all(By::ClassName(CLEAR_COMPLETED)).await?)
    }

    /// Hover the first todo matching `text` and click its own delete button
    pub async fn delete_todo_by_text(&self, text: &str) -> E2eResult<()> {
        let label = self.first_todo(text).await?;
        let item = label.find(By::XPath("./../..")).await?;
        self.driver
            .action_chain()
            .move_to_element_center(&item)
            .perform()
            .await?;
        item.find(By::ClassName(DESTROY)).await?.click().await?;
        info!("Deleted todo '{}'", text);
        Ok(())
    }

    /// Raw counter text, e.g. "2 items left"
    pub async fn count_data(&self) -> E2eResult<String> {
        Ok(self.driver.find(By::ClassName(COUNTER)).await?.text().await?)
    }

    pub async fn item_count(&self) -> E2eResult<ItemCount> {
        ItemCount::parse(&self.count_data().await?)
    }

    /// Number of rendered list items under the current filter
    pub async fn visible_todo_count(&self) -> E2eResult<usize> {
        let selector = format!("{} li", TODO_LIST);
        Ok(self.driver.find_all(By::Css(selector.as_str())).await?.len())
    }

    pub async fn filter_todos(&self, filter: Filter) -> E2eResult<()> {
        self.visit_url(&route_url(&self.base_url, filter)).await
    }

    /// Hash route of the current page without the leading `#`, e.g. `/active`
    pub async fn current_route(&self) -> E2eResult<String> {
        let url = self.driver.current_url().await?;
        Ok(url.fragment().unwrap_or_default().to_string())
    }

    /// Todos as persisted by the application in localStorage
    pub async fn stored_todos(&self) -> E2eResult<Vec<StoredTodo>> {
        let script = format!("return window.localStorage.getItem('{}');", STORAGE_KEY);
        let ret = self.driver.execute(script.as_str(), Vec::new()).await?;
        match ret.json() {
            serde_json::Value::String(raw) => Ok(serde_json::from_str(raw)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn first_todo(&self, text: &str) -> E2eResult<WebElement> {
        self.todos_by_text(text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::TodoNotFound(text.to_string()))
    }

    async fn press(&self, key: Key) -> E2eResult<()> {
        self.driver
            .action_chain()
            .key_down(key.clone())
            .key_up(key)
            .perform()
            .await?;
        Ok(())
    }
}

/// Full URL for `filter` on an application served at `base_url`
pub fn route_url(base_url: &str, filter: Filter) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), filter.route())
}

/// Quote `text` as an XPath 1.0 string literal.
///
/// XPath has no escape character, so text holding both quote kinds is split
/// and rebuilt with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }

    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
