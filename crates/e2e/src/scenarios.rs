//! Regression scenarios for the TodoMVC Vanilla JS application, following the
//! TodoMVC functional specification:
//! <https://github.com/tastejs/todomvc/blob/master/app-spec.md#functionality>
//!
//! Each scenario receives a freshly opened [`TodoMvc`] and the sample texts
//! from the public properties. Sessions are opened and torn down by the
//! runner, never by a scenario.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{E2eResult, ScenarioError, ScenarioResult};
use crate::properties::{Properties, PropertyName, PropertySet};
use crate::todomvc::{Filter, TodoMvc};

/// Fail the scenario with an assertion error unless `cond` holds
macro_rules! check {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(ScenarioError::Assertion(format!($($arg)+)));
        }
    };
}

pub type ScenarioFn = for<'a> fn(&'a TodoMvc, &'a SampleTodos) -> BoxFuture<'a, ScenarioResult>;

/// A named, tagged regression scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    pub body: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }
}

/// Sample todo texts, resolved before any browser is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTodos {
    pub one: String,
    pub two: String,
    pub three: String,
}

impl SampleTodos {
    pub fn from_properties(properties: &Properties) -> E2eResult<Self> {
        let text = |name| {
            properties
                .require(PropertySet::Public, name)
                .map(str::to_string)
        };
        Ok(Self {
            one: text(PropertyName::SampleTodoOne)?,
            two: text(PropertyName::SampleTodoTwo)?,
            three: text(PropertyName::SampleTodoThree)?,
        })
    }

    pub fn all(&self) -> [&str; 3] {
        [self.one.as_str(), self.two.as_str(), self.three.as_str()]
    }
}

/// Every scenario in suite order
pub fn all() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "add_todo",
            description: "A new todo is listed and the input keeps focus",
            tags: &["smoke", "new-todo"],
            body: add_todo,
        },
        Scenario {
            name: "blank_todo_is_ignored",
            description: "Submitting an empty input adds nothing",
            tags: &["new-todo"],
            body: blank_todo_is_ignored,
        },
        Scenario {
            name: "complete_all_toggle",
            description: "Toggle-all completes every todo, then reactivates them",
            tags: &["toggle-all"],
            body: complete_all_toggle,
        },
        Scenario {
            name: "toggle_all_after_one_completed",
            description: "Toggle-all never reverts an already completed todo",
            tags: &["toggle-all"],
            body: toggle_all_after_one_completed,
        },
        Scenario {
            name: "clear_completed",
            description: "Clear completed appears once something is done and removes it",
            tags: &["smoke", "clear-completed"],
            body: clear_completed,
        },
        Scenario {
            name: "edit_todo",
            description: "Double-click editing replaces the todo text",
            tags: &["editing"],
            body: edit_todo,
        },
        Scenario {
            name: "edit_todo_to_empty_removes_it",
            description: "Committing an empty edit deletes the todo",
            tags: &["editing"],
            body: edit_todo_to_empty_removes_it,
        },
        Scenario {
            name: "escaped_edit_reverts",
            description: "Escape abandons an edit and keeps the original text",
            tags: &["editing"],
            body: escaped_edit_reverts,
        },
        Scenario {
            name: "remove_todo",
            description: "Each todo's delete button removes exactly that todo",
            tags: &["smoke", "item"],
            body: remove_todo,
        },
        Scenario {
            name: "counter_is_dynamic",
            description: "The counter tracks active todos and pluralizes",
            tags: &["counter"],
            body: counter_is_dynamic,
        },
        Scenario {
            name: "todos_persist_across_tabs",
            description: "Todos survive opening the app again in a new tab",
            tags: &["persistence"],
            body: todos_persist_across_tabs,
        },
        Scenario {
            name: "todos_persist_in_local_storage",
            description: "Todos are written to localStorage with their status",
            tags: &["persistence"],
            body: todos_persist_in_local_storage,
        },
        Scenario {
            name: "route_filtering",
            description: "Active, completed and all routes partition todos",
            tags: &["smoke", "routing"],
            body: route_filtering,
        },
    ]
}

async fn is_listed(app: &TodoMvc, text: &str) -> E2eResult<bool> {
    Ok(!app.todos_by_text(text).await?.is_empty())
}

async fn add_all(app: &TodoMvc, texts: &[&str]) -> E2eResult<()> {
    for text in texts {
        app.add_todo(text).await?;
    }
    Ok(())
}

fn add_todo<'a>(app: &'a TodoMvc, todos: &'a SampleTodos) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo(&todos.one).await?;
        check!(is_listed(app, &todos.one).await?, "'{}' was not listed after adding", todos.one);
        check!(app.input_has_focus().await?, "input lost focus after adding a todo");
        Ok(())
    }
    .boxed()
}

fn blank_todo_is_ignored<'a>(
    app: &'a TodoMvc,
    _todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo("").await?;
        let count = app.visible_todo_count().await?;
        check!(count == 0, "blank input added {} todo(s)", count);
        Ok(())
    }
    .boxed()
}

fn complete_all_toggle<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        let texts = todos.all();
        add_all(app, &texts).await?;

        app.toggle_all().await?;
        for text in texts {
            check!(app.todo_is_completed(text).await?, "'{}' not completed after toggle-all", text);
        }

        app.toggle_all().await?;
        for text in texts {
            check!(
                !app.todo_is_completed(text).await?,
                "'{}' still completed after second toggle-all",
                text
            );
        }
        Ok(())
    }
    .boxed()
}

fn toggle_all_after_one_completed<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        let texts = todos.all();
        add_all(app, &texts).await?;

        app.complete_todo(texts[0]).await?;
        check!(
            app.todo_is_completed(texts[0]).await?,
            "'{}' not completed after clicking its checkbox",
            texts[0]
        );

        app.toggle_all().await?;
        for text in texts {
            check!(app.todo_is_completed(text).await?, "'{}' not completed after toggle-all", text);
        }
        Ok(())
    }
    .boxed()
}

fn clear_completed<'a>(app: &'a TodoMvc, todos: &'a SampleTodos) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo(&todos.one).await?;
        check!(
            !app.clear_completed_is_visible().await?,
            "clear completed shown with nothing completed"
        );

        app.complete_todo(&todos.one).await?;
        check!(
            app.clear_completed_is_visible().await?,
            "clear completed hidden after completing '{}'",
            todos.one
        );

        app.clear_completed().await?;
        check!(
            !is_listed(app, &todos.one).await?,
            "'{}' still listed after clearing completed",
            todos.one
        );
        Ok(())
    }
    .boxed()
}

fn edit_todo<'a>(app: &'a TodoMvc, todos: &'a SampleTodos) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo(&todos.one).await?;
        app.edit_todo(&todos.one, &todos.two).await?;
        check!(is_listed(app, &todos.two).await?, "'{}' not listed after editing", todos.two);
        check!(
            !is_listed(app, &todos.one).await?,
            "'{}' still listed after editing it away",
            todos.one
        );
        Ok(())
    }
    .boxed()
}

fn edit_todo_to_empty_removes_it<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo(&todos.one).await?;
        app.edit_todo(&todos.one, "").await?;
        check!(!is_listed(app, &todos.one).await?, "'{}' survived an empty edit", todos.one);
        Ok(())
    }
    .boxed()
}

fn escaped_edit_reverts<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo(&todos.one).await?;
        app.edit_todo_and_escape(&todos.one, &todos.two).await?;
        check!(is_listed(app, &todos.one).await?, "'{}' lost after escaping an edit", todos.one);
        check!(!is_listed(app, &todos.two).await?, "escaped edit still applied '{}'", todos.two);
        Ok(())
    }
    .boxed()
}

fn remove_todo<'a>(app: &'a TodoMvc, todos: &'a SampleTodos) -> BoxFuture<'a, ScenarioResult> {
    async move {
        add_all(app, &[todos.one.as_str(), todos.two.as_str()]).await?;

        app.delete_todo_by_text(&todos.one).await?;
        check!(
            !is_listed(app, &todos.one).await?,
            "'{}' still listed after deleting it",
            todos.one
        );
        check!(
            is_listed(app, &todos.two).await?,
            "deleting '{}' also removed '{}'",
            todos.one,
            todos.two
        );

        app.delete_todo_by_text(&todos.two).await?;
        check!(
            !is_listed(app, &todos.two).await?,
            "'{}' still listed after deleting it",
            todos.two
        );
        Ok(())
    }
    .boxed()
}

fn counter_is_dynamic<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        app.add_todo(&todos.one).await?;
        let text = app.count_data().await?;
        check!(text.contains('1'), "counter '{}' does not show 1", text);
        check!(
            text.contains("item") && !text.contains("items"),
            "counter '{}' is not singular",
            text
        );

        app.add_todo(&todos.two).await?;
        let text = app.count_data().await?;
        check!(text.contains('2'), "counter '{}' does not show 2", text);
        check!(text.contains("items"), "counter '{}' is not plural", text);

        app.add_todo(&todos.three).await?;
        let count = app.item_count().await?;
        check!(count.remaining == 3, "counter reports {} remaining, expected 3", count.remaining);
        check!(
            count.is_correctly_pluralized(),
            "counter noun '{}' wrong for {}",
            count.noun,
            count.remaining
        );
        Ok(())
    }
    .boxed()
}

fn todos_persist_across_tabs<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        add_all(app, &[todos.one.as_str(), todos.two.as_str()]).await?;

        app.open_new_tab().await?;
        app.visit().await?;

        check!(is_listed(app, &todos.one).await?, "'{}' missing in new tab", todos.one);
        check!(is_listed(app, &todos.two).await?, "'{}' missing in new tab", todos.two);

        // The original tab stays open, so the session survives for teardown
        app.close().await?;
        Ok(())
    }
    .boxed()
}

fn todos_persist_in_local_storage<'a>(
    app: &'a TodoMvc,
    todos: &'a SampleTodos,
) -> BoxFuture<'a, ScenarioResult> {
    async move {
        let texts = todos.all();
        add_all(app, &texts).await?;
        app.complete_todo(texts[1]).await?;

        let stored = app.stored_todos().await?;
        check!(
            stored.len() == texts.len(),
            "{} todos stored, expected {}",
            stored.len(),
            texts.len()
        );
        for text in texts {
            let Some(todo) = stored.iter().find(|t| t.title == text) else {
                return Err(ScenarioError::Assertion(format!("'{}' not in localStorage", text)));
            };
            let expected = text == texts[1];
            check!(
                todo.completed == expected,
                "'{}' stored with completed={}",
                text,
                todo.completed
            );
        }
        Ok(())
    }
    .boxed()
}

fn route_filtering<'a>(app: &'a TodoMvc, todos: &'a SampleTodos) -> BoxFuture<'a, ScenarioResult> {
    async move {
        let texts = todos.all();
        add_all(app, &texts).await?;
        app.complete_todo(texts[1]).await?;

        let expectations = [
            (Filter::Completed, "/completed", [false, true, false]),
            (Filter::Active, "/active", [true, false, true]),
            (Filter::All, "/", [true, true, true]),
        ];

        for (filter, route, visible) in expectations {
            app.filter_todos(filter).await?;

            let current = app.current_route().await?;
            check!(current == route, "{} filter landed on route '{}'", filter, current);

            for (text, expected) in texts.iter().zip(visible) {
                let listed = is_listed(app, text).await?;
                check!(
                    listed == expected,
                    "'{}' {} under {} filter",
                    text,
                    if listed { "shown" } else { "hidden" },
                    filter
                );
            }
        }
        Ok(())
    }
    .boxed()
}
