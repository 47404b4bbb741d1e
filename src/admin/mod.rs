//! Operator facing tasks, triggered via `POST /tasks/{name}`.
//!
//! A [`Task`] receives the query parameters of the request as a multimap and writes a human
//! readable report into the response body:
//!
//! ```text
//! $ curl -X POST 'localhost:8081/tasks/invalidate-auth-cache?credentials=Bearer%20xyz'
//! Invalidating 1 cached principal(s)...
//! Done!
//! ```

use crate::status_bail;
use crate::web::warp::{into_rejection, into_response, with_cloneable};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use warp::Filter;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;

mod invalidation;

pub use invalidation::CacheInvalidationTask;

/// Query parameters of a task invocation. Repeated parameters keep all their values.
pub type TaskParameters = HashMap<String, Vec<String>>;

#[async_trait]
pub trait Task: Send + Sync {
    /// The name under which the task is reachable.
    fn name(&self) -> &str;

    async fn execute(&self, params: &TaskParameters, output: &mut String) -> anyhow::Result<()>;
}

/// Keeps all known tasks by name.
#[derive(Default, Clone)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task, replacing any task previously registered under the same name.
    pub fn register(&mut self, task: Arc<dyn Task>) {
        if self.tasks.insert(task.name().to_string(), task.clone()).is_some() {
            tracing::warn!("Replacing already registered task '{}'", task.name());
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.tasks.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs the named task and returns its output.
    pub async fn execute(&self, name: &str, params: &TaskParameters) -> anyhow::Result<String> {
        let Some(task) = self.tasks.get(name) else {
            status_bail!(StatusCode::NOT_FOUND, "Unknown task: {}", name);
        };

        tracing::info!("Executing task '{}'...", name);
        let mut output = String::new();
        if let Err(err) = task.execute(params, &mut output).await {
            tracing::error!("Task '{}' failed: {:#}", name, err);
            return Err(err);
        }

        Ok(output)
    }
}

/// `GET /tasks` lists all task names, `POST /tasks/{name}` executes a task.
pub fn routes(registry: Arc<TaskRegistry>) -> BoxedFilter<(impl warp::Reply,)> {
    list_tasks_route(registry.clone())
        .or(execute_task_route(registry))
        .boxed()
}

fn list_tasks_route(registry: Arc<TaskRegistry>) -> BoxedFilter<(impl warp::Reply,)> {
    warp::path!("tasks")
        .and(warp::get())
        .and(with_cloneable(registry))
        .and_then(|registry: Arc<TaskRegistry>| async move { into_response(Ok(registry.names())) })
        .boxed()
}

fn execute_task_route(registry: Arc<TaskRegistry>) -> BoxedFilter<(impl warp::Reply,)> {
    warp::path!("tasks" / String)
        .and(warp::post())
        .and(
            warp::query::<Vec<(String, String)>>()
                .or(warp::any().map(Vec::new))
                .unify(),
        )
        .and(with_cloneable(registry))
        .and_then(handle_execute_task)
        .boxed()
}

#[tracing::instrument(level = "debug", name = "POST /tasks", skip(query, registry))]
async fn handle_execute_task(
    task: String,
    query: Vec<(String, String)>,
    registry: Arc<TaskRegistry>,
) -> Result<String, warp::Rejection> {
    registry
        .execute(&task, &into_parameters(query))
        .await
        .map_err(into_rejection)
}

fn into_parameters(query: Vec<(String, String)>) -> TaskParameters {
    let mut params = TaskParameters::new();
    for (key, value) in query {
        params.entry(key).or_default().push(value);
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::warp::handle_rejection;
    use std::fmt::Write;

    struct Echo;

    #[async_trait]
    impl Task for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            params: &TaskParameters,
            output: &mut String,
        ) -> anyhow::Result<()> {
            let mut keys = params.keys().collect::<Vec<_>>();
            keys.sort();
            for key in keys {
                writeln!(output, "{}={}", key, params[key].join(","))?;
            }

            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Task for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn execute(&self, _: &TaskParameters, _: &mut String) -> anyhow::Result<()> {
            anyhow::bail!("Disk on fire")
        }
    }

    fn registry() -> Arc<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Broken));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn tasks_receive_repeated_parameters() {
        let filter = routes(registry()).recover(handle_rejection);

        let res = warp::test::request()
            .method("POST")
            .path("/tasks/echo?b=2&a=1&b=3")
            .reply(&filter)
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), "a=1\nb=2,3\n");
    }

    #[tokio::test]
    async fn tasks_can_be_invoked_without_parameters() {
        let filter = routes(registry()).recover(handle_rejection);

        let res = warp::test::request()
            .method("POST")
            .path("/tasks/echo")
            .reply(&filter)
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), "");
    }

    #[tokio::test]
    async fn unknown_tasks_yield_not_found() {
        let filter = routes(registry()).recover(handle_rejection);

        let res = warp::test::request()
            .method("POST")
            .path("/tasks/reboot")
            .reply(&filter)
            .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), r#"{"message":"Unknown task: reboot"}"#);
    }

    #[tokio::test]
    async fn failing_tasks_yield_server_errors() {
        let filter = routes(registry()).recover(handle_rejection);

        let res = warp::test::request()
            .method("POST")
            .path("/tasks/broken")
            .reply(&filter)
            .await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn task_names_are_listed() {
        let filter = routes(registry()).recover(handle_rejection);

        let res = warp::test::request()
            .method("GET")
            .path("/tasks")
            .reply(&filter)
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), r#"["broken","echo"]"#);
    }
}
