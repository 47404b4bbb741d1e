//! Bootstraps an application around its managed lifecycle.
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     ballast::logging::initialize()?;
//!
//!     let mut app = Application::new();
//!     let cache = Arc::new(CachingAuthenticator::new(backend, CachePolicy::from_env()?));
//!     app.add_task(Arc::new(CacheInvalidationTask::new("invalidate-auth-cache", cache.clone(), basic_credentials())));
//!     app.manage(TaskSetManager::from_env("workers")?)?;
//!
//!     app.run(routes(cache)).await
//! }
//! ```

use crate::admin::{self, Task, TaskRegistry};
use crate::lifecycle::{LifecycleError, LifecycleListener, LifecycleRegistry, Managed};
use crate::tools::system;
use crate::web::warp::{SHUTDOWN_DRAIN_PERIOD, bind_address_from_env, serve};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use warp::{Filter, Rejection, Reply};

/// Owns the lifecycle and the admin tasks of a service.
pub struct Application {
    lifecycle: LifecycleRegistry,
    tasks: TaskRegistry,
    drain_period: Duration,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Application {
            lifecycle: LifecycleRegistry::new(),
            tasks: TaskRegistry::new(),
            drain_period: SHUTDOWN_DRAIN_PERIOD,
        }
    }

    /// Sets how long to wait between stopping the HTTP server and stopping the components.
    pub fn with_drain_period(mut self, drain_period: Duration) -> Self {
        self.drain_period = drain_period;
        self
    }

    /// Registers a managed component, see [`LifecycleRegistry::manage`].
    pub fn manage<M: Managed + 'static>(
        &mut self,
        component: M,
    ) -> Result<Arc<M>, LifecycleError> {
        self.lifecycle.manage(component)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.lifecycle.add_listener(listener);
    }

    pub fn add_task(&mut self, task: Arc<dyn Task>) {
        self.tasks.register(task);
    }

    pub fn lifecycle(&self) -> &LifecycleRegistry {
        &self.lifecycle
    }

    /// Starts all components, serves the given routes on `BIND_ADDRESS` until a termination
    /// signal arrives and finally stops all components again.
    pub async fn run<F, R>(self, routes: F) -> anyhow::Result<()>
    where
        F: Filter<Extract = (R,), Error = Rejection> + Clone + Send + Sync + 'static,
        R: Reply + Send,
    {
        let bind_address = bind_address_from_env()?;
        system::install_termination_listener();

        self.run_until(routes, bind_address, system::await_shutdown())
            .await
    }

    /// Like [`run`](Self::run), but binds to the given address and stops once `shutdown`
    /// completes.
    pub async fn run_until<F, R>(
        mut self,
        routes: F,
        bind_address: SocketAddr,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()>
    where
        F: Filter<Extract = (R,), Error = Rejection> + Clone + Send + Sync + 'static,
        R: Reply + Send,
    {
        tracing::info!(
            "Starting {} ({})...",
            crate::APP_NAME.as_str(),
            crate::APP_VERSION.as_str()
        );

        if let Err(err) = self.lifecycle.start_all().await {
            tracing::error!("Unable to start {}: {:#}", crate::APP_NAME.as_str(), err);
            if let Err(stop_err) = self.lifecycle.stop_all().await {
                tracing::warn!(
                    "Failed to unwind the partially started lifecycle: {:#}",
                    stop_err
                );
            }

            return Err(err.into());
        }

        let admin_routes = admin::routes(Arc::new(self.tasks));
        let served = serve(
            crate::routes![routes, admin_routes],
            bind_address,
            shutdown,
            self.drain_period,
        )
        .await;
        if let Err(err) = &served {
            tracing::error!("HTTP server terminated unexpectedly: {:#}", err);
        }

        if let Err(err) = self.lifecycle.stop_all().await {
            tracing::warn!("Not all components stopped cleanly: {:#}", err);
            return served.and(Err(err.into()));
        }

        tracing::info!("{} has been stopped.", crate::APP_NAME.as_str());
        served
    }
}
