//! The ordered registry of managed components.

use crate::lifecycle::{LifecycleListener, Managed};
use crate::tools::panic_message;
use crate::tools::watch::Watch;
use futures_util::FutureExt;
use std::fmt::{Display, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// The states of a [`LifecycleRegistry`].
///
/// `Created -> Started | Failed -> Stopped`, where `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    /// A component failed to start. Components started before it are still running.
    Failed,
    Stopped,
}

/// A component which failed to stop, along with its error.
#[derive(Debug)]
pub struct StopFailure {
    pub component: String,
    pub error: anyhow::Error,
}

impl Display for StopFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:#}", self.component, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot register '{0}': the lifecycle is no longer accepting components")]
    NotAccepting(String),
    #[error("The lifecycle has already been started")]
    AlreadyStarted,
    #[error("The lifecycle has already been stopped and cannot be restarted")]
    Stopped,
    #[error("Failed to start '{component}': {source:#}")]
    Start {
        component: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{} component(s) failed to stop: {}", .failures.len(), join_failures(.failures))]
    Stop { failures: Vec<StopFailure> },
}

fn join_failures(failures: &[StopFailure]) -> String {
    failures
        .iter()
        .map(StopFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Starts and stops [`Managed`] components in a deterministic order.
///
/// Components are started in registration order and stopped in the exact reverse order. A
/// registry is single use: once stopped it cannot be started again.
pub struct LifecycleRegistry {
    components: Vec<Arc<dyn Managed>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    state: LifecycleState,
    attempted: usize,
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        LifecycleRegistry {
            components: Vec::new(),
            listeners: Vec::new(),
            state: LifecycleState::Created,
            attempted: 0,
        }
    }

    /// Appends a component. Only permitted before the lifecycle has been started.
    pub fn register(&mut self, component: Arc<dyn Managed>) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Created {
            return Err(LifecycleError::NotAccepting(component.name()));
        }

        tracing::debug!("Registered managed component '{}'", component.name());
        self.components.push(component);
        Ok(())
    }

    /// Registers the given component and returns a shared handle to it.
    pub fn manage<M: Managed + 'static>(&mut self, component: M) -> Result<Arc<M>, LifecycleError> {
        let component = Arc::new(component);
        self.register(component.clone())?;
        Ok(component)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Starts all components in registration order.
    ///
    /// The first failure aborts the sequence, the remaining components are not started. The
    /// caller decides whether to unwind via [`stop_all`](Self::stop_all), which then stops every
    /// component whose start was attempted.
    pub async fn start_all(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Created => {}
            LifecycleState::Started | LifecycleState::Failed => {
                return Err(LifecycleError::AlreadyStarted);
            }
            LifecycleState::Stopped => return Err(LifecycleError::Stopped),
        }

        tracing::info!("Starting {} managed component(s)...", self.components.len());
        self.notify(|listener| listener.lifecycle_starting());

        let components = self.components.clone();
        for (index, component) in components.iter().enumerate() {
            let name = component.name();
            self.attempted = index + 1;

            let watch = Watch::start();
            if let Err(err) = component.start().await {
                tracing::error!("Failed to start '{}': {:#}", name, err);
                self.state = LifecycleState::Failed;
                self.notify(|listener| listener.lifecycle_failure(&name, &err));

                return Err(LifecycleError::Start {
                    component: name,
                    source: err,
                });
            }
            tracing::debug!("Started '{}' in {} µs", name, watch.elapsed_us());
        }

        self.state = LifecycleState::Started;
        self.notify(|listener| listener.lifecycle_started());
        tracing::info!("All managed components have been started.");

        Ok(())
    }

    /// Stops every component whose start was attempted, in reverse registration order.
    ///
    /// A failing (or panicking) component never prevents the remaining ones from being stopped.
    /// All failures are logged and reported together once every component was stopped. Stopping
    /// an already stopped registry is a no-op.
    pub async fn stop_all(&mut self) -> Result<(), LifecycleError> {
        if self.state == LifecycleState::Stopped {
            return Ok(());
        }

        tracing::info!("Stopping {} managed component(s)...", self.attempted);
        self.notify(|listener| listener.lifecycle_stopping());

        let mut failures = Vec::new();
        let started = self.components[..self.attempted].to_vec();
        for component in started.iter().rev() {
            let name = component.name();
            let outcome = AssertUnwindSafe(component.stop()).catch_unwind().await;

            let error = match outcome {
                Ok(Ok(())) => {
                    tracing::debug!("Stopped '{}'", name);
                    continue;
                }
                Ok(Err(err)) => err,
                Err(panic) => {
                    anyhow::anyhow!("Panicked while stopping: {}", panic_message(panic.as_ref()))
                }
            };

            tracing::error!("Failed to stop '{}': {:#}", name, error);
            failures.push(StopFailure {
                component: name,
                error,
            });
        }

        self.state = LifecycleState::Stopped;
        self.notify(|listener| listener.lifecycle_stopped());

        if failures.is_empty() {
            tracing::info!("All managed components have been stopped.");
            Ok(())
        } else {
            Err(LifecycleError::Stop { failures })
        }
    }

    fn notify(&self, callback: impl Fn(&dyn LifecycleListener)) {
        for listener in &self.listeners {
            callback(listener.as_ref());
        }
    }
}
