use crate::web::error::ApiError;
use anyhow::Context;
use hyper::{Body, Server};
use serde::Serialize;
use std::convert::Infallible;
use std::env;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::str::FromStr;
use std::task::Poll;
use std::time::Duration;
use tower::{Service, ServiceBuilder};
use tracing::{Instrument, Span, debug_span};
use warp::http::header::CONTENT_TYPE;
use warp::http::{HeaderValue, Request, StatusCode};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply, reply};

/// Environment variable naming the address the HTTP server binds to.
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";

/// Default time granted to in-flight requests and background work after the server stopped.
pub const SHUTDOWN_DRAIN_PERIOD: Duration = Duration::from_secs(3);

pub fn with_cloneable<C: Clone + Send>(
    value: C,
) -> impl Filter<Extract = (C,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

pub fn into_response<S: Serialize>(result: anyhow::Result<S>) -> Result<impl Reply, Rejection> {
    let data = result
        .and_then(|data| serde_json::to_vec(&data).context("Failed to serialize data"))
        .map_err(into_rejection)?;

    let mut res = Response::new(data.into());
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(res)
}

pub fn into_rejection(err: anyhow::Error) -> Rejection {
    match err.downcast_ref::<ApiError>() {
        Some(api_error) => warp::reject::custom(api_error.clone()),
        None => warp::reject::custom(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{:#}", err),
        )),
    }
}

pub(crate) async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(err) = err.find::<ApiError>() {
        Ok(reply::with_status(reply::json(&err), err.status))
    } else {
        Err(err)
    }
}

#[macro_export]
macro_rules! routes {
    [$route:expr] => {
        $route
    };
    [$route:expr, $($rest:expr),+] => {
        ::warp::Filter::or($route, $crate::routes![$($rest),+])
    };
}

/// Reads and parses the `BIND_ADDRESS` environment variable.
pub fn bind_address_from_env() -> anyhow::Result<SocketAddr> {
    let bind_address = env::var(BIND_ADDRESS)
        .context("Failed to read bind address. Please provide BIND_ADDRESS in the environment")?;

    SocketAddr::from_str(&bind_address).context("Failed to parse bind address.")
}

/// Serves the given routes on `bind_address` until `shutdown` completes, then waits for
/// `drain_period` before returning.
pub async fn serve<F>(
    routes: F,
    bind_address: SocketAddr,
    shutdown: impl Future<Output = ()>,
    drain_period: Duration,
) -> anyhow::Result<()>
where
    F: Filter + Clone + Send + Sync + 'static,
    F::Extract: Reply,
    F::Error: Into<Rejection> + 'static,
{
    tracing::info!("Starting server at {}", bind_address);

    let filter = routes.boxed().recover(handle_rejection);

    let svc = warp::service(filter);
    let traced_svc = ServiceBuilder::new()
        .layer_fn(|inner| TracingMiddleware { inner })
        .service(svc);

    let server = Server::try_bind(&bind_address)
        .with_context(|| format!("Failed to bind HTTP server to {}", bind_address))?
        .serve(hyper::service::make_service_fn(move |_| {
            let svc = traced_svc.clone();
            async move { Ok::<_, Infallible>(svc) }
        }));

    tracing::info!(
        "Running HTTP server at effective address {}",
        server.local_addr()
    );
    server
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP Server has been stopped...");
    if !drain_period.is_zero() {
        tokio::time::sleep(drain_period).await;
    }
    tracing::info!("HTTP Server has been terminated.");

    Ok(())
}

#[derive(Clone)]
struct TracingMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = debug_span!(
            "http_request",
            app = crate::APP_NAME.as_str(),
            http.method = %method,
            http.url = %path,
            http.status_code = tracing::field::Empty,
        );

        let mut inner = self.inner.clone();

        let fut = async move {
            let response = inner.call(req).await?;
            let status = response.status().as_u16();
            Span::current().record("http.status_code", status as i64);
            Ok(response)
        }
        .instrument(span);

        Box::pin(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn api_errors_are_rendered_with_their_status() {
        let route = warp::path("fail")
            .and_then(|| async {
                Err::<String, _>(into_rejection(
                    anyhow::anyhow!("Nope").context(ApiError::new(StatusCode::FORBIDDEN, "Nope")),
                ))
            })
            .recover(handle_rejection);

        let res = warp::test::request().path("/fail").reply(&route).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.body(), r#"{"message":"Nope"}"#);
    }

    #[tokio::test]
    async fn unexpected_errors_become_internal_server_errors() {
        let rejection = into_rejection(anyhow::anyhow!("Boom"));
        let api_error = rejection.find::<ApiError>().unwrap();

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.message, "Boom");
    }

    #[tokio::test]
    async fn into_response_renders_json() {
        let route = warp::path("data")
            .map(|| into_response(Ok(serde_json::json!({"size": 2}))))
            .and_then(|res| async move { res });

        let res = warp::test::request().path("/data").reply(&route).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(res.body(), r#"{"size":2}"#);
    }
}
