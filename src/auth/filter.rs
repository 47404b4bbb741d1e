//! Warp filters resolving the principal of a request.
//!
//! Credentials are taken from the `Authorization` header and handed to an [`Authenticator`].
//! Missing or unparsable credentials and rejected credentials yield `401 Unauthorized`, while
//! a failing authenticator yields `500 Internal Server Error`.

use crate::auth::credentials::{BasicCredentials, bearer_token};
use crate::auth::Authenticator;
use crate::status_bail;
use crate::web::error::ResultExt;
use crate::web::warp::{into_rejection, with_cloneable};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection};

/// Turns the raw `Authorization` header into credentials.
pub type CredentialsParser<C> = fn(&str) -> Option<C>;

/// Parses `Authorization: Basic ...` headers.
pub fn basic_credentials() -> CredentialsParser<BasicCredentials> {
    BasicCredentials::from_header
}

/// Parses `Authorization: Bearer ...` headers.
pub fn bearer_credentials() -> CredentialsParser<String> {
    bearer_token
}

/// Extracts the authenticated principal or rejects the request.
pub fn with_principal<C, P>(
    authenticator: Arc<dyn Authenticator<C, P>>,
    parser: CredentialsParser<C>,
) -> impl Filter<Extract = (P,), Error = Rejection> + Clone
where
    C: Send + Sync + 'static,
    P: Send + 'static,
{
    warp::any()
        .and(warp::header::optional::<String>(
            warp::http::header::AUTHORIZATION.as_str(),
        ))
        .and(with_cloneable(authenticator))
        .and(with_cloneable(parser))
        .and_then(
            |authorization: Option<String>,
             authenticator: Arc<dyn Authenticator<C, P>>,
             parser: CredentialsParser<C>| async move {
                resolve_principal(authorization, authenticator, parser)
                    .await
                    .map_err(into_rejection)
            },
        )
}

async fn resolve_principal<C, P>(
    authorization: Option<String>,
    authenticator: Arc<dyn Authenticator<C, P>>,
    parser: CredentialsParser<C>,
) -> anyhow::Result<P> {
    let Some(authorization) = authorization else {
        status_bail!(StatusCode::UNAUTHORIZED, "No credentials present.");
    };
    let Some(credentials) = parser(&authorization) else {
        status_bail!(StatusCode::UNAUTHORIZED, "Invalid credentials present.");
    };

    match authenticator.authenticate(&credentials).await {
        Ok(Some(principal)) => Ok(principal),
        Ok(None) => status_bail!(
            StatusCode::UNAUTHORIZED,
            "Credentials are required to access this resource."
        ),
        Err(err) => {
            tracing::error!("Error authenticating credentials: {}", err);
            Err(anyhow::Error::new(err))
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
