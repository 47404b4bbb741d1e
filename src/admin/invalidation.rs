use crate::admin::{Task, TaskParameters};
use crate::auth::CachingAuthenticator;
use crate::auth::filter::CredentialsParser;
use crate::web::error::ResultExt;
use anyhow::Context;
use async_trait::async_trait;
use std::fmt::Write;
use std::hash::Hash;
use std::sync::Arc;

const CREDENTIALS_PARAMETER: &str = "credentials";

/// Clears a [`CachingAuthenticator`] on demand.
///
/// Without parameters the whole cache is dropped. Each `credentials` parameter is parsed like
/// an `Authorization` header and only the matching entries are removed.
pub struct CacheInvalidationTask<C: Hash + Eq, P> {
    name: String,
    cache: Arc<CachingAuthenticator<C, P>>,
    parser: CredentialsParser<C>,
}

impl<C: Hash + Eq, P> CacheInvalidationTask<C, P> {
    pub fn new(
        name: impl Into<String>,
        cache: Arc<CachingAuthenticator<C, P>>,
        parser: CredentialsParser<C>,
    ) -> Self {
        CacheInvalidationTask {
            name: name.into(),
            cache,
            parser,
        }
    }
}

#[async_trait]
impl<C, P> Task for CacheInvalidationTask<C, P>
where
    C: Hash + Eq + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, params: &TaskParameters, output: &mut String) -> anyhow::Result<()> {
        let credentials = params
            .get(CREDENTIALS_PARAMETER)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if credentials.is_empty() {
            writeln!(
                output,
                "Invalidating approximately {} cached principals...",
                self.cache.size()
            )?;
            self.cache.invalidate_all();
        } else {
            let parsed = credentials
                .iter()
                .map(|raw| {
                    (self.parser)(raw)
                        .with_context(|| format!("Cannot parse credentials: '{}'", raw))
                })
                .collect::<anyhow::Result<Vec<C>>>()
                .mark_client_error()?;

            writeln!(
                output,
                "Invalidating {} cached principal(s)...",
                parsed.len()
            )?;
            self.cache.invalidate_all_of(&parsed);
        }

        writeln!(output, "Done!")?;
        Ok(())
    }
}
