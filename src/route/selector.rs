use crate::config::PinningMode;
use crate::connection::ConnectionContext;
use crate::core::{RouteError, Result};
use rand::Rng;
use tracing::trace;

/// Picks the single data source a unicast statement runs on.
///
/// Once the connection has used (or prefers) some data sources, the choice is
/// drawn from those, which keeps a transaction on one physical source.
/// Randomness comes from the calling thread's generator; there is no shared
/// RNG state between routing calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSourceSelector {
    mode: PinningMode,
}

impl DataSourceSelector {
    pub fn new(mode: PinningMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PinningMode {
        self.mode
    }

    pub fn select(&self, candidates: &[String], connection: &ConnectionContext) -> Result<String> {
        self.select_with(&mut rand::thread_rng(), candidates, connection)
    }

    pub fn select_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        candidates: &[String],
        connection: &ConnectionContext,
    ) -> Result<String> {
        let pool = self.effective_pool(candidates, connection);
        if pool.is_empty() {
            return Err(RouteError::ConfigError(
                "No data source available for selection".into(),
            ));
        }

        let index = rng.gen_range(0..pool.len());
        let chosen = pool[index].to_string();
        trace!(
            connection_id = connection.id(),
            chosen = %chosen,
            pool_size = pool.len(),
            "Data source selected"
        );
        Ok(chosen)
    }

    fn effective_pool<'a>(&self, candidates: &'a [String], connection: &'a ConnectionContext) -> Vec<&'a str> {
        let pinned = connection.pinned_data_source_names();
        if pinned.is_empty() {
            return candidates.iter().map(String::as_str).collect();
        }

        match self.mode {
            PinningMode::Trusted => pinned.iter().map(String::as_str).collect(),
            PinningMode::CandidateFiltered => {
                let filtered: Vec<&str> = pinned
                    .iter()
                    .filter(|name| candidates.contains(name))
                    .map(String::as_str)
                    .collect();
                if filtered.is_empty() {
                    candidates.iter().map(String::as_str).collect()
                } else {
                    filtered
                }
            }
        }
    }
}
