//! Discover and sync execution

use super::{Cli, CliError};
use crate::catalog::Catalog;
use crate::config::{ConfigError, TapConfig};
use crate::fetcher::{HitSource, OpenDataSusFetcher};
use crate::metrics;
use crate::output::{OutputWriter, SingerWriter};
use crate::state::TapState;
use crate::tap;
use std::sync::Arc;
use tracing::info;

impl Cli {
    /// Run discovery or a sync, as requested
    pub async fn execute(&self) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            metrics::init_metrics(addr)
                .await
                .map_err(|e| CliError::MetricsError(e.to_string()))?;
        }

        if self.discover {
            info!("Running discovery");
            println!("{}", Catalog::discover().to_json_pretty()?);
            return Ok(());
        }

        self.sync().await
    }

    async fn sync(&self) -> Result<(), CliError> {
        let config_path = self
            .config
            .as_deref()
            .ok_or(ConfigError::MissingKey("--config"))?;
        let mut config = TapConfig::load(config_path)?;
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }

        let mut state = match &self.state {
            Some(path) => TapState::load(path)?,
            None => TapState::default(),
        };

        let catalog = match &self.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::discover(),
        };

        let source: Arc<dyn HitSource> = Arc::new(OpenDataSusFetcher::new(config.index.clone())?);
        let mut out = SingerWriter::stdout();

        let result = tap::do_sync(
            &config,
            source,
            &catalog,
            &mut state,
            &mut out,
            self.state_output.as_deref(),
        )
        .await;
        out.flush()?;

        let outcomes = result?;
        let records: u64 = outcomes.iter().map(|s| s.outcome.records).sum();
        info!(streams = outcomes.len(), records, "Extraction run finished");
        Ok(())
    }
}
