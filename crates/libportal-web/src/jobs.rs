use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod overdue_sweep;

pub fn create(config: Config, store: libportal_db::Store) -> Jobs {
    Jobs {
        config: Arc::new(config),
        store,
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("overdue sweep: {0}")]
    OverdueSweep(#[from] overdue_sweep::Error),
}

pub struct Jobs {
    config: Arc<Config>,
    store: libportal_db::Store,
}

impl Jobs {
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<(), Error> {
        self.run_overdue_sweep(cancellation_token).await
    }

    #[tracing::instrument(skip(self, cancellation_token))]
    async fn run_overdue_sweep(&self, cancellation_token: CancellationToken) -> Result<(), Error> {
        use tokio::time::sleep;
        let config = &self.config.overdue_sweep;
        let sweeper = overdue_sweep::Sweeper::new(self.store.clone());
        loop {
            let pause = if config.run {
                match sweeper.sweep(jiff::Zoned::now().date()).await {
                    Ok(stats) => {
                        tracing::info!("Overdue sweep statistics: {stats:?}");
                        config.sleep
                    }
                    Err(err) => {
                        tracing::error!("Overdue sweep error: {err:?}");
                        config.error_sleep
                    }
                }
            } else {
                config.sleep
            };
            tokio::select! {
                _ = cancellation_token.cancelled() => (),
                _ = sleep(pause) => ()
            }
            if cancellation_token.is_cancelled() {
                break;
            }
        }
        Ok(())
    }
}

#[derive(Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub overdue_sweep: overdue_sweep::Config,
}
