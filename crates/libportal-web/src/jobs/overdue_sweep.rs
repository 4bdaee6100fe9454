use std::time::Duration;

#[derive(Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub run: bool,
    #[serde(with = "humantime_serde")]
    pub sleep: Duration,
    #[serde(with = "humantime_serde")]
    pub error_sleep: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("library database error: {0}")]
    LibraryDb(#[from] libportal_db::Error),
}

#[derive(Debug)]
pub struct SweepStatistics {
    pub as_of: jiff::civil::Date,
    pub marked_overdue: usize,
}

/// Rewrites the stored status of checked out loans past their due date.
pub struct Sweeper {
    store: libportal_db::Store,
}

impl Sweeper {
    pub fn new(store: libportal_db::Store) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self, today: jiff::civil::Date) -> Result<SweepStatistics, Error> {
        let marked_overdue = self.store.mark_overdue(today).await?;
        if marked_overdue > 0 {
            tracing::info!(marked_overdue, "loans are now overdue");
        }
        Ok(SweepStatistics {
            as_of: today,
            marked_overdue,
        })
    }
}
