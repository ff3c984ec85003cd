use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Days, Local, NaiveDate};

use crate::io::vault::{Vault, VaultFile};
use crate::model::config::{Periodicity, Settings};

/// How many periods back to look for the previous note
pub const MAX_LOOKBACK: u64 = 30;

/// Locates periodic (daily/weekly) notes.
#[async_trait]
pub trait PeriodicNotes: Send + Sync {
    /// The note for the current period, if it exists.
    async fn current(&self, periodicity: Periodicity) -> Option<VaultFile>;

    /// The most recent earlier note that exists.
    async fn previous(&self, periodicity: Periodicity) -> Option<VaultFile>;

    /// First day of the period after the current one.
    fn next_period_start(&self, periodicity: Periodicity) -> NaiveDate;

    /// The date notes are located relative to.
    fn today(&self) -> NaiveDate;
}

/// Periodic notes named by a chrono format, inside a configured folder.
///
/// "Today" follows the local clock unless pinned with [`on`](Self::on).
pub struct DatedNotes {
    vault: Arc<dyn Vault>,
    settings: Settings,
    today: Option<NaiveDate>,
}

impl DatedNotes {
    pub fn new(vault: Arc<dyn Vault>, settings: Settings) -> Self {
        DatedNotes {
            vault,
            settings,
            today: None,
        }
    }

    pub fn on(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Vault path of the note for the period containing `date`.
    pub fn note_path(&self, periodicity: Periodicity, date: NaiveDate) -> Option<String> {
        let config = self.settings.periodic(periodicity);
        let mut stem = String::new();
        // chrono reports bad format strings as fmt errors
        let start = period_start(periodicity, date);
        write!(stem, "{}", start.format(config.note_format(periodicity))).ok()?;
        let folder = config.folder.trim_matches('/');
        Some(if folder.is_empty() {
            format!("{}.md", stem)
        } else {
            format!("{}/{}.md", folder, stem)
        })
    }

    async fn note_at(&self, periodicity: Periodicity, date: NaiveDate) -> Option<VaultFile> {
        let path = self.note_path(periodicity, date)?;
        self.vault.file_by_path(&path).await
    }
}

fn period_start(periodicity: Periodicity, date: NaiveDate) -> NaiveDate {
    match periodicity {
        Periodicity::Daily => date,
        Periodicity::Weekly => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(date),
    }
}

fn period_length(periodicity: Periodicity) -> Days {
    match periodicity {
        Periodicity::Daily => Days::new(1),
        Periodicity::Weekly => Days::new(7),
    }
}

#[async_trait]
impl PeriodicNotes for DatedNotes {
    async fn current(&self, periodicity: Periodicity) -> Option<VaultFile> {
        self.note_at(periodicity, self.today()).await
    }

    async fn previous(&self, periodicity: Periodicity) -> Option<VaultFile> {
        let mut date = period_start(periodicity, self.today());
        for _ in 0..MAX_LOOKBACK {
            date = date.checked_sub_days(period_length(periodicity))?;
            if let Some(file) = self.note_at(periodicity, date).await {
                return Some(file);
            }
        }
        None
    }

    fn next_period_start(&self, periodicity: Periodicity) -> NaiveDate {
        let start = period_start(periodicity, self.today());
        start.checked_add_days(period_length(periodicity)).unwrap_or(start)
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}
