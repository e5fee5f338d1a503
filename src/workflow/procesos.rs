//! The case monitoring run: fetch, detect, notify, persist.
//!
//! The cases tab is written exactly once, after the digest has been handled,
//! so a crash before that point leaves the stored baseline untouched and the
//! next run re-detects the same changes. The write re-reads the tab and only
//! patches the state cells of refreshed rows, so edits made to the sheet while
//! the run was fetching are kept.
use super::history::{append_history, HistoryEntry};
use super::report::report_rows;
use crate::detect::{detect, normalize_status, refresh};
use crate::error::RunError;
use crate::model::{
    CaseFailure, ChangeEvent, FetchResult, NotificationOutcome, RunSummary, StaleCase,
    TrackedCase,
};
use crate::notify::{format_digest, Notifier};
use crate::portal::{FetchError, PortalClient};
use crate::run_lock;
use crate::sheets::case_table::state_updates;
use crate::sheets::{CaseTable, SheetStore};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Knobs for one run, resolved from settings and CLI flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub cases_tab: String,
    pub report_tab: String,
    pub max_workers: usize,
    pub run_timeout: Duration,
    pub stale_after_days: i64,
    pub lock_path: PathBuf,
    pub history_path: Option<PathBuf>,
    pub today: NaiveDate,
    pub dry_run: bool,
}

pub struct Coordinator<'a> {
    store: &'a dyn SheetStore,
    portal: &'a dyn PortalClient,
    notifier: Option<Notifier<'a>>,
    options: RunOptions,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        store: &'a dyn SheetStore,
        portal: &'a dyn PortalClient,
        notifier: Option<Notifier<'a>>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            portal,
            notifier,
            options,
        }
    }

    pub fn run(&self) -> Result<RunSummary, RunError> {
        let lock = run_lock::acquire(&self.options.lock_path)
            .map_err(|err| RunError::Locked(err.to_string()))?;
        tracing::debug!(lock = %lock.path().display(), "run lock acquired");
        let started = Instant::now();

        let grid = self
            .store
            .read_tab(&self.options.cases_tab)
            .map_err(RunError::SourceUnavailable)?;
        let table = CaseTable::parse(grid).map_err(RunError::SourceUnavailable)?;
        let cases = table.cases().to_vec();
        tracing::info!(cases = cases.len(), tab = %self.options.cases_tab, "loaded tracked cases");

        let fetched = self.fetch_all(&cases, started + self.options.run_timeout)?;

        let mut events = Vec::new();
        let mut failures = Vec::new();
        let mut stale = Vec::new();
        let mut refreshed = Vec::new();
        for (case, result) in cases.iter().zip(fetched) {
            match result {
                Ok(current) => {
                    if let Some(event) = detect(case, &current) {
                        tracing::info!(case_id = %case.case_id, kind = %event.kind, "change detected");
                        events.push(event);
                    }
                    if let Some(entry) = self.stale_entry(&current) {
                        stale.push(entry);
                    }
                    refreshed.push(refresh(case, &current));
                }
                Err(err) => {
                    tracing::warn!(case_id = %case.case_id, error = %err, "fetch failed, keeping stored state");
                    failures.push(CaseFailure {
                        case_id: case.case_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let notification = self.deliver(&events);

        let state_written = if self.options.dry_run {
            tracing::info!("dry run, cases tab not written");
            false
        } else {
            self.write_state(&refreshed)?
        };

        let summary = RunSummary {
            cases_checked: cases.len(),
            events,
            failures,
            stale,
            notification,
            state_written,
        };
        if !self.options.dry_run {
            self.write_extras(&summary);
        }
        tracing::info!(
            checked = summary.cases_checked,
            succeeded = summary.successes(),
            failed = summary.failures.len(),
            events = summary.events.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );
        Ok(summary)
    }

    /// Patch the state cells of refreshed cases into the tab as it is now.
    /// Returns whether any cell was written.
    fn write_state(&self, refreshed: &[TrackedCase]) -> Result<bool, RunError> {
        if refreshed.is_empty() {
            tracing::info!(tab = %self.options.cases_tab, "no refreshed cases, nothing to write");
            return Ok(false);
        }
        let tab = &self.options.cases_tab;
        let grid = self.store.read_tab(tab).map_err(|err| {
            RunError::SinkWriteFailure(err.context(format!("re-read {tab} before writing")))
        })?;
        let updates = state_updates(&grid, refreshed).map_err(RunError::SinkWriteFailure)?;
        if updates.is_empty() {
            return Ok(false);
        }
        self.store
            .update_cells(tab, &updates)
            .map_err(RunError::SinkWriteFailure)?;
        tracing::info!(tab = %tab, cells = updates.len(), "case state written");
        Ok(true)
    }

    /// Fetch every case on a bounded pool; results come back in row order.
    fn fetch_all(
        &self,
        cases: &[TrackedCase],
        deadline: Instant,
    ) -> Result<Vec<Result<FetchResult, FetchError>>, RunError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_workers.max(1))
            .thread_name(|index| format!("rama-fetch-{index}"))
            .build()
            .map_err(|err| RunError::Config(format!("cannot start fetch workers: {err}")))?;
        let portal = self.portal;
        Ok(pool.install(|| {
            cases
                .par_iter()
                .map(|case| {
                    if Instant::now() >= deadline {
                        return Err(FetchError::DeadlineExceeded);
                    }
                    tracing::debug!(case_id = %case.case_id, "fetching");
                    portal.fetch(&case.case_id)
                })
                .collect()
        }))
    }

    fn stale_entry(&self, current: &FetchResult) -> Option<StaleCase> {
        if !current.found {
            return None;
        }
        let last_update = current.current_update_date?;
        let age = (self.options.today - last_update).num_days();
        (age > self.options.stale_after_days).then(|| StaleCase {
            case_id: current.case_id.clone(),
            status: normalize_status(&current.current_status),
            last_update,
        })
    }

    fn deliver(&self, events: &[ChangeEvent]) -> NotificationOutcome {
        if events.is_empty() {
            return NotificationOutcome::NotNeeded;
        }
        if self.options.dry_run {
            let digest = format_digest(events, None);
            tracing::info!(subject = %digest.subject, "dry run, digest not sent\n{}", digest.text);
            return NotificationOutcome::Skipped;
        }
        let Some(notifier) = &self.notifier else {
            tracing::warn!(events = events.len(), "no mail transport configured, digest not sent");
            return NotificationOutcome::Skipped;
        };
        match notifier.notify(events) {
            Ok(()) => NotificationOutcome::Sent,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "digest delivery failed; state will still be written");
                NotificationOutcome::Failed(format!("{err:#}"))
            }
        }
    }

    fn write_extras(&self, summary: &RunSummary) {
        if !summary.events.is_empty() || !summary.failures.is_empty() || !summary.stale.is_empty()
        {
            let rows = report_rows(summary);
            if let Err(err) = self.store.replace_tab(&self.options.report_tab, &rows) {
                tracing::warn!(tab = %self.options.report_tab, error = %format!("{err:#}"), "report tab not written");
            }
        }
        if let Some(path) = &self.options.history_path {
            let entry = HistoryEntry::from_summary(summary);
            if let Err(err) = append_history(path, &entry) {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "history not recorded");
            }
        }
    }
}

#[cfg(test)]
#[path = "procesos_tests.rs"]
mod tests;
