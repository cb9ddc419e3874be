//! Poller session
//!
//! Owns everything that changes while the dashboard runs: the current field
//! mapping, the record history, the repeating timer and the render targets.
//!
//! State machine: `Idle -> Polling -> Idle`, with a transient "fetching"
//! sub-state for every cycle. Each cycle takes a sequence number before it
//! fetches and only applies its result if no newer cycle has been issued in
//! the meantime, so a slow response can never overwrite fresher data.

use crate::config::PollerConfig;
use crate::history::{Publication, RecordHistory};
use crate::mapping::{AliasTable, FieldMapping};
use crate::normalizer::normalize_at;
use crate::render::{self, RenderTarget};
use crate::source::RowSource;
use crate::types::{CanonicalRecord, Result};
use chrono::Local;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Whether a repeating fetch cycle is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// What one fetch cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// History replaced and consumers updated
    Published { records: usize },
    /// Source had no rows; previous history kept
    Empty,
    /// A newer cycle was issued while this one was fetching; result dropped
    Stale,
}

/// The polling session: one per dashboard
pub struct Poller<S: RowSource + 'static> {
    inner: Arc<Inner<S>>,
    timer: Option<PollTimer>,
}

struct PollTimer {
    url: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner<S> {
    source: S,
    config: PollerConfig,
    aliases: AliasTable,
    session: Mutex<Session>,
    targets: Mutex<Vec<Box<dyn RenderTarget>>>,
    /// Sequence number of the most recently issued cycle
    issued: AtomicU64,
    in_flight: AtomicUsize,
}

#[derive(Default)]
struct Session {
    mapping: FieldMapping,
    history: RecordHistory,
}

impl<S: RowSource + 'static> Poller<S> {
    /// Create an idle poller using the default alias table
    pub fn new(source: S, config: PollerConfig) -> Self {
        Self::with_aliases(source, config, AliasTable::default())
    }

    /// Create an idle poller with a custom alias table
    pub fn with_aliases(source: S, config: PollerConfig, aliases: AliasTable) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                aliases,
                session: Mutex::new(Session::default()),
                targets: Mutex::new(Vec::new()),
                issued: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
            }),
            timer: None,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Register one more consumer of published views
    pub fn add_render_target(&self, target: Box<dyn RenderTarget>) {
        self.inner.targets.lock().push(target);
    }

    /// Replace all render targets (e.g. after the UI was rebuilt)
    pub fn set_render_targets(&self, targets: Vec<Box<dyn RenderTarget>>) {
        *self.inner.targets.lock() = targets;
    }

    /// Start fetching `url` now and then on every interval
    ///
    /// An active cycle is cancelled first, so at most one timer runs. Calling
    /// this again with another URL switches sources. Must be called from
    /// within a Tokio runtime.
    pub fn start_polling(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.stop_polling();

        log::info!(
            "Polling {} every {}ms",
            url,
            self.inner.config.interval().as_millis()
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.inner),
            url.clone(),
            cancel.clone(),
        ));

        self.timer = Some(PollTimer { url, cancel, handle });
    }

    /// Cancel the repeating timer
    ///
    /// A fetch already in flight is allowed to finish but its result is
    /// discarded. Returns false if the poller was already idle.
    pub fn stop_polling(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.cancel.cancel();
                // Invalidate whatever the cancelled loop still has in flight
                self.inner.issued.fetch_add(1, Ordering::SeqCst);
                log::info!("Stopped polling {}", timer.url);
                true
            }
            None => false,
        }
    }

    /// Run one fetch-map-normalize-publish cycle on demand
    pub async fn fetch_once(&self, url: &str) -> Result<CycleOutcome> {
        self.inner.run_cycle(url).await
    }

    pub fn state(&self) -> PollerState {
        match &self.timer {
            Some(timer) if !timer.handle.is_finished() => PollerState::Polling,
            _ => PollerState::Idle,
        }
    }

    /// True while at least one cycle is waiting on the source
    pub fn is_fetching(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// The URL being polled, if any
    pub fn current_url(&self) -> Option<&str> {
        self.timer.as_ref().map(|t| t.url.as_str())
    }

    pub fn history(&self) -> RecordHistory {
        self.inner.session.lock().history.clone()
    }

    pub fn latest(&self) -> Option<CanonicalRecord> {
        self.inner.session.lock().history.latest().cloned()
    }

    /// The mapping resolved by the last applied cycle
    pub fn mapping(&self) -> FieldMapping {
        self.inner.session.lock().mapping.clone()
    }

    /// Views derived from the current history
    pub fn publication(&self) -> Publication {
        let session = self.inner.session.lock();
        self.inner.publication_of(&session.history)
    }
}

impl<S: RowSource + 'static> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel.cancel();
        }
    }
}

impl<S: RowSource> Inner<S> {
    async fn run_cycle(&self, url: &str) -> Result<CycleOutcome> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        log::trace!("Cycle {} fetching {}", seq, url);

        let rows = {
            let _fetching = InFlight::enter(&self.in_flight);
            self.source.fetch_rows(url).await?
        };

        let Some(first) = rows.first() else {
            log::debug!("Cycle {}: empty payload from {}, keeping previous history", seq, url);
            return Ok(CycleOutcome::Empty);
        };

        // Headers come from the first row and are re-resolved every cycle
        let headers: Vec<&str> = first.keys().map(String::as_str).collect();
        let mapping = self.aliases.resolve(&headers);
        if mapping.is_empty() {
            log::warn!("No canonical fields matched headers {:?}", headers);
        }

        let now = Local::now();
        let records: Vec<CanonicalRecord> = rows
            .iter()
            .map(|row| normalize_at(&mapping, row, now))
            .collect();
        let count = records.len();

        let publication = {
            let mut session = self.session.lock();
            if self.issued.load(Ordering::SeqCst) != seq {
                log::debug!("Cycle {} superseded, discarding {} rows", seq, count);
                return Ok(CycleOutcome::Stale);
            }
            session.mapping = mapping;
            session.history.replace(records);
            self.publication_of(&session.history)
        };

        let mut targets = self.targets.lock();
        let updated = render::update_all(&mut targets, &publication);
        log::debug!(
            "Cycle {}: published {} records to {}/{} targets",
            seq,
            count,
            updated,
            targets.len()
        );

        Ok(CycleOutcome::Published { records: count })
    }

    fn publication_of(&self, history: &RecordHistory) -> Publication {
        Publication::from_history(
            history,
            self.config.trend_window,
            self.config.display_window,
            Local::now(),
        )
    }
}

async fn poll_loop<S: RowSource>(inner: Arc<Inner<S>>, url: String, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Poll loop for {} cancelled", url);
                return;
            }
            _ = ticker.tick() => {}
        }

        // Runs outside the select so cancellation never aborts a fetch midway
        match inner.run_cycle(&url).await {
            Ok(CycleOutcome::Published { records }) => {
                log::info!("Fetched {} records from {}", records, url)
            }
            Ok(outcome) => log::debug!("Cycle for {} ended: {:?}", url, outcome),
            Err(e) => log::warn!("Fetch from {} failed: {}", url, e),
        }
    }
}

/// Counts a cycle as fetching until dropped
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
