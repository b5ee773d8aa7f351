//! Interval-driven analysis of favorite symbols
//!
//! [`FavoritesScheduler`] periodically asks the favorites provider for the
//! current favorites, fetches a quick recommendation for each of them and keeps
//! the latest result per symbol in memory. The cache is mirrored into the
//! analysis store after every pass without waiting for the write.
//!
//! At most one pass runs at any time, whichever of the timer loop or a manual
//! `run_now` triggered it. The guard that enforces this is released on every
//! exit path of a pass, including cancellation and panics inside collaborators.

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{clamp_interval_minutes, SchedulerConfig};
use crate::db::AnalysisStore;
use crate::metrics::Metrics;
use crate::models::ScheduledAnalysis;
use crate::services::market_data::{FavoritesProvider, RecommendationSource};

/// Snapshot of the scheduler state as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub is_analyzing: bool,
    pub interval_minutes: u32,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub analyzed_symbols: usize,
}

/// Result of one analysis pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed { refreshed: usize, failed: usize },
    NoFavorites,
    /// Another pass was already running
    Skipped,
    /// The pass aborted unexpectedly (a collaborator panicked)
    Failed(String),
}

impl PassOutcome {
    fn label(&self) -> &'static str {
        match self {
            PassOutcome::Completed { .. } | PassOutcome::NoFavorites => "completed",
            PassOutcome::Skipped => "skipped",
            PassOutcome::Failed(_) => "failed",
        }
    }
}

struct LoopHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Holds the pass lock; clears the analyzing flag when dropped.
struct PassGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    analyzing: &'a AtomicBool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.analyzing.store(false, Ordering::SeqCst);
    }
}

pub struct FavoritesScheduler {
    favorites: Arc<dyn FavoritesProvider>,
    source: Arc<dyn RecommendationSource>,
    store: Arc<dyn AnalysisStore>,
    metrics: Option<Arc<Metrics>>,
    symbol_delay: Duration,
    error_cooldown: Duration,
    interval_minutes: AtomicU32,
    running: AtomicBool,
    analyzing: AtomicBool,
    pass_lock: Mutex<()>,
    analyses: RwLock<HashMap<String, ScheduledAnalysis>>,
    last_run: RwLock<Option<DateTime<Utc>>>,
    lifecycle: Mutex<Option<LoopHandle>>,
}

impl FavoritesScheduler {
    pub fn new(
        favorites: Arc<dyn FavoritesProvider>,
        source: Arc<dyn RecommendationSource>,
        store: Arc<dyn AnalysisStore>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            favorites,
            source,
            store,
            metrics: None,
            symbol_delay: config.symbol_delay,
            error_cooldown: config.error_cooldown,
            interval_minutes: AtomicU32::new(clamp_interval_minutes(
                config.interval_minutes.into(),
            )),
            running: AtomicBool::new(false),
            analyzing: AtomicBool::new(false),
            pass_lock: Mutex::new(()),
            analyses: RwLock::new(HashMap::new()),
            last_run: RwLock::new(None),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::SeqCst)
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes.load(Ordering::SeqCst)
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes()) * 60)
    }

    /// Start the periodic loop.
    ///
    /// Returns once the first pass has finished, so callers observe fresh
    /// results immediately. Starting a running scheduler only reports status.
    pub async fn start(self: &Arc<Self>) -> SchedulerStatus {
        let first_pass = {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.is_some() {
                warn!("FavoritesScheduler: already running");
                None
            } else {
                let token = CancellationToken::new();
                let (done_tx, done_rx) = oneshot::channel();
                self.running.store(true, Ordering::SeqCst);
                let task = tokio::spawn(Arc::clone(self).run_loop(token.clone(), done_tx));
                *lifecycle = Some(LoopHandle { token, task });
                info!(
                    interval_minutes = self.interval_minutes(),
                    "FavoritesScheduler: started with {} minute interval",
                    self.interval_minutes()
                );
                Some(done_rx)
            }
        };

        if let Some(done_rx) = first_pass {
            // Err means stop() cancelled the loop before the first pass ended
            let _ = done_rx.await;
        }
        self.get_status().await
    }

    /// Stop the periodic loop. A pass started by the loop is dropped at its
    /// next suspension point; stopping a stopped scheduler is a no-op.
    pub async fn stop(&self) -> SchedulerStatus {
        let handle = {
            let mut lifecycle = self.lifecycle.lock().await;
            self.running.store(false, Ordering::SeqCst);
            lifecycle.take()
        };

        match handle {
            Some(LoopHandle { token, task }) => {
                token.cancel();
                if let Err(e) = task.await {
                    error!(error = %e, "FavoritesScheduler: loop task ended abnormally");
                }
                info!("FavoritesScheduler: stopped");
            }
            None => debug!("FavoritesScheduler: stop requested while not running"),
        }

        self.get_status().await
    }

    /// Run a pass right away and return the resulting cache.
    ///
    /// If a pass is already in flight no second one is started: the call
    /// waits for the in-flight pass to finish and returns its results.
    pub async fn run_now(&self) -> Vec<ScheduledAnalysis> {
        match self.try_begin_pass() {
            Some(guard) => {
                self.execute_pass(guard).await;
            }
            None => {
                info!("FavoritesScheduler: pass in progress, waiting for it to finish");
                drop(self.pass_lock.lock().await);
            }
        }
        self.get_all_analyses().await
    }

    /// Change the interval, clamped to 5..=1440 minutes. A wait that is
    /// already counting down keeps its original length.
    pub async fn set_interval(&self, minutes: i64) -> SchedulerStatus {
        let clamped = clamp_interval_minutes(minutes);
        self.interval_minutes.store(clamped, Ordering::SeqCst);
        info!(
            requested = minutes,
            interval_minutes = clamped,
            "FavoritesScheduler: interval set to {} minutes",
            clamped
        );
        self.get_status().await
    }

    /// Every cached analysis, ordered by symbol. Includes symbols that are no
    /// longer favorites.
    pub async fn get_all_analyses(&self) -> Vec<ScheduledAnalysis> {
        let mut analyses: Vec<ScheduledAnalysis> =
            self.analyses.read().await.values().cloned().collect();
        analyses.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        analyses
    }

    pub async fn get_analysis(&self, symbol: &str) -> Option<ScheduledAnalysis> {
        self.analyses.read().await.get(symbol).cloned()
    }

    pub async fn get_status(&self) -> SchedulerStatus {
        let running = self.is_running();
        let interval_minutes = self.interval_minutes();
        let last_run = *self.last_run.read().await;
        let next_run = if running {
            last_run.map(|at| at + chrono::Duration::minutes(i64::from(interval_minutes)))
        } else {
            None
        };

        SchedulerStatus {
            running,
            is_analyzing: self.is_analyzing(),
            interval_minutes,
            last_run,
            next_run,
            analyzed_symbols: self.analyses.read().await.len(),
        }
    }

    /// One analysis pass over all favorites; skipped if a pass is running.
    pub async fn analyze_favorites(&self) -> PassOutcome {
        match self.try_begin_pass() {
            Some(guard) => self.execute_pass(guard).await,
            None => {
                warn!("FavoritesScheduler: analysis already in progress, skipping");
                self.record_outcome(&PassOutcome::Skipped);
                PassOutcome::Skipped
            }
        }
    }

    fn try_begin_pass(&self) -> Option<PassGuard<'_>> {
        let lock = self.pass_lock.try_lock().ok()?;
        self.analyzing.store(true, Ordering::SeqCst);
        Some(PassGuard {
            _lock: lock,
            analyzing: &self.analyzing,
        })
    }

    async fn execute_pass(&self, guard: PassGuard<'_>) -> PassOutcome {
        let started = Instant::now();
        let outcome = match AssertUnwindSafe(self.run_pass()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(error = %message, "FavoritesScheduler: error during scheduled analysis");
                PassOutcome::Failed(message)
            }
        };
        drop(guard);

        if let Some(metrics) = &self.metrics {
            metrics
                .scheduler_pass_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }
        self.record_outcome(&outcome);
        outcome
    }

    async fn run_pass(&self) -> PassOutcome {
        info!("FavoritesScheduler: starting scheduled analysis of favorite symbols");

        let favorites = match self.favorites.list_favorites().await {
            Ok(favorites) => favorites,
            Err(e) => {
                warn!(error = %e, "FavoritesScheduler: failed to fetch favorite symbols");
                Vec::new()
            }
        };

        if favorites.is_empty() {
            info!("FavoritesScheduler: no favorite symbols to analyze");
            self.mark_run().await;
            return PassOutcome::NoFavorites;
        }

        info!(
            count = favorites.len(),
            "FavoritesScheduler: analyzing {} favorite symbols",
            favorites.len()
        );

        let mut refreshed = 0;
        let mut failed = 0;
        for (index, favorite) in favorites.iter().enumerate() {
            if index > 0 && !self.symbol_delay.is_zero() {
                tokio::time::sleep(self.symbol_delay).await;
            }

            match self.source.get_recommendation(&favorite.symbol, true).await {
                Ok(recommendation) => {
                    let mut analysis = ScheduledAnalysis::from_recommendation(
                        recommendation,
                        favorite.category.clone(),
                        Utc::now(),
                    );
                    analysis.symbol.clone_from(&favorite.symbol);
                    debug!(
                        symbol = %analysis.symbol,
                        direction = %analysis.direction,
                        confidence = analysis.confidence_score,
                        "FavoritesScheduler: analyzed {}",
                        analysis.symbol
                    );
                    self.analyses
                        .write()
                        .await
                        .insert(favorite.symbol.clone(), analysis);
                    refreshed += 1;
                }
                Err(e) => {
                    warn!(
                        symbol = %favorite.symbol,
                        error = %e,
                        "FavoritesScheduler: failed to analyze {}",
                        favorite.symbol
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.scheduler_symbol_failures_total.inc();
                    }
                    failed += 1;
                }
            }
        }

        self.mark_run().await;

        let snapshot = self.get_all_analyses().await;
        if let Some(metrics) = &self.metrics {
            metrics.scheduler_cached_symbols.set(snapshot.len() as i64);
        }
        info!(
            refreshed,
            failed,
            cached = snapshot.len(),
            "FavoritesScheduler: scheduled analysis completed for {} symbols",
            snapshot.len()
        );
        self.persist_snapshot(snapshot);

        PassOutcome::Completed { refreshed, failed }
    }

    async fn mark_run(&self) {
        *self.last_run.write().await = Some(Utc::now());
    }

    /// Mirror the cache into the store on a detached task.
    fn persist_snapshot(&self, snapshot: Vec<ScheduledAnalysis>) {
        if snapshot.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            match store.bulk_upsert(&snapshot).await {
                Ok(()) => debug!(
                    count = snapshot.len(),
                    "FavoritesScheduler: saved scheduled analyses"
                ),
                Err(e) => {
                    error!(error = %e, "FavoritesScheduler: failed to save analyses");
                    if let Some(metrics) = metrics {
                        metrics.scheduler_persist_failures_total.inc();
                    }
                }
            }
        });
    }

    fn record_outcome(&self, outcome: &PassOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_pass(outcome.label());
        }
    }

    async fn run_loop(self: Arc<Self>, token: CancellationToken, first_pass: oneshot::Sender<()>) {
        let mut first_pass = Some(first_pass);
        let mut wait: Option<Duration> = None;

        loop {
            if let Some(wait) = wait {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                outcome = self.analyze_favorites() => outcome,
            };

            if let Some(done) = first_pass.take() {
                if outcome == PassOutcome::Skipped {
                    // start() reports after the in-flight manual pass instead
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = self.pass_lock.lock() => {}
                    }
                }
                let _ = done.send(());
            }

            wait = Some(match outcome {
                PassOutcome::Failed(_) => {
                    warn!(
                        cooldown_secs = self.error_cooldown.as_secs(),
                        "FavoritesScheduler: pass failed, retrying after cooldown"
                    );
                    self.error_cooldown
                }
                _ => self.interval(),
            });
        }

        debug!("FavoritesScheduler: loop exited");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
