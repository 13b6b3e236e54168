//! Periodic match formation across every registered mode.

use super::{MatchHandler, MatchMode, Matchmaker, MatchmakingError, PlayerRequest};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default time between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Routes players to per-mode matchmakers and drains them on a timer.
#[derive(Debug)]
pub struct MatchScheduler {
    matchmakers: RwLock<HashMap<MatchMode, Arc<dyn Matchmaker>>>,
    interval: Duration,
    cancel: Mutex<Option<CancellationToken>>,
}

impl Default for MatchScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl MatchScheduler {
    /// Creates a scheduler with no matchmakers.
    pub fn new(interval: Duration) -> Self {
        Self {
            matchmakers: RwLock::new(HashMap::new()),
            interval,
            cancel: Mutex::new(None),
        }
    }

    /// Tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registers a matchmaker for its mode, replacing any previous one.
    #[instrument(skip(self, matchmaker), fields(mode = %matchmaker.mode()))]
    pub fn register(&self, matchmaker: Arc<dyn Matchmaker>) {
        let mode = matchmaker.mode();
        if self.matchmakers.write().insert(mode, matchmaker).is_some() {
            warn!("Replaced existing matchmaker");
        } else {
            info!("Registered matchmaker");
        }
    }

    fn matchmaker(&self, mode: MatchMode) -> Option<Arc<dyn Matchmaker>> {
        self.matchmakers.read().get(&mode).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Matchmaker>> {
        self.matchmakers.read().values().cloned().collect()
    }

    /// Queues a player with the matchmaker for its mode.
    ///
    /// Requests for a mode with no matchmaker go to Simple instead.
    ///
    /// # Errors
    ///
    /// Propagates the matchmaker's error, or returns
    /// [`MatchmakingError::NoMatchmaker`] if Simple is missing too.
    #[instrument(skip(self, request), fields(player_id = %request.id, mode = %request.mode))]
    pub fn add_player(&self, mut request: PlayerRequest) -> Result<(), MatchmakingError> {
        let matchmaker = match self.matchmaker(request.mode) {
            Some(mm) => mm,
            None => {
                warn!("No matchmaker for mode, falling back to simple");
                let requested = request.mode;
                request.mode = MatchMode::Simple;
                self.matchmaker(MatchMode::Simple)
                    .ok_or(MatchmakingError::NoMatchmaker { mode: requested })?
            }
        };
        // Lookup lock is released before the matchmaker locks its queue.
        matchmaker.add_player(request)
    }

    /// Removes a player from whichever queue holds it.
    ///
    /// # Errors
    ///
    /// Returns [`MatchmakingError::NotFound`] if no queue holds the player.
    #[instrument(skip(self))]
    pub fn remove_player(&self, player_id: &str) -> Result<(), MatchmakingError> {
        for matchmaker in self.snapshot() {
            if matchmaker.remove_player(player_id).is_ok() {
                return Ok(());
            }
        }
        Err(MatchmakingError::NotFound {
            player_id: player_id.to_string(),
        })
    }

    /// Queue size per registered mode.
    pub fn queue_status(&self) -> HashMap<MatchMode, usize> {
        self.snapshot()
            .into_iter()
            .map(|mm| (mm.mode(), mm.queue_size()))
            .collect()
    }

    /// Players queued across all modes.
    pub fn total_queued(&self) -> usize {
        self.snapshot().iter().map(|mm| mm.queue_size()).sum()
    }

    /// Drains every matchmaker and hands each match to `handler`.
    ///
    /// Handler failures are logged and the remaining matches still run.
    /// Returns the number of matches formed.
    pub fn tick(&self, handler: &dyn MatchHandler) -> usize {
        let mut formed = 0;
        for matchmaker in self.snapshot() {
            for game_match in matchmaker.find_matches() {
                formed += 1;
                let match_id = game_match.id.clone();
                debug!(%match_id, mode = %matchmaker.mode(), "Dispatching match");
                if let Err(e) = handler.on_match(game_match) {
                    error!(%match_id, error = %e, "Match handler failed");
                }
            }
        }
        formed
    }

    /// Spawns the tick loop on the current tokio runtime.
    ///
    /// Calling `start` while running does nothing.
    #[instrument(skip_all, fields(interval_ms = self.interval.as_millis() as u64))]
    pub fn start(self: &Arc<Self>, handler: Arc<dyn MatchHandler>) {
        let mut slot = self.cancel.lock();
        if slot.is_some() {
            debug!("Scheduler already running");
            return;
        }
        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        drop(slot);

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.interval);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Scheduler cancellation received");
                        break;
                    }
                    _ = ticker.tick() => {
                        let formed = scheduler.tick(handler.as_ref());
                        if formed > 0 {
                            info!(formed, "Matches formed");
                        }
                    }
                }
            }
            info!("Match scheduler stopped");
        });
        info!("Match scheduler started");
    }

    /// Stops the tick loop. A tick in progress completes first.
    pub fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
            info!("Match scheduler stopping");
        }
    }

    /// Whether the tick loop is running.
    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }
}
