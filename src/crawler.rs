// The crawl loop: fetch, fan out one reconciliation per player, wait, sleep.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, ScheduleConfig};
use crate::db::Database;
use crate::error::ConfigError;
use crate::fetcher::PlayerFetcher;
use crate::metrics;
use crate::notify::Notifier;
use crate::proxy::ProxyPool;
use crate::reconcile::process_player;
use crate::worker_pool::ReconcilePool;

/// Result of one cycle, deciding how long the loop sleeps next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch succeeded and every player task finished.
    Completed { players: usize },
    /// Fetch failed; nothing was reconciled.
    FetchFailed,
}

pub struct Crawler {
    fetcher: PlayerFetcher,
    proxies: ProxyPool,
    schedule: ScheduleConfig,
    metrics_textfile: Option<PathBuf>,
    db: Arc<Database>,
    notifier: Arc<Notifier>,
}

impl Crawler {
    pub fn new(config: &Config, db: Arc<Database>, notifier: Arc<Notifier>) -> Result<Self, ConfigError> {
        Ok(Self {
            fetcher: PlayerFetcher::new(
                config.source.players_url.clone(),
                Duration::from_secs(config.source.request_timeout_secs),
            ),
            proxies: ProxyPool::new(config.proxy_list.clone())?,
            schedule: config.schedule.clone(),
            metrics_textfile: config.metrics.textfile.clone(),
            db,
            notifier,
        })
    }

    /// One pass: fetch once, reconcile every player concurrently, wait for all.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let proxy = self.proxies.pick();

        let started = Instant::now();
        let fetched = self.fetcher.fetch(proxy).await;
        metrics::FETCH_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        let players = match fetched {
            Ok(players) => players,
            Err(e) => {
                metrics::CYCLES_TOTAL.with_label_values(&["fetch_error"]).inc();
                self.notifier.notify(&e.to_string()).await;
                self.dump_metrics();
                return CycleOutcome::FetchFailed;
            }
        };

        let count = players.len();
        metrics::PLAYERS_ONLINE.set(count as i64);
        tracing::info!(players = count, proxy, "Fetched online players");

        let mut pool = ReconcilePool::new(self.schedule.max_concurrent_players);
        for player in players {
            let db = self.db.clone();
            let notifier = self.notifier.clone();
            let player = player.normalized();
            pool.spawn(async move {
                process_player(&db, &notifier, player).await;
            });
        }
        tracing::debug!(tasks = pool.pending(), "Reconciling players");
        let panicked = pool.join_all().await;
        if panicked > 0 {
            self.notifier
                .notify(&format!("{panicked} reconciliation task(s) aborted unexpectedly"))
                .await;
        }

        metrics::CYCLES_TOTAL.with_label_values(&["ok"]).inc();
        self.dump_metrics();
        CycleOutcome::Completed { players: count }
    }

    /// Delay to apply after a cycle with the given outcome.
    pub fn delay_after(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Completed { .. } => self.schedule.poll_interval(),
            CycleOutcome::FetchFailed => self.schedule.retry_delay(),
        }
    }

    /// Run cycles forever. Only returns if the surrounding task is dropped.
    pub async fn run(&self) {
        loop {
            let outcome = self.run_cycle().await;
            tokio::time::sleep(self.delay_after(outcome)).await;
        }
    }

    fn dump_metrics(&self) {
        if let Some(path) = &self.metrics_textfile {
            if let Err(e) = metrics::write_textfile(path) {
                tracing::warn!(path = %path.display(), "Failed to write metrics textfile: {e}");
            }
        }
    }
}
