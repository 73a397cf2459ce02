// Per-player reconciliation against the store: insert, rename or no-op.

use crate::db::Database;
use crate::error::PersistenceError;
use crate::fetcher::Player;
use crate::metrics;
use crate::notify::Notifier;

/// Which transition a reconciliation applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First sighting; stored without history.
    Inserted,
    /// Stored name already matches.
    Unchanged,
    /// Name overwritten and the old one appended to history.
    Renamed {
        previous: String,
        /// Full history after the append, oldest first.
        history: Vec<String>,
    },
}

impl ReconcileOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Inserted => "inserted",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Renamed { .. } => "renamed",
        }
    }
}

/// Apply one fetched player. `player.name` is expected to be normalized.
///
/// The rename path is two separate writes. A failed history append leaves the
/// new name in place.
pub async fn reconcile_player(db: &Database, player: &Player) -> Result<ReconcileOutcome, PersistenceError> {
    let stored = match db.get_player(&player.id).await? {
        Some(p) => p,
        None => {
            db.add_player(&player.id, &player.name).await?;
            return Ok(ReconcileOutcome::Inserted);
        }
    };

    if stored.current_name == player.name {
        return Ok(ReconcileOutcome::Unchanged);
    }

    db.update_player_name(&player.id, &player.name).await?;
    db.add_name_to_history(&player.id, &stored.current_name).await?;
    let history = db
        .get_name_history(&player.id)
        .await?
        .into_iter()
        .map(|e| e.previous_name)
        .collect();

    Ok(ReconcileOutcome::Renamed {
        previous: stored.current_name,
        history,
    })
}

/// Reconcile one player and report the result. Errors stay scoped to this player.
pub async fn process_player(db: &Database, notifier: &Notifier, player: Player) {
    match reconcile_player(db, &player).await {
        Ok(outcome) => {
            metrics::PLAYERS_RECONCILED_TOTAL
                .with_label_values(&[outcome.label()])
                .inc();
            match &outcome {
                ReconcileOutcome::Renamed { previous, history } => {
                    notifier
                        .notify(&rename_message(previous, &player.name, history))
                        .await;
                }
                ReconcileOutcome::Inserted => {
                    tracing::debug!(player_id = %player.id, name = %player.name, "New player");
                }
                ReconcileOutcome::Unchanged => {}
            }
        }
        Err(e) => {
            metrics::PLAYERS_RECONCILED_TOTAL
                .with_label_values(&["error"])
                .inc();
            notifier
                .notify(&format!(
                    "Error reconciling player (ID: {}, Name: {}): {e}",
                    player.id, player.name
                ))
                .await;
        }
    }
}

/// `Player 'old' -> 'new', history: [a, b]`
pub fn rename_message(previous: &str, current: &str, history: &[String]) -> String {
    format!(
        "Player '{previous}' -> '{current}', history: [{}]",
        history.join(", ")
    )
}
