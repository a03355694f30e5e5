//! # Sharded Transaction
//!
//! Best-effort coordination of one local transaction per touched shard.
//! Participants commit one after another; a failure does not stop the
//! remaining commits and nothing is compensated. Callers that need
//! atomicity must not rely on this type for it.
//!
//! ```text
//! NotStarted ──begin──→ Active ──commit──→ Committed
//!                         │  ╲
//!                         │   ╲ commit (partial failure)
//!                         │    ↓
//!                         │  CommitFailed
//!                         │    │
//!                         └────┴──rollback──→ RolledBack
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    invariant_all_participants, FederationError, ShardFailure, ShardId, TransactionState,
};
use crate::ports::outbound::{ShardTransaction, TransactionSynchronization};

struct Participant {
    shard_id: ShardId,
    tx: Box<dyn ShardTransaction>,
    status: TransactionState,
}

/// Coordinates the per-shard transactions of one sharded session.
pub struct ShardedTransaction {
    state: TransactionState,
    timeout_secs: Option<u32>,
    participants: Vec<Participant>,
    synchronizations: Vec<Arc<dyn TransactionSynchronization>>,
}

impl ShardedTransaction {
    /// Not-yet-started transaction; `timeout_secs` is applied to every
    /// participant.
    pub fn new(timeout_secs: Option<u32>) -> Self {
        Self {
            state: TransactionState::NotStarted,
            timeout_secs,
            participants: Vec::new(),
            synchronizations: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// True while participants may be enlisted.
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// True if `shard_id` has already been enlisted.
    pub fn is_participant(&self, shard_id: ShardId) -> bool {
        self.participants.iter().any(|p| p.shard_id == shard_id)
    }

    /// Per-participant status, in enlistment order.
    pub fn participant_outcomes(&self) -> Vec<(ShardId, TransactionState)> {
        self.participants
            .iter()
            .map(|p| (p.shard_id, p.status))
            .collect()
    }

    /// Committed, and every participant reports committed.
    pub fn was_committed(&self) -> bool {
        self.state == TransactionState::Committed
            && invariant_all_participants(&self.participant_outcomes(), TransactionState::Committed)
    }

    /// Rolled back, and every participant reports rolled back.
    pub fn was_rolled_back(&self) -> bool {
        self.state == TransactionState::RolledBack
            && invariant_all_participants(&self.participant_outcomes(), TransactionState::RolledBack)
    }

    /// Register completion hooks.
    pub fn register_synchronization(&mut self, sync: Arc<dyn TransactionSynchronization>) {
        self.synchronizations.push(sync);
    }

    /// Set the participant timeout, including for already-enlisted shards.
    pub fn set_timeout(&mut self, seconds: u32) {
        self.timeout_secs = Some(seconds);
        for participant in &mut self.participants {
            participant.tx.set_timeout(seconds);
        }
    }

    /// `NotStarted → Active`. No shard is contacted.
    pub fn begin(&mut self) -> Result<(), FederationError> {
        if self.state != TransactionState::NotStarted {
            return Err(FederationError::TransactionState {
                operation: "begin",
                state: self.state,
            });
        }
        self.state = TransactionState::Active;
        info!("[shard-fed] Sharded transaction started");
        Ok(())
    }

    /// Return a finished transaction to `NotStarted`, keeping its timeout
    /// and synchronizations.
    pub fn reset(&mut self) -> Result<(), FederationError> {
        if !self.state.is_terminal() {
            return Err(FederationError::TransactionState {
                operation: "reset",
                state: self.state,
            });
        }
        self.participants.clear();
        self.state = TransactionState::NotStarted;
        Ok(())
    }

    /// Begin `tx` and register it as a participant.
    ///
    /// A shard that is already a participant is left alone. If `begin`
    /// fails the shard is not registered.
    pub async fn enlist(&mut self, mut tx: Box<dyn ShardTransaction>) -> Result<(), FederationError> {
        if !self.is_active() {
            return Err(FederationError::TransactionState {
                operation: "enlist",
                state: self.state,
            });
        }

        let shard_id = tx.shard_id();
        if self.is_participant(shard_id) {
            return Ok(());
        }

        if let Some(seconds) = self.timeout_secs {
            tx.set_timeout(seconds);
        }
        tx.begin().await?;

        debug!("[shard-fed] Enlisted {} in sharded transaction", shard_id);
        self.participants.push(Participant {
            shard_id,
            tx,
            status: TransactionState::Active,
        });
        Ok(())
    }

    /// Commit every participant in enlistment order.
    ///
    /// All participants are attempted. On any failure the transaction moves
    /// to `CommitFailed`; shards that already committed stay committed.
    pub async fn commit(&mut self) -> Result<(), FederationError> {
        if !self.is_active() {
            return Err(FederationError::TransactionState {
                operation: "commit",
                state: self.state,
            });
        }

        let mut committed = Vec::new();
        let mut failures = Vec::new();

        for participant in &mut self.participants {
            let shard_id = participant.shard_id;
            for sync in &self.synchronizations {
                sync.before_completion(shard_id);
            }

            match participant.tx.commit().await {
                Ok(()) => {
                    participant.status = TransactionState::Committed;
                    committed.push(shard_id);
                }
                Err(e) => {
                    warn!("[shard-fed] Commit failed on {}: {}", shard_id, e);
                    participant.status = TransactionState::CommitFailed;
                    failures.push(ShardFailure::new(shard_id, e));
                }
            }

            for sync in &self.synchronizations {
                sync.after_completion(shard_id, participant.status);
            }
        }

        if failures.is_empty() {
            self.state = TransactionState::Committed;
            info!(
                "[shard-fed] Sharded transaction committed on {} shards",
                committed.len()
            );
            Ok(())
        } else {
            self.state = TransactionState::CommitFailed;
            warn!(
                "[shard-fed] Partial commit: {} committed, {} failed",
                committed.len(),
                failures.len()
            );
            Err(FederationError::PartialCommitFailure {
                committed,
                failures,
            })
        }
    }

    /// Roll back every participant that has not committed.
    ///
    /// Failures are collected, not short-circuited. The transaction is
    /// `RolledBack` afterwards either way.
    pub async fn rollback(&mut self) -> Result<(), FederationError> {
        if !matches!(
            self.state,
            TransactionState::Active | TransactionState::CommitFailed
        ) {
            return Err(FederationError::TransactionState {
                operation: "rollback",
                state: self.state,
            });
        }

        let mut rolled_back = Vec::new();
        let mut failures = Vec::new();

        for participant in &mut self.participants {
            if participant.status == TransactionState::Committed {
                continue;
            }
            let shard_id = participant.shard_id;
            match participant.tx.rollback().await {
                Ok(()) => {
                    participant.status = TransactionState::RolledBack;
                    rolled_back.push(shard_id);
                }
                Err(e) => {
                    warn!("[shard-fed] Rollback failed on {}: {}", shard_id, e);
                    failures.push(ShardFailure::new(shard_id, e));
                }
            }
            for sync in &self.synchronizations {
                sync.after_completion(shard_id, participant.status);
            }
        }

        self.state = TransactionState::RolledBack;
        if failures.is_empty() {
            info!(
                "[shard-fed] Sharded transaction rolled back on {} shards",
                rolled_back.len()
            );
            Ok(())
        } else {
            Err(FederationError::PartialRollbackFailure {
                rolled_back,
                failures,
            })
        }
    }
}

impl Default for ShardedTransaction {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for ShardedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedTransaction")
            .field("state", &self.state)
            .field("timeout_secs", &self.timeout_secs)
            .field("participants", &self.participant_outcomes())
            .finish()
    }
}
