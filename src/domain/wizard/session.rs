//! WizardSession aggregate.
//!
//! A session walks one user through the expired items of one shopping list.
//! It references the list by ID only; the list in turn records which session
//! holds its lock.
//!
//! # Invariants
//!
//! - `decisions.len() <= expired_items.len()`
//! - at most one decision per item ID
//! - `current_item_index <= expired_items.len()`
//! - only an `Active` session accepts decisions, and only until
//!   CompleteWizard starts finalizing it
//! - a client-supplied idempotency key stays bound to the decision it first
//!   carried for the life of the session

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{
    DatasetVersion, IdempotencyKey, ItemId, ShoppingListId, StateMachine, Timestamp, UserId,
    WizardSessionId,
};

use super::bulk::plan_bulk_accept;
use super::changes::ItemChange;
use super::decision::{Decision, DecisionAction, DecisionSource};
use super::errors::WizardError;
use super::expired_item::ExpiredItem;
use super::status::WizardStatus;
use super::store_selection::{derive_store_selections, StoreSelection};
use super::summary::{MigrationSummary, WizardProgress, WizardResult};

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct NewWizardSession {
    pub user_id: UserId,
    pub list_id: ShoppingListId,
    pub expired_items: Vec<ExpiredItem>,
    pub dataset_version: DatasetVersion,
    /// Client key for replaying StartWizard; `None` disables replay.
    pub start_key: Option<IdempotencyKey>,
    pub ttl_secs: u64,
}

/// Result of recording a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded(Decision),
    /// The same logical decision was already stored; nothing changed.
    Replayed,
    /// The item already had this decision under another key. The decision
    /// is untouched but the new key is now bound to it, so the session
    /// must still be saved.
    KeyBound,
}

/// A client key and the decision it was first sent with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UsedKey {
    key: IdempotencyKey,
    item_id: ItemId,
    action: DecisionAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Completion {
    key: IdempotencyKey,
    result: WizardResult,
}

/// The migration wizard aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    id: WizardSessionId,
    user_id: UserId,
    list_id: ShoppingListId,
    status: WizardStatus,
    expired_items: Vec<ExpiredItem>,
    decisions: Vec<Decision>,
    selected_stores: Vec<StoreSelection>,
    current_item_index: usize,
    dataset_version: DatasetVersion,
    /// Bumped on every write; the store only accepts a write whose expected
    /// revision matches what it holds.
    revision: u64,
    started_at: Timestamp,
    expires_at: Timestamp,
    updated_at: Timestamp,
    start_key: Option<IdempotencyKey>,
    completion: Option<Completion>,
    /// Client keys seen by `record_decision`, including those whose decision
    /// was later overwritten.
    #[serde(default)]
    used_keys: Vec<UsedKey>,
    /// Set once CompleteWizard is about to touch the list. Decisions are
    /// frozen from then on.
    #[serde(default)]
    finalizing: bool,
}

impl WizardSession {
    /// Opens a new active session with the cursor on the first item.
    pub fn start(params: NewWizardSession, now: Timestamp) -> Self {
        Self {
            id: WizardSessionId::new(),
            user_id: params.user_id,
            list_id: params.list_id,
            status: WizardStatus::Active,
            expired_items: params.expired_items,
            decisions: Vec::new(),
            selected_stores: Vec::new(),
            current_item_index: 0,
            dataset_version: params.dataset_version,
            revision: 0,
            started_at: now,
            expires_at: now.plus_secs(params.ttl_secs),
            updated_at: now,
            start_key: params.start_key,
            completion: None,
            used_keys: Vec::new(),
            finalizing: false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> WizardSessionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn list_id(&self) -> ShoppingListId {
        self.list_id
    }

    pub fn status(&self) -> WizardStatus {
        self.status
    }

    pub fn expired_items(&self) -> &[ExpiredItem] {
        &self.expired_items
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn decision_for(&self, item_id: ItemId) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.item_id == item_id)
    }

    pub fn selected_stores(&self) -> &[StoreSelection] {
        &self.selected_stores
    }

    pub fn current_item_index(&self) -> usize {
        self.current_item_index
    }

    /// The item the cursor points at, `None` once every item is decided.
    pub fn current_item(&self) -> Option<&ExpiredItem> {
        self.expired_items.get(self.current_item_index)
    }

    pub fn dataset_version(&self) -> &DatasetVersion {
        &self.dataset_version
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn start_key(&self) -> Option<&IdempotencyKey> {
        self.start_key.as_ref()
    }

    /// True once CompleteWizard has frozen the decisions.
    pub fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    pub fn progress(&self) -> WizardProgress {
        WizardProgress::new(self.decisions.len(), self.expired_items.len())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization and lifecycle checks
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_owner(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// # Errors
    ///
    /// - `Unauthorized` if the user does not own the session
    pub fn authorize(&self, user_id: &UserId) -> Result<(), WizardError> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(WizardError::Unauthorized)
        }
    }

    /// # Errors
    ///
    /// - `SessionExpired` for any terminal status
    pub fn ensure_active(&self) -> Result<(), WizardError> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(WizardError::session_expired(self.id, self.status))
        }
    }

    /// # Errors
    ///
    /// - `SessionExpired` for any terminal status
    /// - `Conflict` while CompleteWizard is finalizing the session
    pub fn ensure_open(&self) -> Result<(), WizardError> {
        self.ensure_active()?;
        if self.finalizing {
            return Err(WizardError::Conflict { session_id: self.id });
        }
        Ok(())
    }

    /// True when an active session has outlived its deadline.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.status.is_active() && !now.is_before(&self.expires_at)
    }

    /// Seconds the store should keep this session.
    ///
    /// Active sessions stay past their deadline by `retention_secs` so the
    /// next read can still observe and report the expiration.
    pub fn storage_ttl_secs(&self, now: Timestamp, retention_secs: u64) -> u64 {
        if self.status.is_active() {
            self.expires_at.secs_until(&now) + retention_secs
        } else {
            retention_secs
        }
    }

    /// Returns the revision the store must currently hold and bumps the
    /// session to the next one.
    pub fn advance_revision(&mut self) -> u64 {
        let expected = self.revision;
        self.revision += 1;
        expected
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Records (or replaces) the decision for one item.
    ///
    /// A client key is remembered for the whole session: resending it
    /// replays, even after the item was decided differently under another
    /// key. Derived keys name the decision itself, so they only replay while
    /// that decision is the current one. An identical decision under a
    /// fresh key changes nothing.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the session is not active
    /// - `Conflict` if the session is being finalized
    /// - `NotFound` if the item is not part of the session
    /// - `InvalidDecision` if a replace names a suggestion the item lacks
    /// - `Validation` if the key was already used for a different decision
    pub fn record_decision(
        &mut self,
        item_id: ItemId,
        action: DecisionAction,
        idempotency_key: IdempotencyKey,
        source: DecisionSource,
        now: Timestamp,
    ) -> Result<RecordOutcome, WizardError> {
        self.ensure_open()?;

        let item = self
            .expired_items
            .iter()
            .find(|i| i.item_id == item_id)
            .ok_or_else(|| WizardError::item_not_found(item_id))?;

        if let DecisionAction::Replace { suggestion_id } = action {
            if item.suggestion(suggestion_id).is_none() {
                return Err(WizardError::invalid_decision(
                    item_id,
                    format!("offer {} is not a suggestion for this item", suggestion_id),
                ));
            }
        }

        let remember = !idempotency_key.is_derived();
        let previous = self
            .used_keys
            .iter()
            .find(|u| u.key == idempotency_key)
            .map(|u| (u.item_id, u.action))
            .or_else(|| {
                self.decisions
                    .iter()
                    .find(|d| d.idempotency_key == idempotency_key)
                    .map(|d| (d.item_id, d.action))
            });
        if let Some(previous) = previous {
            return if previous == (item_id, action) {
                Ok(RecordOutcome::Replayed)
            } else {
                Err(WizardError::validation(
                    "idempotency_key",
                    "key was already used for a different decision",
                ))
            };
        }

        if remember {
            self.used_keys.push(UsedKey {
                key: idempotency_key.clone(),
                item_id,
                action,
            });
        }

        let decision = Decision {
            item_id,
            action,
            idempotency_key,
            source,
            decided_at: now,
        };

        match self.decisions.iter().position(|d| d.item_id == item_id) {
            Some(idx) if self.decisions[idx].action == action => {
                return Ok(if remember {
                    self.updated_at = now;
                    RecordOutcome::KeyBound
                } else {
                    RecordOutcome::Replayed
                });
            }
            Some(idx) => self.decisions[idx] = decision.clone(),
            None => self.decisions.push(decision.clone()),
        }

        self.after_decisions_changed(now);
        Ok(RecordOutcome::Recorded(decision))
    }

    /// Accepts the best suggestion within the allowed stores for every
    /// undecided item. Returns the decisions that were added.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the session is not active
    /// - `Conflict` if the session is being finalized
    pub fn bulk_accept(
        &mut self,
        max_stores: usize,
        now: Timestamp,
    ) -> Result<Vec<Decision>, WizardError> {
        self.ensure_open()?;

        let plan = plan_bulk_accept(&self.expired_items, &self.decisions, max_stores);
        let session_id = self.id.to_string();
        let mut added = Vec::with_capacity(plan.picks.len());

        for pick in plan.picks {
            let key = IdempotencyKey::derive(&[
                "bulk_accept",
                &session_id,
                &pick.item_id.to_string(),
                &pick.offer_id.to_string(),
            ]);
            let action = DecisionAction::Replace {
                suggestion_id: pick.offer_id,
            };
            if let RecordOutcome::Recorded(decision) =
                self.record_decision(pick.item_id, action, key, DecisionSource::BulkAccept, now)?
            {
                added.push(decision);
            }
        }

        Ok(added)
    }

    /// The list changes the recorded decisions translate into, in decision order.
    pub fn planned_changes(&self) -> Vec<ItemChange> {
        self.decisions
            .iter()
            .filter_map(|decision| match decision.action {
                DecisionAction::Replace { suggestion_id } => self
                    .expired_items
                    .iter()
                    .find(|i| i.item_id == decision.item_id)
                    .and_then(|i| i.suggestion(suggestion_id))
                    .map(|s| ItemChange::Replace {
                        item_id: decision.item_id,
                        offer_id: s.offer_id,
                        store: s.store.clone(),
                        unit_price: s.price,
                        product_name: s.product_name.clone(),
                        valid_until: s.valid_until,
                    }),
                DecisionAction::Skip => Some(ItemChange::MarkReviewed {
                    item_id: decision.item_id,
                }),
                DecisionAction::Remove => Some(ItemChange::Remove {
                    item_id: decision.item_id,
                }),
            })
            .collect()
    }

    pub fn summary(&self) -> MigrationSummary {
        let mut migrated = 0;
        let mut skipped = 0;
        let mut removed = 0;
        let mut confidence_sum = 0.0;

        for decision in &self.decisions {
            match decision.action {
                DecisionAction::Replace { suggestion_id } => {
                    migrated += 1;
                    confidence_sum += self
                        .expired_items
                        .iter()
                        .find(|i| i.item_id == decision.item_id)
                        .and_then(|i| i.suggestion(suggestion_id))
                        .map_or(0.0, |s| s.confidence);
                }
                DecisionAction::Skip => skipped += 1,
                DecisionAction::Remove => removed += 1,
            }
        }

        let average_confidence = if migrated == 0 {
            0.0
        } else {
            confidence_sum / migrated as f64
        };

        MigrationSummary {
            total_items: self.expired_items.len(),
            items_migrated: migrated,
            items_skipped: skipped,
            items_removed: removed,
            items_undecided: self.expired_items.len() - self.decisions.len(),
            total_savings: self.selected_stores.iter().map(|s| s.savings).sum(),
            stores_used: self.selected_stores.len(),
            average_confidence,
        }
    }

    /// Result stored by a previous CompleteWizard under the same key.
    pub fn completed_result(&self, key: &IdempotencyKey) -> Option<&WizardResult> {
        match (&self.status, &self.completion) {
            (WizardStatus::Completed, Some(c)) if &c.key == key => Some(&c.result),
            _ => None,
        }
    }

    /// Freezes the decisions ahead of applying them to the list. Returns
    /// false if an earlier attempt already froze them.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the session is not active
    pub fn begin_finalizing(&mut self, now: Timestamp) -> Result<bool, WizardError> {
        self.ensure_active()?;
        if self.finalizing {
            return Ok(false);
        }
        self.finalizing = true;
        self.updated_at = now;
        Ok(true)
    }

    /// Marks the session completed and stores the result for replays.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the session is not active
    pub fn complete(
        &mut self,
        key: IdempotencyKey,
        now: Timestamp,
    ) -> Result<WizardResult, WizardError> {
        self.ensure_active()?;
        self.status = self.status.transition_to(WizardStatus::Completed)?;

        let result = WizardResult {
            session_id: self.id,
            list_id: self.list_id,
            summary: self.summary(),
            selected_stores: self.selected_stores.clone(),
            completed_at: now,
        };
        self.completion = Some(Completion {
            key,
            result: result.clone(),
        });
        self.updated_at = now;
        Ok(result)
    }

    /// Cancels an active session, discarding its decisions.
    ///
    /// Returns the number of discarded decisions, or `None` if the session
    /// was already terminal.
    pub fn cancel(&mut self, now: Timestamp) -> Option<usize> {
        self.status = self.status.transition_to(WizardStatus::Cancelled).ok()?;
        let discarded = self.decisions.len();
        self.decisions.clear();
        self.selected_stores.clear();
        self.current_item_index = 0;
        self.updated_at = now;
        Some(discarded)
    }

    /// Forces an active session into `Expired`. Returns false if it was
    /// already terminal.
    pub fn expire(&mut self, now: Timestamp) -> bool {
        let Ok(expired) = self.status.transition_to(WizardStatus::Expired) else {
            return false;
        };
        self.status = expired;
        self.updated_at = now;
        true
    }

    fn after_decisions_changed(&mut self, now: Timestamp) {
        let decided: HashSet<ItemId> = self.decisions.iter().map(|d| d.item_id).collect();
        self.current_item_index = self
            .expired_items
            .iter()
            .position(|i| !decided.contains(&i.item_id))
            .unwrap_or(self.expired_items.len());
        self.selected_stores = derive_store_selections(&self.expired_items, &self.decisions);
        self.updated_at = now;
    }
}
