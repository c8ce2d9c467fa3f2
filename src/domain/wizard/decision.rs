//! User decisions on expired items.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{IdempotencyKey, ItemId, OfferId, Timestamp};

use super::errors::WizardError;

/// What to do with an expired item.
///
/// `Replace` carries the chosen suggestion, so a replace without a target
/// cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionAction {
    /// Relink the item to the offer behind the chosen suggestion.
    Replace { suggestion_id: OfferId },
    /// Keep the item as is and mark it reviewed.
    Skip,
    /// Delete the item from the list.
    Remove,
}

impl DecisionAction {
    /// Builds an action from its wire form.
    ///
    /// # Errors
    ///
    /// - `Validation` for an unknown action name
    /// - `InvalidDecision` when `replace` lacks a suggestion or
    ///   `skip`/`remove` carries one
    pub fn parse(
        item_id: ItemId,
        action: &str,
        suggestion_id: Option<OfferId>,
    ) -> Result<Self, WizardError> {
        match (action.trim().to_ascii_lowercase().as_str(), suggestion_id) {
            ("replace", Some(suggestion_id)) => Ok(DecisionAction::Replace { suggestion_id }),
            ("replace", None) => Err(WizardError::invalid_decision(
                item_id,
                "replace requires a suggestion id",
            )),
            ("skip", None) => Ok(DecisionAction::Skip),
            ("remove", None) => Ok(DecisionAction::Remove),
            ("skip" | "remove", Some(_)) => Err(WizardError::invalid_decision(
                item_id,
                "only replace accepts a suggestion id",
            )),
            (other, _) => Err(WizardError::validation(
                "action",
                format!("unknown action '{}', expected replace, skip or remove", other),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DecisionAction::Replace { .. } => "replace",
            DecisionAction::Skip => "skip",
            DecisionAction::Remove => "remove",
        }
    }

    pub fn suggestion_id(&self) -> Option<OfferId> {
        match self {
            DecisionAction::Replace { suggestion_id } => Some(*suggestion_id),
            DecisionAction::Skip | DecisionAction::Remove => None,
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionAction::Replace { suggestion_id } => write!(f, "replace:{}", suggestion_id),
            other => f.write_str(other.name()),
        }
    }
}

/// Who produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    User,
    BulkAccept,
}

/// A recorded decision. Values are never mutated; deciding an item again
/// replaces the entry with a new decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub item_id: ItemId,
    pub action: DecisionAction,
    pub idempotency_key: IdempotencyKey,
    pub source: DecisionSource,
    pub decided_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn parse_accepts_known_actions() {
        let item = ItemId::new(1);
        assert_eq!(
            DecisionAction::parse(item, "Replace", Some(OfferId::new(9))).unwrap(),
            DecisionAction::Replace {
                suggestion_id: OfferId::new(9)
            }
        );
        assert_eq!(DecisionAction::parse(item, "skip", None).unwrap(), DecisionAction::Skip);
        assert_eq!(
            DecisionAction::parse(item, " REMOVE ", None).unwrap(),
            DecisionAction::Remove
        );
    }

    #[test]
    fn parse_rejects_replace_without_suggestion() {
        let err = DecisionAction::parse(ItemId::new(1), "replace", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDecision);
    }

    #[test]
    fn parse_rejects_suggestion_on_skip() {
        let err = DecisionAction::parse(ItemId::new(1), "skip", Some(OfferId::new(3))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDecision);
    }

    #[test]
    fn parse_rejects_unknown_action() {
        let err = DecisionAction::parse(ItemId::new(1), "archive", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn decision_serializes_with_tagged_action() {
        let decision = Decision {
            item_id: ItemId::new(4),
            action: DecisionAction::Replace {
                suggestion_id: OfferId::new(77),
            },
            idempotency_key: IdempotencyKey::new("k1").unwrap(),
            source: DecisionSource::User,
            decided_at: Timestamp::from_unix_secs(0),
        };

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["action"]["type"], "replace");
        assert_eq!(json["action"]["suggestion_id"], 77);

        let restored: Decision = serde_json::from_value(json).unwrap();
        assert_eq!(restored, decision);
    }
}
