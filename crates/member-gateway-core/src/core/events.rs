// crates/member-gateway-core/src/core/events.rs
// ============================================================================
// Module: Member Gateway Events
// Description: Broker message schema for deferred member actions.
// Purpose: Encode and decode deletion retries as string attributes.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Deferred actions travel as broker attributes only; the message body is
//! unused. Decoding is strict on the subject and action and tolerant on the
//! attempt timestamp so older producers stay compatible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::PrincipalId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Attribute carrying the member subject.
pub const ATTR_FIREBASE_ID: &str = "firebaseID";
/// Attribute carrying the action label.
pub const ATTR_ACTION: &str = "action";
/// Attribute carrying the original attempt time in epoch milliseconds.
pub const ATTR_ATTEMPT_EPOCH: &str = "attemptEpoch";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Member action carried by a broker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberAction {
    /// Delete the member record in the backend.
    Delete,
}

impl MemberAction {
    /// Returns the wire label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
        }
    }

    /// Parses a wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Deferred member deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionEvent {
    /// Member whose backend record must be removed.
    pub principal_id: PrincipalId,
    /// Requested action.
    pub action: MemberAction,
    /// Epoch milliseconds of the original attempt.
    pub attempt_epoch_ms: u64,
}

/// Errors raised while decoding broker attributes.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventDecodeError {
    /// A required attribute was absent or empty.
    #[error("missing attribute: {0}")]
    MissingAttribute(&'static str),
    /// The action attribute named an unsupported action.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
}

impl DeletionEvent {
    /// Creates a deletion event stamped with the current time.
    #[must_use]
    pub fn new(principal_id: PrincipalId) -> Self {
        Self {
            principal_id,
            action: MemberAction::Delete,
            attempt_epoch_ms: now_epoch_ms(),
        }
    }

    /// Encodes the event as broker attributes.
    #[must_use]
    pub fn to_attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ATTR_FIREBASE_ID.to_string(), self.principal_id.to_string()),
            (ATTR_ACTION.to_string(), self.action.as_str().to_string()),
            (ATTR_ATTEMPT_EPOCH.to_string(), self.attempt_epoch_ms.to_string()),
        ])
    }

    /// Decodes broker attributes into an event.
    ///
    /// # Errors
    ///
    /// Returns [`EventDecodeError`] when the subject or action is missing, or
    /// when the action is not supported.
    pub fn from_attributes(attributes: &BTreeMap<String, String>) -> Result<Self, EventDecodeError> {
        let action_label = attributes
            .get(ATTR_ACTION)
            .filter(|value| !value.is_empty())
            .ok_or(EventDecodeError::MissingAttribute(ATTR_ACTION))?;
        let action = MemberAction::parse(action_label)
            .ok_or_else(|| EventDecodeError::UnsupportedAction(action_label.clone()))?;
        let principal_id = attributes
            .get(ATTR_FIREBASE_ID)
            .filter(|value| !value.is_empty())
            .ok_or(EventDecodeError::MissingAttribute(ATTR_FIREBASE_ID))?;
        let attempt_epoch_ms = attributes
            .get(ATTR_ATTEMPT_EPOCH)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or_default();
        Ok(Self {
            principal_id: PrincipalId::new(principal_id.clone()),
            action,
            attempt_epoch_ms,
        })
    }
}

/// Returns the current time in epoch milliseconds, saturating on overflow.
#[must_use]
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
