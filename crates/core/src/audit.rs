//! Append-only audit trail with a per-customer hash chain
//!
//! ```text
//! GENESIS ─► entry#1 (prev=GENESIS, hash=h1) ─► entry#2 (prev=h1, hash=h2) ─► ...
//! ```
//!
//! Entries are built unsealed by the components, then sealed by the service
//! against the customer's last link right before commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::customer::Actor;
use crate::types::AuditAction;

/// Seed for the first entry of every chain
pub const GENESIS_HASH: &str = "GENESIS";

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Position in the customer's chain, starting at 1 (0 = unsealed)
    pub sequence: u64,
    pub action: AuditAction,
    pub description: String,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub additional_data: serde_json::Value,
    pub prev_hash: String,
    pub hash: String,
}

impl AuditEntry {
    pub fn new(
        customer_id: Uuid,
        action: AuditAction,
        description: impl Into<String>,
        actor: &Actor,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            sequence: 0,
            action,
            description: description.into(),
            actor: actor.clone(),
            timestamp,
            field_changed: None,
            old_value: None,
            new_value: None,
            additional_data: serde_json::Value::Null,
            prev_hash: String::new(),
            hash: String::new(),
        }
    }

    /// Record a before/after value
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old_value: impl ToString,
        new_value: impl ToString,
    ) -> Self {
        self.field_changed = Some(field.into());
        self.old_value = Some(old_value.to_string());
        self.new_value = Some(new_value.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.additional_data = data;
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.sequence > 0 && !self.hash.is_empty()
    }
}

/// Tail of a customer's chain, used to seal new entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditChain {
    pub next_sequence: u64,
    pub last_hash: String,
}

impl Default for AuditChain {
    fn default() -> Self {
        Self::genesis()
    }
}

impl AuditChain {
    pub fn genesis() -> Self {
        Self {
            next_sequence: 1,
            last_hash: GENESIS_HASH.to_string(),
        }
    }

    /// Continue a chain whose last sealed entry had `sequence` and `hash`
    pub fn resume(sequence: u64, hash: impl Into<String>) -> Self {
        Self {
            next_sequence: sequence + 1,
            last_hash: hash.into(),
        }
    }

    /// Link an entry onto the chain and compute its hash
    pub fn seal(&mut self, mut entry: AuditEntry) -> AuditEntry {
        entry.sequence = self.next_sequence;
        entry.prev_hash = self.last_hash.clone();
        entry.hash = calculate_entry_hash(&entry);

        self.next_sequence += 1;
        self.last_hash = entry.hash.clone();
        entry
    }

    pub fn seal_all(&mut self, entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
        entries.into_iter().map(|e| self.seal(e)).collect()
    }
}

/// SHA256 over every field except `hash`
pub fn calculate_entry_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();

    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(entry.prev_hash.as_bytes());
    hasher.update(entry.id.as_bytes());
    hasher.update(entry.customer_id.as_bytes());
    hasher.update(entry.action.to_string().as_bytes());
    hasher.update(entry.description.as_bytes());
    hasher.update(entry.actor.id.as_bytes());
    hasher.update(entry.actor.name.as_bytes());
    hasher.update(entry.timestamp.to_rfc3339().as_bytes());

    for part in [&entry.field_changed, &entry.old_value, &entry.new_value] {
        match part {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }

    // serde_json maps are sorted, so this is deterministic
    hasher.update(entry.additional_data.to_string().as_bytes());

    hex::encode(hasher.finalize())
}

/// Verify a customer's chain, ordered by sequence
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut expected_sequence = 1;

    for entry in entries {
        if entry.sequence != expected_sequence {
            return Err(ChainError::InvalidSequence {
                expected: expected_sequence,
                actual: entry.sequence,
            });
        }

        if entry.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: entry.sequence,
                expected: prev_hash,
                actual: entry.prev_hash.clone(),
            });
        }

        let calculated = calculate_entry_hash(entry);
        if entry.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: entry.sequence,
                expected: calculated,
                actual: entry.hash.clone(),
            });
        }

        prev_hash = entry.hash.clone();
        expected_sequence += 1;
    }

    Ok(())
}

/// Errors in hash chain verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(n: usize) -> Vec<AuditEntry> {
        let customer_id = Uuid::new_v4();
        let actor = Actor::new("officer-1", "Officer One");
        let mut chain = AuditChain::genesis();
        (0..n)
            .map(|i| {
                let entry = AuditEntry::new(
                    customer_id,
                    AuditAction::StatusChange,
                    format!("change {}", i),
                    &actor,
                    Utc::now(),
                )
                .with_change("status", "pending", "under_review")
                .with_data(json!({ "step": i }));
                chain.seal(entry)
            })
            .collect()
    }

    #[test]
    fn test_sealed_chain_verifies() {
        let chain = entries(3);
        assert_eq!(chain[0].prev_hash, GENESIS_HASH);
        assert_eq!(chain[1].prev_hash, chain[0].hash);
        assert_eq!(chain[2].sequence, 3);
        assert!(chain.iter().all(|e| e.is_sealed()));
        assert!(verify_chain(&chain).is_ok());
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(verify_chain(&[]).is_ok());
    }

    #[test]
    fn test_tampered_description_detected() {
        let mut chain = entries(2);
        chain[1].description = "rewritten".to_string();
        assert!(matches!(
            verify_chain(&chain),
            Err(ChainError::InvalidHash { sequence: 2, .. })
        ));
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = entries(3);
        chain.remove(1);
        assert!(matches!(
            verify_chain(&chain),
            Err(ChainError::InvalidSequence { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_resume_continues_chain() {
        let mut first = entries(2);
        let last = first.last().unwrap().clone();
        let mut chain = AuditChain::resume(last.sequence, last.hash.clone());
        let next = chain.seal(AuditEntry::new(
            last.customer_id,
            AuditAction::Update,
            "assigned officer",
            &Actor::system("test"),
            Utc::now(),
        ));
        first.push(next);
        assert!(verify_chain(&first).is_ok());
    }
}
