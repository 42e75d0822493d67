//! Status vocabulary: phases, conditions and the derived lifecycle view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type reported on every managed resource
pub const READY_CONDITION: &str = "Ready";

/// Coarse phase surfaced to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Remote entity requested but not yet confirmed in sync
    Pending,
    /// Remote entity exists and matches the resource spec
    Available,
    /// Terminal success (reserved for one-shot operations)
    Success,
    /// A non-fatal part of the pass failed; see the message
    Warning,
    /// The resource cannot make progress without a spec or credential fix
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Available => "Available",
            Phase::Success => "Success",
            Phase::Warning => "Warning",
            Phase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A single observed condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub observed_generation: i64,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn ready(
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        observed_generation: i64,
    ) -> Self {
        Self {
            condition_type: READY_CONDITION.to_string(),
            status,
            reason: reason.into(),
            message: message.into(),
            observed_generation,
            last_transition_time: Utc::now(),
        }
    }

    /// Inserts or replaces the condition of the same type.
    ///
    /// The transition time is carried over unless the status flipped.
    pub fn upsert(conditions: &mut Vec<Condition>, mut condition: Condition) {
        match conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => conditions.push(condition),
        }
    }

    pub fn find<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
        conditions.iter().find(|c| c.condition_type == condition_type)
    }
}

/// Lifecycle position derived from metadata and status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Absent,
    Creating,
    Available,
    Warning,
    Deleting,
}

impl LifecycleState {
    /// Derives the lifecycle position of a record.
    pub fn derive(
        deleting: bool,
        has_finalizer: bool,
        external_id: &str,
        phase: Option<Phase>,
    ) -> Self {
        if deleting {
            return LifecycleState::Deleting;
        }
        if external_id.is_empty() {
            return if has_finalizer {
                LifecycleState::Creating
            } else {
                LifecycleState::Absent
            };
        }
        match phase {
            None | Some(Phase::Pending) => LifecycleState::Creating,
            Some(Phase::Warning) | Some(Phase::Failed) => LifecycleState::Warning,
            Some(Phase::Available) | Some(Phase::Success) => LifecycleState::Available,
        }
    }
}
