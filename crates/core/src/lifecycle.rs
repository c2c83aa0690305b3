//! Referral status state machine.
//!
//! ```text
//!   PENDING ──► IN_PROGRESS ──► COMPLETED
//!      │             │
//!      └─────┬───────┘
//!            ▼
//!        CANCELLED
//! ```
//!
//! `COMPLETED` and `CANCELLED` are terminal. Any request outside these edges, including a
//! request to stay in the current state, fails with [`CoreError::InvalidTransition`].

use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use crate::models::Referral;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ReferralStatus {
    pub const ALL: [ReferralStatus; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Validation(format!("unknown referral status: {s}")))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States reachable in one step from `self`.
    pub fn next_states(&self) -> &'static [ReferralStatus] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: ReferralStatus) -> bool {
        self.next_states().contains(&target)
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a referral's status audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: ReferralStatus,
    pub to: ReferralStatus,
    pub changed_by: RecordId,
    pub changed_at: DateTime<Utc>,
}

/// Moves `referral` to `target`, recording `actor` in the status history.
///
/// On error the referral is left untouched, including `updated_at`.
pub fn transition(
    referral: &mut Referral,
    target: ReferralStatus,
    actor: RecordId,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let from = referral.status;
    if !from.can_transition_to(target) {
        return Err(CoreError::InvalidTransition { from, to: target });
    }

    referral.status = target;
    referral.status_history.push(StatusChange {
        from,
        to: target,
        changed_by: actor,
        changed_at: now,
    });
    referral.touch(now);
    Ok(())
}
