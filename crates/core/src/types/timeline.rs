//! Order lifecycle rules and the timestamped status timeline.
//!
//! The state machine itself is small: every state has exactly one forward
//! successor, and any non-terminal state may be cancelled. What makes it
//! worth a module is that the rules are enforced in exactly one place and
//! every accepted move leaves a [`TimelineEntry`] behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::{OrderStatus, UserRole};

/// A rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The order is already `completed` or `cancelled`.
    #[error("order is already {from} and cannot change")]
    Terminal {
        /// Current status.
        from: OrderStatus,
    },
    /// The requested status equals the current one.
    #[error("order is already {from}")]
    Unchanged {
        /// Current status.
        from: OrderStatus,
    },
    /// The requested status lies behind the current one.
    #[error("order cannot go back from {from} to {to}")]
    Regression {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
    /// The requested status skips one or more steps of the forward path.
    #[error("order cannot jump from {from} to {to}; next step is {expected}")]
    Skipped {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
        /// The only forward status accepted from `from`.
        expected: OrderStatus,
    },
    /// The state machine allows the move but the caller's role does not.
    #[error("{role} may not move an order from {from} to {to}")]
    NotPermitted {
        /// Caller's role.
        role: UserRole,
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

impl OrderStatus {
    /// Check a status change against the lifecycle.
    ///
    /// Accepts exactly the forward successor, or `cancelled` from any
    /// non-terminal state.
    ///
    /// # Errors
    ///
    /// Returns the [`TransitionError`] describing why the move is rejected.
    pub fn validate_transition(self, to: Self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal { from: self });
        }
        if self == to {
            return Err(TransitionError::Unchanged { from: self });
        }
        if to == Self::Cancelled {
            return Ok(());
        }

        match (self.next(), self.rank(), to.rank()) {
            (Some(expected), _, _) if expected == to => Ok(()),
            (_, Some(from_rank), Some(to_rank)) if to_rank < from_rank => {
                Err(TransitionError::Regression { from: self, to })
            }
            (Some(expected), _, _) => Err(TransitionError::Skipped {
                from: self,
                to,
                expected,
            }),
            // Non-terminal states always have a successor.
            (None, _, _) => Err(TransitionError::Terminal { from: self }),
        }
    }

    /// Whether [`validate_transition`](Self::validate_transition) would accept `to`.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.validate_transition(to).is_ok()
    }
}

/// Who may drive which transitions.
///
/// Ownership (the customer placed the order, the worker is assigned to it) is
/// checked by the caller; this policy only answers the role question.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionPolicy;

impl TransitionPolicy {
    /// Statuses a customer may still cancel from.
    pub const CUSTOMER_CANCELLABLE: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Assigned,
    ];

    /// Check both the lifecycle and the role permission.
    ///
    /// - admins may make any valid transition;
    /// - workers drive the field steps `assigned -> ... -> completed`;
    /// - customers may only cancel, and only before the worker sets out.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error first, then [`TransitionError::NotPermitted`].
    pub fn check(
        self,
        role: UserRole,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), TransitionError> {
        from.validate_transition(to)?;

        let permitted = match role {
            UserRole::Admin => true,
            UserRole::Worker => {
                to != OrderStatus::Cancelled && from.rank() >= OrderStatus::Assigned.rank()
            }
            UserRole::Customer => {
                to == OrderStatus::Cancelled && Self::CUSTOMER_CANCELLABLE.contains(&from)
            }
        };

        if permitted {
            Ok(())
        } else {
            Err(TransitionError::NotPermitted { role, from, to })
        }
    }

    /// Boolean form of [`check`](Self::check).
    #[must_use]
    pub fn permits(self, role: UserRole, from: OrderStatus, to: OrderStatus) -> bool {
        self.check(role, from, to).is_ok()
    }
}

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Status entered.
    pub status: OrderStatus,
    /// When it was entered.
    pub timestamp: DateTime<Utc>,
    /// User who made the change, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,
    /// Free-form note (cancellation reason, worker remark).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Append-only list of status changes, stored as a JSONB array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline(Vec<TimelineEntry>);

impl Timeline {
    /// Start a timeline with the initial `pending` entry.
    #[must_use]
    pub fn started(at: DateTime<Utc>, actor: Option<UserId>) -> Self {
        Self(vec![TimelineEntry {
            status: OrderStatus::Pending,
            timestamp: at,
            actor,
            note: None,
        }])
    }

    /// Append an entry without checking the lifecycle and return a copy of it.
    pub fn record(
        &mut self,
        status: OrderStatus,
        at: DateTime<Utc>,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> TimelineEntry {
        let entry = TimelineEntry {
            status,
            timestamp: at,
            actor,
            note,
        };
        self.0.push(entry.clone());
        entry
    }

    /// Validate `to` against the latest entry, append it and return the new
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns the lifecycle error; the timeline is unchanged on error.
    pub fn advance(
        &mut self,
        to: OrderStatus,
        at: DateTime<Utc>,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> Result<TimelineEntry, TransitionError> {
        self.current().validate_transition(to)?;
        Ok(self.record(to, at, actor, note))
    }

    /// Status of the most recent entry (`pending` for an empty timeline).
    #[must_use]
    pub fn current(&self) -> OrderStatus {
        self.0.last().map_or(OrderStatus::Pending, |e| e.status)
    }

    /// When `status` was first entered.
    #[must_use]
    pub fn entered_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        self.0
            .iter()
            .find(|e| e.status == status)
            .map(|e| e.timestamp)
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_every_forward_step_is_accepted() {
        for status in OrderStatus::FORWARD_PATH {
            if let Some(next) = status.next() {
                assert!(status.can_transition_to(next), "{status} -> {next}");
            }
        }
    }

    #[test]
    fn test_status_never_regresses() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if from.can_transition_to(*to) && *to != OrderStatus::Cancelled {
                    assert!(to.rank() > from.rank(), "{from} -> {to} went backwards");
                }
            }
        }
    }

    #[test]
    fn test_regression_error() {
        assert_eq!(
            OrderStatus::Arrived.validate_transition(OrderStatus::Confirmed),
            Err(TransitionError::Regression {
                from: OrderStatus::Arrived,
                to: OrderStatus::Confirmed,
            })
        );
    }

    #[test]
    fn test_skip_error_names_expected_step() {
        assert_eq!(
            OrderStatus::Pending.validate_transition(OrderStatus::Assigned),
            Err(TransitionError::Skipped {
                from: OrderStatus::Pending,
                to: OrderStatus::Assigned,
                expected: OrderStatus::Confirmed,
            })
        );
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for from in OrderStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(OrderStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in OrderStatus::ALL {
            assert!(matches!(
                OrderStatus::Completed.validate_transition(*to),
                Err(TransitionError::Terminal { .. })
            ));
            assert!(matches!(
                OrderStatus::Cancelled.validate_transition(*to),
                Err(TransitionError::Terminal { .. })
            ));
        }
    }

    #[test]
    fn test_unchanged_rejected() {
        assert_eq!(
            OrderStatus::OnTheWay.validate_transition(OrderStatus::OnTheWay),
            Err(TransitionError::Unchanged {
                from: OrderStatus::OnTheWay
            })
        );
    }

    #[test]
    fn test_policy_customer_can_only_cancel_early() {
        let policy = TransitionPolicy;
        assert!(policy.permits(
            UserRole::Customer,
            OrderStatus::Pending,
            OrderStatus::Cancelled
        ));
        assert!(policy.permits(
            UserRole::Customer,
            OrderStatus::Assigned,
            OrderStatus::Cancelled
        ));
        assert!(!policy.permits(
            UserRole::Customer,
            OrderStatus::OnTheWay,
            OrderStatus::Cancelled
        ));
        assert!(!policy.permits(
            UserRole::Customer,
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
    }

    #[test]
    fn test_policy_worker_drives_field_steps() {
        let policy = TransitionPolicy;
        assert!(policy.permits(
            UserRole::Worker,
            OrderStatus::Assigned,
            OrderStatus::OnTheWay
        ));
        assert!(policy.permits(
            UserRole::Worker,
            OrderStatus::InProgress,
            OrderStatus::Completed
        ));
        assert!(!policy.permits(
            UserRole::Worker,
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
        assert!(!policy.permits(
            UserRole::Worker,
            OrderStatus::Arrived,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_policy_admin_still_bound_by_lifecycle() {
        let policy = TransitionPolicy;
        assert!(policy.permits(
            UserRole::Admin,
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
        assert!(matches!(
            policy.check(
                UserRole::Admin,
                OrderStatus::Completed,
                OrderStatus::Cancelled
            ),
            Err(TransitionError::Terminal { .. })
        ));
    }

    #[test]
    fn test_timeline_records_full_journey() {
        let start = Utc::now();
        let mut timeline = Timeline::started(start, Some(UserId::new(1)));
        let mut at = start;
        for status in OrderStatus::FORWARD_PATH.iter().skip(1) {
            at += Duration::minutes(5);
            timeline.advance(*status, at, None, None).unwrap();
        }

        assert_eq!(timeline.len(), OrderStatus::FORWARD_PATH.len());
        assert_eq!(timeline.current(), OrderStatus::Completed);
        assert_eq!(
            timeline.entered_at(OrderStatus::Confirmed),
            Some(start + Duration::minutes(5))
        );
        assert!(
            timeline
                .entries()
                .windows(2)
                .all(|w| matches!(w, [a, b] if a.timestamp <= b.timestamp))
        );
    }

    #[test]
    fn test_timeline_rejects_invalid_advance() {
        let mut timeline = Timeline::started(Utc::now(), None);
        let err = timeline
            .advance(OrderStatus::Completed, Utc::now(), None, None)
            .unwrap_err();
        assert!(matches!(err, TransitionError::Skipped { .. }));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_advance_returns_appended_entry() {
        let mut timeline = Timeline::started(Utc::now(), None);
        let at = Utc::now();
        let entry = timeline
            .advance(
                OrderStatus::Confirmed,
                at,
                Some(UserId::new(9)),
                Some("slot confirmed".to_string()),
            )
            .unwrap();

        assert_eq!(entry.status, OrderStatus::Confirmed);
        assert_eq!(entry.timestamp, at);
        assert_eq!(entry.actor, Some(UserId::new(9)));
        assert_eq!(timeline.entries().last(), Some(&entry));
    }

    #[test]
    fn test_timeline_json_shape() {
        let mut timeline = Timeline::started(Utc::now(), None);
        timeline.record(
            OrderStatus::Cancelled,
            Utc::now(),
            Some(UserId::new(4)),
            Some("customer unavailable".to_string()),
        );
        let json = serde_json::to_value(&timeline).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].get("note").is_none());
        assert_eq!(entries[1]["status"], "cancelled");
        assert_eq!(entries[1]["actor"], 4);
        assert_eq!(entries[1]["note"], "customer unavailable");
    }
}
