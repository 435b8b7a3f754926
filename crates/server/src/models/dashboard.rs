//! Admin dashboard aggregates.

use serde::Serialize;

use tuntas_kilat_core::{OrderStatus, Price, WorkerAvailability};

/// Number of orders currently in one status.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Number of workers in one availability state.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct AvailabilityCount {
    pub availability: WorkerAvailability,
    pub count: i64,
}

/// Snapshot shown on the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub orders_by_status: Vec<StatusCount>,
    pub workers_by_availability: Vec<AvailabilityCount>,
    pub total_orders: i64,
    pub paid_revenue: Price,
    pub average_rating: Option<f64>,
}

impl DashboardStats {
    /// Orders not yet completed or cancelled.
    #[must_use]
    pub fn open_orders(&self) -> i64 {
        self.orders_by_status
            .iter()
            .filter(|c| !c.status.is_terminal())
            .map(|c| c.count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_orders_excludes_terminal() {
        let stats = DashboardStats {
            orders_by_status: vec![
                StatusCount {
                    status: OrderStatus::Pending,
                    count: 3,
                },
                StatusCount {
                    status: OrderStatus::OnTheWay,
                    count: 2,
                },
                StatusCount {
                    status: OrderStatus::Completed,
                    count: 40,
                },
                StatusCount {
                    status: OrderStatus::Cancelled,
                    count: 5,
                },
            ],
            workers_by_availability: Vec::new(),
            total_orders: 50,
            paid_revenue: Price::ZERO,
            average_rating: None,
        };
        assert_eq!(stats.open_orders(), 5);
    }
}
