//! Per-client usage limits: a fixed daily and monthly request budget.
//!
//! Counters are process-local and keyed by client IP. Windows roll over by
//! calendar day and calendar month (UTC). Budget is reserved up front under
//! one lock acquisition and refunded if the request fails, so concurrent
//! in-flight requests cannot overshoot the budget. Counters are the only
//! shared mutable state in the service and live entirely outside the
//! retrieval core.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Request budgets per client.
#[derive(Debug, Clone, Copy)]
pub struct UsageLimits {
    pub daily: u32,
    pub monthly: u32,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self { daily: 25, monthly: 750 }
    }
}

/// A client's counters and limits, as reported by `GET /usage`.
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub daily_used: u32,
    pub daily_remaining: u32,
    pub monthly_used: u32,
    pub monthly_remaining: u32,
    pub daily_limit: u32,
    pub monthly_limit: u32,
}

#[derive(Debug, Clone)]
struct ClientUsage {
    day: NaiveDate,
    day_count: u32,
    month: (i32, u32),
    month_count: u32,
}

impl ClientUsage {
    fn fresh(today: NaiveDate) -> Self {
        Self { day: today, day_count: 0, month: (today.year(), today.month()), month_count: 0 }
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if self.day != today {
            self.day = today;
            self.day_count = 0;
        }
        let month = (today.year(), today.month());
        if self.month != month {
            self.month = month;
            self.month_count = 0;
        }
    }
}

/// Tracks per-client request counts against [`UsageLimits`].
#[derive(Debug, Default)]
pub struct UsageLimiter {
    limits: UsageLimits,
    clients: RwLock<HashMap<String, ClientUsage>>,
}

impl UsageLimiter {
    pub fn new(limits: UsageLimits) -> Self {
        Self { limits, clients: RwLock::new(HashMap::new()) }
    }

    /// Reserve one request for `client`, counting it immediately.
    ///
    /// Returns a human-readable denial reason when over budget. Check and
    /// count happen under one lock acquisition, so concurrent in-flight
    /// requests cannot all pass a separate check first. Call
    /// [`refund`](Self::refund) if the request then fails, so a failed
    /// upstream call does not consume budget.
    pub async fn reserve(&self, client: &str) -> Result<(), String> {
        self.reserve_at(client, Utc::now().date_naive()).await
    }

    /// Return a reservation for a request that failed.
    pub async fn refund(&self, client: &str) {
        self.refund_at(client, Utc::now().date_naive()).await;
    }

    /// Current counters for `client`.
    pub async fn stats(&self, client: &str) -> UsageStats {
        self.stats_at(client, Utc::now().date_naive()).await
    }

    async fn reserve_at(&self, client: &str, today: NaiveDate) -> Result<(), String> {
        let mut clients = self.clients.write().await;
        let usage = clients.entry(client.to_string()).or_insert_with(|| ClientUsage::fresh(today));
        usage.roll_over(today);

        if usage.day_count >= self.limits.daily {
            return Err(format!("Daily limit of {} messages reached", self.limits.daily));
        }
        if usage.month_count >= self.limits.monthly {
            return Err(format!("Monthly limit of {} messages reached", self.limits.monthly));
        }
        usage.day_count += 1;
        usage.month_count += 1;
        Ok(())
    }

    async fn refund_at(&self, client: &str, today: NaiveDate) {
        let mut clients = self.clients.write().await;
        let usage = clients.entry(client.to_string()).or_insert_with(|| ClientUsage::fresh(today));
        usage.roll_over(today);
        usage.day_count = usage.day_count.saturating_sub(1);
        usage.month_count = usage.month_count.saturating_sub(1);
    }

    async fn stats_at(&self, client: &str, today: NaiveDate) -> UsageStats {
        let mut clients = self.clients.write().await;
        let usage = clients.entry(client.to_string()).or_insert_with(|| ClientUsage::fresh(today));
        usage.roll_over(today);

        UsageStats {
            daily_used: usage.day_count,
            daily_remaining: self.limits.daily.saturating_sub(usage.day_count),
            monthly_used: usage.month_count,
            monthly_remaining: self.limits.monthly.saturating_sub(usage.month_count),
            daily_limit: self.limits.daily,
            monthly_limit: self.limits.monthly,
        }
    }
}
