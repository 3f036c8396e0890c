//! Cost model, batch planning and spend tracking for quota-limited APIs.

use std::{collections::VecDeque, ops::Range, time::Duration};

use thiserror::Error;
use tokio::time::Instant;

/// Window of the per-minute ceiling.
pub const MINUTE: Duration = Duration::from_secs(60);
/// Window of the per-hour ceiling.
pub const HOUR: Duration = Duration::from_secs(3600);

/// Which ceiling a planned run would break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaBreach {
    #[error("total cost {total} exceeds the hourly ceiling of {ceiling}")]
    Hourly { total: u64, ceiling: u64 },

    #[error("request #{index} costs {cost}, more than the per-minute ceiling of {ceiling}")]
    PerMinute { index: usize, cost: u64, ceiling: u64 },
}

/// Upstream ceilings and the pause used to stay under them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// Max summed cost of the requests sent within one minute window.
    pub per_minute: u64,
    /// Max summed cost of the requests sent within one hour window, across runs.
    pub per_hour: u64,
    /// Pause between consecutive batches.
    pub batch_wait: Duration,
}

/// Requests grouped into consecutive batches, by index into the submitted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub batches: Vec<Range<usize>>,
    pub total_cost: u64,
}

impl QuotaPolicy {
    /// Checks the whole run against both ceilings, then batches greedily.
    ///
    /// A request joins the current batch while the batch's cumulative cost stays
    /// `<= per_minute`; the request that would push it over starts the next one.
    pub fn plan(&self, costs: &[u64]) -> Result<BatchPlan, QuotaBreach> {
        let total_cost: u64 = costs.iter().sum();
        if total_cost > self.per_hour {
            return Err(QuotaBreach::Hourly {
                total: total_cost,
                ceiling: self.per_hour,
            });
        }
        if let Some((index, &cost)) = costs.iter().enumerate().find(|(_, c)| **c > self.per_minute) {
            return Err(QuotaBreach::PerMinute {
                index,
                cost,
                ceiling: self.per_minute,
            });
        }

        let mut batches = Vec::new();
        let mut start = 0;
        let mut batch_cost = 0;
        for (i, &cost) in costs.iter().enumerate() {
            if i > start && batch_cost + cost > self.per_minute {
                batches.push(start..i);
                start = i;
                batch_cost = 0;
            }
            batch_cost += cost;
        }
        if start < costs.len() {
            batches.push(start..costs.len());
        }

        Ok(BatchPlan { batches, total_cost })
    }
}

/// Cost actually sent upstream, timestamped, so that consecutive runs sharing
/// one scheduler are held to the same ceilings as a single run.
#[derive(Debug, Default)]
pub struct SpendLedger {
    entries: VecDeque<(Instant, u64)>,
}

impl SpendLedger {
    pub fn charge(&mut self, at: Instant, cost: u64) {
        self.entries.push_back((at, cost));
    }

    /// Forgets spending that no window can see any more.
    pub fn prune(&mut self, now: Instant) {
        while self
            .entries
            .front()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) >= HOUR)
        {
            self.entries.pop_front();
        }
    }

    /// Cost charged less than `window` before `now`.
    pub fn spent_within(&self, now: Instant, window: Duration) -> u64 {
        self.entries
            .iter()
            .filter(|(at, _)| now.saturating_duration_since(*at) < window)
            .map(|(_, cost)| cost)
            .sum()
    }

    /// First instant, not before `now`, at which at most `budget` is spent
    /// within `window`.
    pub fn free_at(&self, now: Instant, window: Duration, budget: u64) -> Instant {
        let mut spent = self.spent_within(now, window);
        if spent <= budget {
            return now;
        }
        for (at, cost) in self
            .entries
            .iter()
            .filter(|(at, _)| now.saturating_duration_since(*at) < window)
        {
            spent -= cost;
            if spent <= budget {
                return *at + window;
            }
        }
        now + window
    }
}

/// Cost of one call fetching `days` days of `variables` variables, where the
/// upstream bills one unit per `row_divisor` values. Rounded up, never zero.
pub fn call_cost(days: u64, variables: u64, row_divisor: u64) -> u64 {
    (days * variables).div_ceil(row_divisor.max(1)).max(1)
}
