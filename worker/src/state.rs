use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Cumulative successful actions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounters {
    /// Mock randomness fulfillments
    pub fulfillments: u64,
    /// Loop progressions, standard and VRF
    pub loop_progressions: u64,
}

/// State of the poll loop, written by the loop only.
/// Other tasks receive clones through a watch channel.
#[derive(Clone, Debug)]
pub struct WorkerState {
    started_at: Instant,
    last_poll: Option<DateTime<Utc>>,
    counters: ActionCounters,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerState {
    /// Fresh state, uptime starts now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            last_poll: None,
            counters: ActionCounters::default(),
        }
    }

    /// Mark the beginning of a tick
    pub fn record_poll(&mut self, at: DateTime<Utc>) {
        self.last_poll = Some(at);
    }

    /// Count a mock randomness fulfillment
    pub fn record_fulfillment(&mut self) {
        self.counters.fulfillments += 1;
    }

    /// Count a loop progression
    pub fn record_loop_progression(&mut self) {
        self.counters.loop_progressions += 1;
    }

    /// Counters so far
    pub fn counters(&self) -> ActionCounters {
        self.counters
    }

    /// Timestamp of the last tick
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.last_poll
    }

    /// Read-only view served by the health endpoint
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            uptime_seconds: self.started_at.elapsed().as_secs(),
            last_poll_timestamp: self.last_poll,
            action_counters: self.counters,
        }
    }
}

/// Health report
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Always `ok` while the process serves requests
    pub status: &'static str,
    /// Seconds since the worker started
    pub uptime_seconds: u64,
    /// Start of the last tick, `null` before the first one
    pub last_poll_timestamp: Option<DateTime<Utc>>,
    /// Cumulative successes
    pub action_counters: ActionCounters,
}

#[cfg(test)]
mod tests {
    use super::WorkerState;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn snapshot_json_shape() {
        let mut state = WorkerState::new();
        assert_eq!(
            serde_json::to_value(state.snapshot()).unwrap(),
            json!({
                "status": "ok",
                "uptimeSeconds": 0,
                "lastPollTimestamp": null,
                "actionCounters": { "fulfillments": 0, "loopProgressions": 0 }
            })
        );

        tokio::time::advance(Duration::from_secs(42)).await;
        state.record_poll(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
        state.record_fulfillment();
        state.record_loop_progression();
        state.record_loop_progression();

        assert_eq!(
            serde_json::to_value(state.snapshot()).unwrap(),
            json!({
                "status": "ok",
                "uptimeSeconds": 42,
                "lastPollTimestamp": "2024-05-01T12:30:00Z",
                "actionCounters": { "fulfillments": 1, "loopProgressions": 2 }
            })
        );
    }
}
