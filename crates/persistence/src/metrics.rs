//! Query timing and logging instrumentation.
//!
//! Every repository call wraps its statement in a [`QueryTimer`] — the
//! explicit decorator around the persistence gateway's execute path. One
//! timer records the query's duration to a metrics histogram and emits a
//! debug-level trace line with the query name.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Times one named query, recording duration to metrics and tracing.
///
/// Usage:
/// ```ignore
/// let timer = QueryTimer::new("find_registration_by_id");
/// let result = sqlx::query_as::<_, RegistrationEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    /// Starts a timer for the given query name.
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Records the elapsed duration to metrics and logs it.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        tracing::debug!(
            query = self.query_name,
            duration_ms = duration * 1000.0,
            "query executed"
        );
        histogram!(
            "database_query_duration_seconds",
            "query" => self.query_name
        )
        .record(duration);
    }
}

/// Records connection pool health gauges. Called periodically by the API.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_records_without_panicking() {
        let timer = QueryTimer::new("test_query");
        timer.record();
    }
}
