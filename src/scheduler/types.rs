/*!
 * Scheduler Types
 * Run counters and the end-of-run summary
 */

use crate::clock::SimTime;
use crate::context::TeardownReport;
use crate::signals::ShutdownReason;
use serde::Serialize;

/// Counters maintained by the controller during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_spawned: usize,
    /// Workers that terminated on their own
    pub total_terminated: usize,
    /// Workers that exited on the shutdown notice
    pub forced_terminations: usize,
    /// Workers aborted after the reaping bound, or lost without terminating
    pub aborted: usize,
    pub grants: u64,
    pub deferrals: u64,
    pub releases: u64,
    pub rejections: u64,
    pub peak_live: usize,
}

/// What happened in one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub reason: ShutdownReason,
    pub total_spawned: usize,
    pub total_terminated: usize,
    pub forced_terminations: usize,
    pub aborted: usize,
    pub grants: u64,
    pub deferrals: u64,
    pub releases: u64,
    pub rejections: u64,
    pub peak_live: usize,
    pub final_time: SimTime,
    pub teardown: Option<TeardownReport>,
    /// Fatal error that ended the run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    pub fn new(
        reason: ShutdownReason,
        stats: &RunStats,
        final_time: SimTime,
        teardown: Option<TeardownReport>,
        error: Option<String>,
    ) -> Self {
        Self {
            reason,
            total_spawned: stats.total_spawned,
            total_terminated: stats.total_terminated,
            forced_terminations: stats.forced_terminations,
            aborted: stats.aborted,
            grants: stats.grants,
            deferrals: stats.deferrals,
            releases: stats.releases,
            rejections: stats.rejections,
            peak_live: stats.peak_live,
            final_time,
            teardown,
            error,
        }
    }

    /// Orderly runs exit with status 0
    pub fn is_success(&self) -> bool {
        self.reason.is_orderly()
    }
}
