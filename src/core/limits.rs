/*!
 * System Limits and Constants
 *
 * Centralized location for simulation-wide limits and tuning values.
 * Organized by domain.
 */

use std::time::Duration;

// =============================================================================
// TIME
// =============================================================================

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

pub const NANOS_PER_MILLI: u64 = 1_000_000;

// =============================================================================
// PROCESS LIMITS
// =============================================================================

/// Hard upper bound on simultaneously live workers
pub const MAX_PROCESSES: usize = 17;

/// Default bound on simultaneously live workers
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default lifetime cap on spawned workers per run
pub const DEFAULT_MAX_TOTAL_SPAWNS: usize = 100;

// =============================================================================
// RESOURCE LIMITS
// =============================================================================

/// Number of resource kinds the table can describe
pub const MAX_RESOURCE_TYPES: usize = 20;

/// Instances per resource kind are drawn from 1..=MAX_RESOURCE_INSTANCES
pub const MAX_RESOURCE_INSTANCES: u32 = 10;

/// Max claim per resource kind is drawn from [0, MAX_CLAIM_BOUND)
pub const MAX_CLAIM_BOUND: u32 = 3;

// =============================================================================
// SCHEDULING
// =============================================================================

/// New workers arrive uniformly in (0, SPAWN_WINDOW_NS] past the previous spawn
pub const SPAWN_WINDOW_NS: u64 = 500 * NANOS_PER_MILLI;

/// Simulated bookkeeping cost charged to the clock per spawn
pub const SPAWN_OVERHEAD_NS: u64 = 100;

/// Default simulated end of the run
pub const DEFAULT_SIM_END_SECS: u64 = 2;

/// Default wall-clock cap of the run
pub const DEFAULT_END_TIME_SECS: u64 = 20;

/// Real-time tick the controller uses to re-check the spawn timer
pub const CONTROLLER_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// WORKERS
// =============================================================================

/// Simulated time one worker iteration adds to the clock
pub const WORK_UNIT_NS: u64 = NANOS_PER_MILLI;

/// Chance per iteration that a worker issues a request or release
pub const DEFAULT_ACTION_PROBABILITY: f64 = 0.5;

/// Chance per iteration that a worker terminates on its own
pub const DEFAULT_TERMINATION_PROBABILITY: f64 = 0.01;

// =============================================================================
// SHUTDOWN
// =============================================================================

/// Upper bound on waiting for workers to exit after the shutdown broadcast
pub const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between non-blocking exit polls while reaping
pub const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

// =============================================================================
// IPC
// =============================================================================

/// Version byte leading every encoded frame
pub const WIRE_PROTOCOL_VERSION: u8 = 1;
