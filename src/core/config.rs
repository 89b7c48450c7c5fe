/*!
 * Simulation Configuration
 * Validated run parameters with a builder
 */

use super::limits::*;
use crate::clock::SimTime;
use miette::Diagnostic;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid or missing configuration input
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum ConfigError {
    #[error("max concurrent processes must be in 1..={max}, got {value}")]
    #[diagnostic(
        code(config::max_concurrent),
        help("Pass -s with a value between 1 and 17.")
    )]
    MaxConcurrentOutOfRange { value: usize, max: usize },

    #[error("end time must be a positive number of seconds")]
    #[diagnostic(code(config::end_time), help("Pass -t with a positive integer."))]
    NonPositiveEndTime,

    #[error("a log file path is required")]
    #[diagnostic(code(config::log_file), help("Pass -l <filename>."))]
    MissingLogFile,

    #[error("resource kinds must be in 1..={max}, got {value}")]
    #[diagnostic(code(config::resources))]
    ResourceCountOutOfRange { value: usize, max: usize },

    #[error("probability `{name}` must be within [0, 1], got {value}")]
    #[diagnostic(code(config::probability))]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("`{name}` must be non-zero")]
    #[diagnostic(code(config::zero_value))]
    ZeroValue { name: &'static str },

    #[error("invalid command line: {0}")]
    #[diagnostic(code(config::cli), help("Run with -h for usage."))]
    Cli(String),
}

/// Run parameters for one simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimConfig {
    /// Bound on simultaneously live workers
    pub max_concurrent: usize,
    /// Wall-clock cap for the whole run
    pub wall_limit: Duration,
    pub log_file: PathBuf,
    /// Simulated instant at which the controller stops and shuts down
    pub sim_end: SimTime,
    /// Number of resource kinds (R)
    pub resource_count: usize,
    /// Max claims are drawn from [0, max_claim_bound)
    pub max_claim_bound: u32,
    /// Lifetime cap on spawned workers, `None` for unlimited
    pub max_total_spawns: Option<usize>,
    pub work_unit_ns: u64,
    pub spawn_window_ns: u64,
    pub action_probability: f64,
    pub termination_probability: f64,
    /// Bounded wait for worker exit after the shutdown broadcast
    pub reap_timeout: Duration,
    /// Seed for deterministic runs
    pub seed: Option<u64>,
}

impl SimConfig {
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::new()
    }

    /// Random source for the run, deterministic when `seed` is set
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 || self.max_concurrent > MAX_PROCESSES {
            return Err(ConfigError::MaxConcurrentOutOfRange {
                value: self.max_concurrent,
                max: MAX_PROCESSES,
            });
        }
        if self.wall_limit.is_zero() {
            return Err(ConfigError::NonPositiveEndTime);
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(ConfigError::MissingLogFile);
        }
        if self.resource_count == 0 || self.resource_count > MAX_RESOURCE_TYPES {
            return Err(ConfigError::ResourceCountOutOfRange {
                value: self.resource_count,
                max: MAX_RESOURCE_TYPES,
            });
        }
        for (name, value) in [
            ("action_probability", self.action_probability),
            ("termination_probability", self.termination_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if self.max_claim_bound == 0 {
            return Err(ConfigError::ZeroValue {
                name: "max_claim_bound",
            });
        }
        if self.work_unit_ns == 0 {
            return Err(ConfigError::ZeroValue {
                name: "work_unit_ns",
            });
        }
        if self.spawn_window_ns == 0 {
            return Err(ConfigError::ZeroValue {
                name: "spawn_window_ns",
            });
        }
        Ok(())
    }
}

/// Builder for SimConfig
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SimConfig {
                max_concurrent: DEFAULT_MAX_CONCURRENT,
                wall_limit: Duration::from_secs(DEFAULT_END_TIME_SECS),
                log_file: PathBuf::new(),
                sim_end: SimTime::from_secs(DEFAULT_SIM_END_SECS),
                resource_count: MAX_RESOURCE_TYPES,
                max_claim_bound: MAX_CLAIM_BOUND,
                max_total_spawns: Some(DEFAULT_MAX_TOTAL_SPAWNS),
                work_unit_ns: WORK_UNIT_NS,
                spawn_window_ns: SPAWN_WINDOW_NS,
                action_probability: DEFAULT_ACTION_PROBABILITY,
                termination_probability: DEFAULT_TERMINATION_PROBABILITY,
                reap_timeout: REAP_TIMEOUT,
                seed: None,
            },
        }
    }

    pub fn max_concurrent(mut self, value: usize) -> Self {
        self.config.max_concurrent = value;
        self
    }

    pub fn wall_limit(mut self, value: Duration) -> Self {
        self.config.wall_limit = value;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = path.into();
        self
    }

    pub fn sim_end(mut self, value: SimTime) -> Self {
        self.config.sim_end = value;
        self
    }

    pub fn resource_count(mut self, value: usize) -> Self {
        self.config.resource_count = value;
        self
    }

    pub fn max_claim_bound(mut self, value: u32) -> Self {
        self.config.max_claim_bound = value;
        self
    }

    pub fn max_total_spawns(mut self, value: Option<usize>) -> Self {
        self.config.max_total_spawns = value;
        self
    }

    pub fn work_unit_ns(mut self, value: u64) -> Self {
        self.config.work_unit_ns = value;
        self
    }

    pub fn spawn_window_ns(mut self, value: u64) -> Self {
        self.config.spawn_window_ns = value;
        self
    }

    pub fn action_probability(mut self, value: f64) -> Self {
        self.config.action_probability = value;
        self
    }

    pub fn termination_probability(mut self, value: f64) -> Self {
        self.config.termination_probability = value;
        self
    }

    pub fn reap_timeout(mut self, value: Duration) -> Self {
        self.config.reap_timeout = value;
        self
    }

    pub fn seed(mut self, value: Option<u64>) -> Self {
        self.config.seed = value;
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<SimConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SimConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SimConfig::builder().log_file("run.log").build().unwrap();

        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.wall_limit, Duration::from_secs(20));
        assert_eq!(config.sim_end, SimTime::from_secs(2));
        assert_eq!(config.resource_count, 20);
    }

    #[test]
    fn test_missing_log_file() {
        let err = SimConfig::builder().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingLogFile);
    }

    #[test]
    fn test_max_concurrent_bounds() {
        for bad in [0, 18] {
            let err = SimConfig::builder()
                .log_file("run.log")
                .max_concurrent(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, ConfigError::MaxConcurrentOutOfRange { .. }));
        }

        assert!(SimConfig::builder()
            .log_file("run.log")
            .max_concurrent(17)
            .build()
            .is_ok());
    }

    #[test]
    fn test_zero_end_time() {
        let err = SimConfig::builder()
            .log_file("run.log")
            .wall_limit(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveEndTime);
    }

    #[test]
    fn test_bad_probability() {
        let err = SimConfig::builder()
            .log_file("run.log")
            .termination_probability(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidProbability {
                name: "termination_probability",
                ..
            }
        ));
    }

    #[test]
    fn test_resource_count_bounds() {
        let err = SimConfig::builder()
            .log_file("run.log")
            .resource_count(21)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ResourceCountOutOfRange { .. }));
    }
}
