//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::notify::broadcaster::DEFAULT_SUBSCRIBER_BUFFER;
use crate::queue::QueueBackend;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP / WebSocket listen port.
    pub port: u16,
    /// Which queue implementation to construct.
    pub queue_backend: QueueBackend,
    /// Upper bound on concurrently running workers (None = unbounded).
    pub max_concurrent_workers: Option<usize>,
    /// Per-task deadline (None = tasks may run forever).
    pub task_timeout: Option<Duration>,
    /// Simulated work duration for the default executor.
    pub work_delay: Duration,
    /// Broadcast channel capacity; slower subscribers skip ahead.
    pub subscriber_buffer: usize,
    /// Directory for rolling log files (None = stderr only).
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            queue_backend: QueueBackend::Memory,
            max_concurrent_workers: None,
            task_timeout: None,
            work_delay: Duration::from_millis(2000),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            log_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Build from `TASK_RELAY_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_var(&get, "TASK_RELAY_PORT")?.unwrap_or(defaults.port);

        let queue_backend = match get("TASK_RELAY_QUEUE_BACKEND") {
            Some(s) => s.parse()?,
            None => defaults.queue_backend,
        };

        let max_concurrent_workers = parse_var::<usize>(&get, "TASK_RELAY_MAX_WORKERS")?
            .filter(|n| *n > 0);

        let task_timeout = parse_var::<u64>(&get, "TASK_RELAY_TASK_TIMEOUT_SECS")?
            .filter(|n| *n > 0)
            .map(Duration::from_secs);

        let work_delay = parse_var::<u64>(&get, "TASK_RELAY_WORK_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.work_delay);

        let subscriber_buffer = parse_var(&get, "TASK_RELAY_SUBSCRIBER_BUFFER")?
            .unwrap_or(defaults.subscriber_buffer);

        let log_dir = get("TASK_RELAY_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            port,
            queue_backend,
            max_concurrent_workers,
            task_timeout,
            work_delay,
            subscriber_buffer,
            log_dir,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.queue_backend, QueueBackend::Memory);
        assert!(config.max_concurrent_workers.is_none());
        assert!(config.task_timeout.is_none());
        assert_eq!(config.work_delay, Duration::from_millis(2000));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("TASK_RELAY_PORT", "9000"),
            ("TASK_RELAY_MAX_WORKERS", "4"),
            ("TASK_RELAY_TASK_TIMEOUT_SECS", "30"),
            ("TASK_RELAY_WORK_DELAY_MS", "10"),
            ("TASK_RELAY_LOG_DIR", "/tmp/logs"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_concurrent_workers, Some(4));
        assert_eq!(config.task_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.work_delay, Duration::from_millis(10));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn zero_limits_mean_unbounded() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("TASK_RELAY_MAX_WORKERS", "0"),
            ("TASK_RELAY_TASK_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert!(config.max_concurrent_workers.is_none());
        assert!(config.task_timeout.is_none());
    }

    #[test]
    fn rejects_garbage() {
        let err = ServiceConfig::from_lookup(lookup(&[("TASK_RELAY_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("TASK_RELAY_PORT"));

        let err =
            ServiceConfig::from_lookup(lookup(&[("TASK_RELAY_QUEUE_BACKEND", "redis")])).unwrap_err();
        assert!(err.to_string().contains("redis"));
    }
}
