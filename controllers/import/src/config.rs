//! Controller configuration.
//!
//! Read once from environment variables at start-up. Invalid values abort
//! start-up instead of silently falling back to defaults.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_REQUEUE_AFTER_SECS: u64 = 60;
const DEFAULT_RECONCILE_CONCURRENCY: u16 = 10;
const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8080";

/// Runtime configuration for the import controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Namespace to watch for CAPI and Rancher clusters. `None` watches all.
    pub namespace: Option<String>,
    /// Required value of the `cluster.x-k8s.io/watch-filter` label.
    pub watch_filter_value: Option<String>,
    /// Skip TLS verification when downloading import manifests.
    pub insecure_skip_verify: bool,
    /// Manifest download timeout. `None` leaves the request unbounded.
    pub manifest_timeout: Option<Duration>,
    /// Delay used whenever a reconcile has to wait on another component.
    pub requeue_after: Duration,
    /// Maximum number of clusters reconciled in parallel.
    pub concurrency: u16,
    /// Listen address of the probe and metrics server.
    pub probe_addr: SocketAddr,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let requeue_secs = parse_or(
            "REQUEUE_AFTER_SECS",
            non_empty("REQUEUE_AFTER_SECS"),
            DEFAULT_REQUEUE_AFTER_SECS,
        )?;
        let concurrency = parse_or(
            "RECONCILE_CONCURRENCY",
            non_empty("RECONCILE_CONCURRENCY"),
            DEFAULT_RECONCILE_CONCURRENCY,
        )?;
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be greater than zero".to_string(),
            ));
        }

        let manifest_timeout = non_empty("MANIFEST_DOWNLOAD_TIMEOUT_SECS")
            .map(|v| parse::<u64>("MANIFEST_DOWNLOAD_TIMEOUT_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);

        let insecure_skip_verify = non_empty("INSECURE_SKIP_VERIFY")
            .map(|v| {
                parse_bool(v.trim()).ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "INSECURE_SKIP_VERIFY: invalid boolean {:?}",
                        v
                    ))
                })
            })
            .transpose()?
            .unwrap_or(false);

        let probe_addr = parse(
            "PROBE_ADDR",
            &non_empty("PROBE_ADDR").unwrap_or_else(|| DEFAULT_PROBE_ADDR.to_string()),
        )?;

        Ok(Self {
            namespace: non_empty("WATCH_NAMESPACE"),
            watch_filter_value: non_empty("WATCH_FILTER_VALUE"),
            insecure_skip_verify,
            manifest_timeout,
            requeue_after: Duration::from_secs(requeue_secs),
            concurrency,
            probe_addr,
        })
    }
}

/// Parses the boolean spellings accepted by Kubernetes tooling:
/// `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ControllerError::InvalidConfig(format!("{}: {} ({:?})", key, e, value)))
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => parse(key, &v),
        None => Ok(default),
    }
}
