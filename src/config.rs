//! Graph configuration.

use serde::{Deserialize, Serialize};

use crate::Result;

/// What to do when propagation re-enters a link that is still being pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Cut the cycle silently.
    Ignore,
    /// Cut the cycle and log a warning.
    #[default]
    Warn,
    /// Cut the cycle and fail the mutating call with `Error::CycleDetected`.
    Error,
}

/// Runtime limits and switches for a `Graph`.
///
/// All fields have defaults, so a partial JSON document is valid:
///
/// ```
/// use propgraph::{GraphConfig, CyclePolicy};
///
/// let config = GraphConfig::from_json(r#"{ "cyclePolicy": "error" }"#).unwrap();
/// assert_eq!(config.cycle_policy, CyclePolicy::Error);
/// assert!(config.record_events);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Upper bound on link pushes performed by a single mutating call.
    pub max_propagation_steps: usize,
    pub cycle_policy: CyclePolicy,
    /// Queue value/options events for `Graph::drain_events`.
    pub record_events: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_propagation_steps: 100_000,
            cycle_policy: CyclePolicy::Warn,
            record_events: true,
        }
    }
}

impl GraphConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
