use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Engine-level constants
pub const ENGINE_NAME: &str = "coheara-dosing";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `RUST_LOG`-style filter when the environment provides none.
pub fn default_log_filter() -> &'static str {
    "coheara_dosing=info"
}

/// Install a fmt subscriber for the engine.
///
/// Hosts that already own a global subscriber keep theirs: `try_init` fails
/// silently in that case.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .try_init();
}

// ═══════════════════════════════════════════════════════════
// Engine configuration
// ═══════════════════════════════════════════════════════════

/// Tunables shared by the dispatcher, strategies and signature builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Soft budget for one days-supply calculation. Overruns become warnings.
    pub performance_budget_ms: u64,
    /// Days per month for period conversion (calendar months not modelled).
    pub month_days: f64,
    /// Smallest tablet fraction that can be dispensed.
    pub min_tablet_fraction: f64,
    /// Smallest liquid volume (mL) that can be measured reliably.
    pub min_liquid_volume_ml: f64,
    /// Default cap on sprays per administration for nasal devices.
    pub max_sprays_per_dose: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            performance_budget_ms: 5,
            month_days: 30.0,
            min_tablet_fraction: 0.25,
            min_liquid_volume_ml: 0.1,
            max_sprays_per_dose: 4,
        }
    }
}

impl EngineConfig {
    /// Parse overrides from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_name_is_crate_name() {
        assert_eq!(ENGINE_NAME, "coheara-dosing");
    }

    #[test]
    fn engine_version_matches_cargo() {
        assert_eq!(ENGINE_VERSION, "0.6.0");
    }

    #[test]
    fn default_filter_targets_crate() {
        assert!(default_log_filter().starts_with("coheara_dosing"));
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"month_days": 30.4375}"#).unwrap();
        assert!((config.month_days - 30.4375).abs() < f64::EPSILON);
        assert_eq!(config.performance_budget_ms, 5);
        assert_eq!(config.max_sprays_per_dose, 4);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{month_days: ").is_err());
    }

    #[test]
    fn config_serializes() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        assert!(json.contains("\"performance_budget_ms\":5"));
    }
}
