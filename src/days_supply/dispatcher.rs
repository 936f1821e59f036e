use std::time::{Duration, Instant};

use super::strategies::{
    self, CalculationEnv, DaysSupplyStrategy, DefaultStrategy, LiquidStrategy, TabletStrategy,
    TitrationStrategy,
};
use super::types::{DaysSupplyContext, DaysSupplyResult};
use super::DaysSupplyCalculationError;
use crate::config::EngineConfig;
use crate::temporal::TemporalParser;

/// Ordered strategy registry. Built once, read by every calculation.
pub struct DaysSupplyDispatcher {
    strategies: Vec<Box<dyn DaysSupplyStrategy>>,
    parser: TemporalParser,
    config: EngineConfig,
}

impl Default for DaysSupplyDispatcher {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for DaysSupplyDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaysSupplyDispatcher")
            .field("strategies", &self.strategy_names())
            .field("config", &self.config)
            .finish()
    }
}

impl DaysSupplyDispatcher {
    /// Registry with Titration, Tablet, Liquid and Default, in that order.
    pub fn new(config: EngineConfig) -> Self {
        let mut dispatcher = Self::empty(config);
        dispatcher.register(Box::new(TitrationStrategy));
        dispatcher.register(Box::new(TabletStrategy));
        dispatcher.register(Box::new(LiquidStrategy));
        dispatcher.register(Box::new(DefaultStrategy));
        dispatcher
    }

    /// Registry with no strategies; every calculation fails until one is registered.
    pub fn empty(config: EngineConfig) -> Self {
        strategies::default::compile_patterns();
        Self {
            strategies: Vec::new(),
            parser: TemporalParser::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register(&mut self, strategy: Box<dyn DaysSupplyStrategy>) {
        tracing::debug!(strategy = strategy.name(), "Registering days-supply strategy");
        self.strategies.push(strategy);
    }

    /// Remove every strategy with this name. Returns whether any was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.strategies.len();
        self.strategies.retain(|s| s.name() != name);
        self.strategies.len() != before
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Most specific matching strategy; registration order breaks ties.
    pub fn select_strategy(&self, context: &DaysSupplyContext) -> Option<&dyn DaysSupplyStrategy> {
        let mut matching: Vec<&dyn DaysSupplyStrategy> = self
            .strategies
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| s.matches(context))
            .collect();
        // Stable sort keeps registration order within one rank
        matching.sort_by(|a, b| b.specificity().cmp(&a.specificity()));
        matching.into_iter().next()
    }

    pub fn calculate_days_supply(
        &self,
        context: &DaysSupplyContext,
    ) -> Result<DaysSupplyResult, DaysSupplyCalculationError> {
        let started = Instant::now();
        validate_context(context)?;

        let strategy = self.select_strategy(context).ok_or_else(|| {
            DaysSupplyCalculationError::NoMatchingStrategy {
                context: Box::new(context.clone()),
            }
        })?;
        tracing::debug!(strategy = strategy.name(), "Selected days-supply strategy");

        let env = CalculationEnv {
            parser: &self.parser,
            config: &self.config,
        };
        let mut result = strategy.calculate(context, &env)?;

        let elapsed = started.elapsed();
        let budget = Duration::from_millis(self.config.performance_budget_ms);
        if elapsed > budget {
            tracing::warn!(
                strategy = strategy.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.config.performance_budget_ms,
                "Days-supply calculation exceeded its performance budget"
            );
            result.warnings.push(format!(
                "Calculation took {} ms, above the {} ms budget",
                elapsed.as_millis(),
                self.config.performance_budget_ms
            ));
        }

        tracing::debug!(
            strategy = %result.strategy,
            days_supply = result.days_supply,
            confidence = result.confidence,
            warning_count = result.warnings.len(),
            "Days supply calculated"
        );
        Ok(result)
    }
}

/// Structural checks that must fail loudly rather than degrade to zero.
fn validate_context(context: &DaysSupplyContext) -> Result<(), DaysSupplyCalculationError> {
    let boxed = || Box::new(context.clone());

    let quantities = [
        ("package quantity", Some(context.package_quantity())),
        ("dose amount", Some(context.dose_amount())),
        ("pack size", context.pack_size()),
    ];
    for (field, value) in quantities {
        let Some(value) = value else { continue };
        if !value.is_finite() || value <= 0.0 {
            return Err(DaysSupplyCalculationError::InvalidQuantity {
                field,
                value,
                context: boxed(),
            });
        }
    }

    for (field, unit) in [
        ("package quantity", context.package_unit()),
        ("dose amount", context.dose_unit()),
    ] {
        if unit.trim().is_empty() {
            return Err(DaysSupplyCalculationError::MissingUnit {
                field,
                context: boxed(),
            });
        }
    }

    if context.timing().map_or(true, |t| t.is_blank()) {
        return Err(DaysSupplyCalculationError::MissingTiming { context: boxed() });
    }
    Ok(())
}
