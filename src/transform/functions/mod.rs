//! Built-in function library and the standard per-context registries.

mod converters;
mod editors;
mod metrics;

use once_cell::sync::Lazy;

use super::contexts::{
    DataPointContext, LogContext, MetricAccess, MetricContext, SpanContext, TransformContext,
};
use super::error::RegistryError;
use super::registry::{FunctionFactory, FunctionRegistry};

pub use converters::{double, int};
pub use editors::{delete_key, limit, set, truncate_all};
pub use metrics::{
    convert_gauge_to_sum, convert_sum_to_gauge, convert_summary_count_val_to_sum,
    convert_summary_sum_val_to_sum, parse_temporality,
};

/// Functions available in every context.
pub fn common_functions<C: TransformContext>() -> Vec<FunctionFactory<C>> {
    vec![
        set(),
        delete_key(),
        truncate_all(),
        limit(),
        int(),
        double(),
    ]
}

/// Functions that need a metric behind the context.
pub fn metric_functions<C: MetricAccess>() -> Vec<FunctionFactory<C>> {
    vec![
        convert_summary_count_val_to_sum(),
        convert_summary_sum_val_to_sum(),
        convert_gauge_to_sum(),
        convert_sum_to_gauge(),
    ]
}

type StandardRegistry<C> = Lazy<Result<FunctionRegistry<C>, RegistryError>>;

fn build_registry<C: TransformContext>(
    factories: Vec<FunctionFactory<C>>,
) -> Result<FunctionRegistry<C>, RegistryError> {
    let mut registry = FunctionRegistry::new();
    for factory in factories {
        registry.register(factory)?;
    }
    Ok(registry)
}

fn force<C: TransformContext>(
    registry: &'static StandardRegistry<C>,
) -> Result<&'static FunctionRegistry<C>, RegistryError> {
    Lazy::force(registry).as_ref().map_err(Clone::clone)
}

static METRIC_FUNCTIONS: StandardRegistry<MetricContext> = Lazy::new(|| {
    let mut factories = common_functions();
    factories.extend(metric_functions());
    build_registry(factories)
});

static DATAPOINT_FUNCTIONS: StandardRegistry<DataPointContext> = Lazy::new(|| {
    let mut factories = common_functions();
    factories.extend(metric_functions());
    build_registry(factories)
});

static LOG_FUNCTIONS: StandardRegistry<LogContext> =
    Lazy::new(|| build_registry(common_functions()));

static SPAN_FUNCTIONS: StandardRegistry<SpanContext> =
    Lazy::new(|| build_registry(common_functions()));

/// Contexts that ship with a standard registry.
pub trait StandardFunctions: TransformContext + Sized {
    fn standard_registry() -> Result<&'static FunctionRegistry<Self>, RegistryError>;
}

impl StandardFunctions for MetricContext {
    fn standard_registry() -> Result<&'static FunctionRegistry<Self>, RegistryError> {
        force(&METRIC_FUNCTIONS)
    }
}

impl StandardFunctions for DataPointContext {
    fn standard_registry() -> Result<&'static FunctionRegistry<Self>, RegistryError> {
        force(&DATAPOINT_FUNCTIONS)
    }
}

impl StandardFunctions for LogContext {
    fn standard_registry() -> Result<&'static FunctionRegistry<Self>, RegistryError> {
        force(&LOG_FUNCTIONS)
    }
}

impl StandardFunctions for SpanContext {
    fn standard_registry() -> Result<&'static FunctionRegistry<Self>, RegistryError> {
        force(&SPAN_FUNCTIONS)
    }
}

/// Force initialization of every standard registry.
/// Call during startup to keep the first statement compile cheap; a broken
/// built-in function surfaces here instead of on first use.
pub fn init_registries() -> Result<(), RegistryError> {
    force(&METRIC_FUNCTIONS)?;
    force(&DATAPOINT_FUNCTIONS)?;
    force(&LOG_FUNCTIONS)?;
    force(&SPAN_FUNCTIONS)?;
    Ok(())
}
