//! Metric conversions, available in the metric and datapoint contexts.
//!
//! The summary conversions derive a new Sum metric and emit it as a sibling
//! of the summary; the source metric is left untouched. The gauge/sum
//! conversions rewrite the metric in place. Every conversion is a no-op on
//! metric kinds it does not apply to.

use crate::model::{
    AggregationTemporality, Gauge, Metric, MetricData, NumberDataPoint, NumberValue, Sum,
    SummaryDataPoint, Value,
};
use crate::transform::arguments::{ArgKind, BoundArguments, Parameter};
use crate::transform::contexts::MetricAccess;
use crate::transform::error::BuildError;
use crate::transform::registry::{expr_func, ExprFunc, FunctionFactory};

const TO_SUM_PARAMS: &[Parameter] = &[
    Parameter::required("aggregation_temporality", ArgKind::String),
    Parameter::required("monotonic", ArgKind::Bool),
];

const NO_PARAMS: &[Parameter] = &[];

/// Maps the configuration spelling of a temporality. Only `delta` and
/// `cumulative` are accepted.
pub fn parse_temporality(text: &str) -> Result<AggregationTemporality, BuildError> {
    match text {
        "delta" => Ok(AggregationTemporality::Delta),
        "cumulative" => Ok(AggregationTemporality::Cumulative),
        other => Err(BuildError::UnknownTemporality(other.to_string())),
    }
}

fn sum_arguments<C: MetricAccess>(
    args: &BoundArguments<C>,
) -> Result<(AggregationTemporality, bool), BuildError> {
    let temporality = parse_temporality(&args.string("aggregation_temporality")?)?;
    let monotonic = args.bool("monotonic")?;
    Ok((temporality, monotonic))
}

// --- convert_summary_count_val_to_sum / convert_summary_sum_val_to_sum ---
pub fn convert_summary_count_val_to_sum<C: MetricAccess>() -> FunctionFactory<C> {
    FunctionFactory::new(
        "convert_summary_count_val_to_sum",
        TO_SUM_PARAMS,
        |args: BoundArguments<C>| {
            let (temporality, monotonic) = sum_arguments(&args)?;
            Ok(summary_to_sum(SummaryPart::Count, temporality, monotonic))
        },
    )
}

pub fn convert_summary_sum_val_to_sum<C: MetricAccess>() -> FunctionFactory<C> {
    FunctionFactory::new(
        "convert_summary_sum_val_to_sum",
        TO_SUM_PARAMS,
        |args: BoundArguments<C>| {
            let (temporality, monotonic) = sum_arguments(&args)?;
            Ok(summary_to_sum(SummaryPart::Sum, temporality, monotonic))
        },
    )
}

#[derive(Debug, Clone, Copy)]
enum SummaryPart {
    Count,
    Sum,
}

impl SummaryPart {
    fn suffix(self) -> &'static str {
        match self {
            SummaryPart::Count => "_count",
            SummaryPart::Sum => "_sum",
        }
    }

    fn value(self, point: &SummaryDataPoint) -> NumberValue {
        match self {
            SummaryPart::Count => NumberValue::Int(point.count as i64),
            SummaryPart::Sum => NumberValue::Double(point.sum),
        }
    }
}

fn summary_to_sum<C: MetricAccess>(
    part: SummaryPart,
    temporality: AggregationTemporality,
    monotonic: bool,
) -> ExprFunc<C> {
    expr_func(move |ctx: &mut C| {
        if let Some(derived) = derive_sum(ctx.metric(), part, temporality, monotonic) {
            ctx.emit_sibling(derived);
        }
        Ok(Value::Absent)
    })
}

fn derive_sum(
    metric: &Metric,
    part: SummaryPart,
    temporality: AggregationTemporality,
    monotonic: bool,
) -> Option<Metric> {
    let MetricData::Summary(summary) = &metric.data else {
        return None;
    };
    let data_points = summary
        .data_points
        .iter()
        .map(|point| NumberDataPoint {
            attributes: point.attributes.clone(),
            start_time_unix_nano: point.start_time_unix_nano,
            time_unix_nano: point.time_unix_nano,
            value: part.value(point),
            ..Default::default()
        })
        .collect();
    Some(Metric {
        name: format!("{}{}", metric.name, part.suffix()),
        description: metric.description.clone(),
        unit: metric.unit.clone(),
        data: MetricData::Sum(Sum {
            data_points,
            aggregation_temporality: temporality,
            is_monotonic: monotonic,
        }),
    })
}

// --- convert_gauge_to_sum ---
pub fn convert_gauge_to_sum<C: MetricAccess>() -> FunctionFactory<C> {
    FunctionFactory::new(
        "convert_gauge_to_sum",
        TO_SUM_PARAMS,
        |args: BoundArguments<C>| {
            let (temporality, monotonic) = sum_arguments(&args)?;
            Ok(expr_func(move |ctx: &mut C| {
                let metric = ctx.metric_mut();
                if let MetricData::Gauge(gauge) = &mut metric.data {
                    let data_points = std::mem::take(&mut gauge.data_points);
                    metric.data = MetricData::Sum(Sum {
                        data_points,
                        aggregation_temporality: temporality,
                        is_monotonic: monotonic,
                    });
                }
                Ok(Value::Absent)
            }))
        },
    )
}

// --- convert_sum_to_gauge ---
pub fn convert_sum_to_gauge<C: MetricAccess>() -> FunctionFactory<C> {
    FunctionFactory::new("convert_sum_to_gauge", NO_PARAMS, |_: BoundArguments<C>| {
        Ok(expr_func(|ctx: &mut C| {
            let metric = ctx.metric_mut();
            if let MetricData::Sum(sum) = &mut metric.data {
                let data_points = std::mem::take(&mut sum.data_points);
                metric.data = MetricData::Gauge(Gauge { data_points });
            }
            Ok(Value::Absent)
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resource, Summary, Value as ModelValue};
    use crate::transform::contexts::{DataPointContext, MetricContext};
    use crate::transform::error::CompileError;
    use crate::transform::parser::parse_statement;
    use crate::transform::registry::FunctionRegistry;

    fn registry<C: MetricAccess>() -> FunctionRegistry<C> {
        let mut registry = FunctionRegistry::new();
        for factory in [
            convert_summary_count_val_to_sum(),
            convert_summary_sum_val_to_sum(),
            convert_gauge_to_sum(),
            convert_sum_to_gauge(),
        ] {
            registry.register(factory).unwrap();
        }
        registry
    }

    fn latency() -> Metric {
        Metric {
            name: "latency".into(),
            description: "request latency".into(),
            unit: "ms".into(),
            data: MetricData::Summary(Summary {
                data_points: vec![SummaryDataPoint {
                    attributes: [("a", ModelValue::from("b"))].into_iter().collect(),
                    start_time_unix_nano: 100,
                    time_unix_nano: 200,
                    count: 42,
                    sum: 12.5,
                    ..Default::default()
                }],
            }),
        }
    }

    #[test]
    fn temporality_mapping_has_three_outcomes() {
        assert_eq!(parse_temporality("delta").unwrap(), AggregationTemporality::Delta);
        assert_eq!(
            parse_temporality("cumulative").unwrap(),
            AggregationTemporality::Cumulative
        );
        for bad in ["Delta", "", "gauge"] {
            assert!(matches!(
                parse_temporality(bad),
                Err(BuildError::UnknownTemporality(ref t)) if t == bad
            ));
        }
    }

    #[test]
    fn unknown_temporality_fails_build() {
        let err = registry::<MetricContext>()
            .compile_invocation(
                &parse_statement(r#"convert_summary_count_val_to_sum("sideways", true)"#).unwrap(),
            )
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CompileError::Build {
                source: BuildError::UnknownTemporality(_),
                ..
            }
        ));
    }

    #[test]
    fn summary_count_emits_sum_metric() {
        let func = registry::<MetricContext>()
            .compile_invocation(
                &parse_statement(r#"convert_summary_count_val_to_sum("delta", true)"#).unwrap(),
            )
            .unwrap();
        let mut ctx = MetricContext::new(latency(), Resource::default(), Default::default());
        func(&mut ctx).unwrap();

        let emitted = ctx.sink().drain();
        assert_eq!(emitted.len(), 1);
        let derived = &emitted[0];
        assert_eq!(derived.name, "latency_count");
        assert_eq!(derived.description, "request latency");
        assert_eq!(derived.unit, "ms");
        let MetricData::Sum(sum) = &derived.data else {
            panic!("expected sum, got {:?}", derived.data);
        };
        assert!(sum.is_monotonic);
        assert_eq!(sum.aggregation_temporality, AggregationTemporality::Delta);
        assert_eq!(sum.data_points.len(), 1);
        let point = &sum.data_points[0];
        assert_eq!(point.value, NumberValue::Int(42));
        assert_eq!(point.time_unix_nano, 200);
        assert_eq!(point.start_time_unix_nano, 100);
        assert_eq!(point.attributes.get("a"), Some(&ModelValue::from("b")));

        let (source, _, _) = ctx.into_parts();
        assert_eq!(source, latency());
    }

    #[test]
    fn summary_sum_uses_double_value() {
        let func = registry::<DataPointContext>()
            .compile_invocation(
                &parse_statement(r#"convert_summary_sum_val_to_sum("cumulative", false)"#)
                    .unwrap(),
            )
            .unwrap();
        let mut ctx = DataPointContext::new(latency(), Resource::default(), Default::default());
        func(&mut ctx).unwrap();
        let emitted = ctx.sink().drain();
        assert_eq!(emitted[0].name, "latency_sum");
        let MetricData::Sum(sum) = &emitted[0].data else {
            panic!("expected sum");
        };
        assert_eq!(sum.data_points[0].value, NumberValue::Double(12.5));
        assert!(!sum.is_monotonic);
    }

    #[test]
    fn non_summary_is_noop() {
        let func = registry::<MetricContext>()
            .compile_invocation(
                &parse_statement(r#"convert_summary_count_val_to_sum("delta", true)"#).unwrap(),
            )
            .unwrap();
        let gauge = Metric {
            name: "g".into(),
            data: MetricData::Gauge(Gauge::default()),
            ..Default::default()
        };
        let mut ctx = MetricContext::new(gauge.clone(), Resource::default(), Default::default());
        assert_eq!(func(&mut ctx).unwrap(), ModelValue::Absent);
        assert!(ctx.sink().is_empty());
        assert_eq!(ctx.into_parts().0, gauge);
    }

    #[test]
    fn gauge_and_sum_swap_in_place() {
        let registry = registry::<MetricContext>();
        let to_sum = registry
            .compile_invocation(
                &parse_statement(r#"convert_gauge_to_sum("cumulative", true)"#).unwrap(),
            )
            .unwrap();
        let to_gauge = registry
            .compile_invocation(&parse_statement("convert_sum_to_gauge()").unwrap())
            .unwrap();
        let gauge = Metric {
            name: "g".into(),
            data: MetricData::Gauge(Gauge {
                data_points: vec![NumberDataPoint {
                    value: NumberValue::Double(1.5),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        };
        let mut ctx = MetricContext::new(gauge.clone(), Resource::default(), Default::default());
        to_sum(&mut ctx).unwrap();
        let MetricData::Sum(sum) = &ctx.metric().data else {
            panic!("expected sum");
        };
        assert_eq!(sum.aggregation_temporality, AggregationTemporality::Cumulative);
        assert!(sum.is_monotonic);
        assert_eq!(sum.data_points.len(), 1);

        to_gauge(&mut ctx).unwrap();
        assert_eq!(ctx.into_parts().0, gauge);
    }
}
