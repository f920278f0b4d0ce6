use super::{
    expect_bool, expect_i32, expect_string, resolve_common, split_fields, CommonField, FieldError,
    MapSlot, MetricAccess, PathTarget, SiblingSink, TransformContext,
};
use crate::model::{
    AggregationTemporality, AttributeMap, InstrumentationScope, Metric, MetricData, Resource,
    Value, ValueKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    Name,
    Description,
    Unit,
    Type,
    AggregationTemporality,
    IsMonotonic,
    Common(CommonField),
}

/// A metric together with the resource and scope it was reported under.
#[derive(Debug)]
pub struct MetricContext {
    metric: Metric,
    resource: Resource,
    scope: InstrumentationScope,
    sink: SiblingSink<Metric>,
}

impl MetricContext {
    pub fn new(metric: Metric, resource: Resource, scope: InstrumentationScope) -> Self {
        MetricContext {
            metric,
            resource,
            scope,
            sink: SiblingSink::new(),
        }
    }

    /// Emitted metrics go to `sink` instead of a private buffer.
    pub fn with_sink(mut self, sink: SiblingSink<Metric>) -> Self {
        self.sink = sink;
        self
    }

    pub fn sink(&self) -> &SiblingSink<Metric> {
        &self.sink
    }

    pub fn into_parts(self) -> (Metric, Resource, InstrumentationScope) {
        (self.metric, self.resource, self.scope)
    }
}

pub(crate) const METRIC_ENUMS: &[(&str, i64)] = &[
    ("METRIC_DATA_TYPE_NONE", 0),
    ("METRIC_DATA_TYPE_GAUGE", 1),
    ("METRIC_DATA_TYPE_SUM", 2),
    ("METRIC_DATA_TYPE_HISTOGRAM", 3),
    ("METRIC_DATA_TYPE_EXPONENTIAL_HISTOGRAM", 4),
    ("METRIC_DATA_TYPE_SUMMARY", 5),
    ("AGGREGATION_TEMPORALITY_UNSPECIFIED", 0),
    ("AGGREGATION_TEMPORALITY_DELTA", 1),
    ("AGGREGATION_TEMPORALITY_CUMULATIVE", 2),
];

pub(crate) fn lookup_enum(table: &[(&str, i64)], symbol: &str) -> Option<i64> {
    table
        .iter()
        .find(|(name, _)| *name == symbol)
        .map(|(_, value)| *value)
}

/// `metric.*` paths plus the resource and scope paths. A metric has no
/// attribute map of its own.
pub(crate) fn resolve_metric_path(parts: &[&str]) -> Option<PathTarget<MetricField>> {
    let field = match parts {
        ["metric", "name"] => MetricField::Name,
        ["metric", "description"] => MetricField::Description,
        ["metric", "unit"] => MetricField::Unit,
        ["metric", "type"] => MetricField::Type,
        ["metric", "aggregation_temporality"] => MetricField::AggregationTemporality,
        ["metric", "is_monotonic"] => MetricField::IsMonotonic,
        ["attributes"] => return None,
        _ => return resolve_common(parts, MetricField::Common),
    };
    Some(PathTarget::Field(field))
}

pub(crate) fn metric_field_kind(field: MetricField) -> ValueKind {
    match field {
        MetricField::Name | MetricField::Description | MetricField::Unit => ValueKind::Str,
        MetricField::Type | MetricField::AggregationTemporality => ValueKind::Int,
        MetricField::IsMonotonic => ValueKind::Bool,
        MetricField::Common(common) => common.kind(),
    }
}

pub(crate) fn get_metric_field(
    field: MetricField,
    metric: &Metric,
    resource: &Resource,
    scope: &InstrumentationScope,
) -> Value {
    match field {
        MetricField::Name => Value::Str(metric.name.clone()),
        MetricField::Description => Value::Str(metric.description.clone()),
        MetricField::Unit => Value::Str(metric.unit.clone()),
        MetricField::Type => Value::Int(metric.metric_type() as i64),
        MetricField::AggregationTemporality => metric
            .aggregation_temporality()
            .map(|t| Value::Int(t.as_i32().into()))
            .unwrap_or(Value::Absent),
        MetricField::IsMonotonic => metric.is_monotonic().map(Value::Bool).unwrap_or(Value::Absent),
        MetricField::Common(common) => common.get(resource, scope),
    }
}

pub(crate) fn set_metric_field(
    field: MetricField,
    metric: &mut Metric,
    resource: &mut Resource,
    scope: &mut InstrumentationScope,
    value: Value,
) -> Result<(), FieldError> {
    match field {
        MetricField::Name => metric.name = expect_string(value)?,
        MetricField::Description => metric.description = expect_string(value)?,
        MetricField::Unit => metric.unit = expect_string(value)?,
        MetricField::Type => return Err(FieldError::ReadOnly),
        MetricField::AggregationTemporality => {
            let temporality = AggregationTemporality::from_i32(expect_i32(value)?);
            match &mut metric.data {
                MetricData::Sum(s) => s.aggregation_temporality = temporality,
                MetricData::Histogram(h) => h.aggregation_temporality = temporality,
                MetricData::ExponentialHistogram(e) => e.aggregation_temporality = temporality,
                _ => return Err(FieldError::NotPresent),
            }
        }
        MetricField::IsMonotonic => match &mut metric.data {
            MetricData::Sum(s) => s.is_monotonic = expect_bool(value)?,
            _ => return Err(FieldError::NotPresent),
        },
        MetricField::Common(common) => common.set(resource, scope, value)?,
    }
    Ok(())
}

impl TransformContext for MetricContext {
    type Field = MetricField;
    type Sibling = Metric;

    const NAME: &'static str = "metric";

    fn resolve_path(fields: &[String]) -> Option<PathTarget<MetricField>> {
        resolve_metric_path(&split_fields(fields))
    }

    fn parse_enum(symbol: &str) -> Option<i64> {
        lookup_enum(METRIC_ENUMS, symbol)
    }

    fn field_kind(field: MetricField) -> Option<ValueKind> {
        Some(metric_field_kind(field))
    }

    fn get_field(&self, field: MetricField) -> Value {
        get_metric_field(field, &self.metric, &self.resource, &self.scope)
    }

    fn set_field(&mut self, field: MetricField, value: Value) -> Result<(), FieldError> {
        set_metric_field(
            field,
            &mut self.metric,
            &mut self.resource,
            &mut self.scope,
            value,
        )
    }

    fn attributes(&self, slot: MapSlot) -> Option<&AttributeMap> {
        match slot {
            MapSlot::Record => None,
            MapSlot::Resource => Some(&self.resource.attributes),
            MapSlot::Scope => Some(&self.scope.attributes),
        }
    }

    fn attributes_mut(&mut self, slot: MapSlot) -> Option<&mut AttributeMap> {
        match slot {
            MapSlot::Record => None,
            MapSlot::Resource => Some(&mut self.resource.attributes),
            MapSlot::Scope => Some(&mut self.scope.attributes),
        }
    }

    fn emit_sibling(&mut self, record: Metric) {
        self.sink.push(record);
    }

    fn describe(&self) -> String {
        format!("metric `{}`", self.metric.name)
    }
}

impl MetricAccess for MetricContext {
    fn metric(&self) -> &Metric {
        &self.metric
    }

    fn metric_mut(&mut self) -> &mut Metric {
        &mut self.metric
    }
}
