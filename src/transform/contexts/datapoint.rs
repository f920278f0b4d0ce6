use super::metric::{
    get_metric_field, lookup_enum, metric_field_kind, resolve_metric_path, set_metric_field,
    MetricField, METRIC_ENUMS,
};
use super::{
    expect_double, expect_i32, expect_int, expect_u32, expect_u64, split_fields, u64_value,
    FieldError, MapSlot, MetricAccess, PathTarget, SiblingSink, TransformContext,
};
use crate::model::{
    AttributeMap, DataPointMut, DataPointRef, InstrumentationScope, Metric, NumberValue, Resource,
    Value, ValueKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPointField {
    Metric(MetricField),
    StartTimeUnixNano,
    TimeUnixNano,
    Flags,
    ValueInt,
    ValueDouble,
    Count,
    Sum,
    BucketCounts,
    ExplicitBounds,
    Scale,
    ZeroCount,
}

const DATA_POINT_ENUMS: &[(&str, i64)] = &[("FLAG_NONE", 0), ("FLAG_NO_RECORDED_VALUE", 1)];

/// One data point of a metric. The context owns the whole metric so that
/// functions can read `metric.*` and emit derived metrics; `index` selects
/// the point the record paths refer to.
#[derive(Debug)]
pub struct DataPointContext {
    metric: Metric,
    index: usize,
    resource: Resource,
    scope: InstrumentationScope,
    sink: SiblingSink<Metric>,
}

impl DataPointContext {
    pub fn new(metric: Metric, resource: Resource, scope: InstrumentationScope) -> Self {
        DataPointContext {
            metric,
            index: 0,
            resource,
            scope,
            sink: SiblingSink::new(),
        }
    }

    pub fn with_sink(mut self, sink: SiblingSink<Metric>) -> Self {
        self.sink = sink;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn sink(&self) -> &SiblingSink<Metric> {
        &self.sink
    }

    pub fn into_parts(self) -> (Metric, Resource, InstrumentationScope) {
        (self.metric, self.resource, self.scope)
    }

    fn point(&self) -> Option<DataPointRef<'_>> {
        self.metric.data_point(self.index)
    }

    fn point_mut(&mut self) -> Option<DataPointMut<'_>> {
        self.metric.data_point_mut(self.index)
    }

    fn read_point(&self, field: DataPointField) -> Value {
        let Some(point) = self.point() else {
            return Value::Absent;
        };
        match (field, point) {
            (DataPointField::StartTimeUnixNano, p) => u64_value(p.fields().start_time_unix_nano()),
            (DataPointField::TimeUnixNano, p) => u64_value(p.fields().time_unix_nano()),
            (DataPointField::Flags, p) => Value::Int(p.fields().flags().into()),
            (DataPointField::ValueInt, DataPointRef::Number(p)) => match p.value {
                NumberValue::Int(i) => Value::Int(i),
                _ => Value::Absent,
            },
            (DataPointField::ValueDouble, DataPointRef::Number(p)) => match p.value {
                NumberValue::Double(d) => Value::Double(d),
                _ => Value::Absent,
            },
            (DataPointField::Count, DataPointRef::Histogram(p)) => u64_value(p.count),
            (DataPointField::Count, DataPointRef::ExponentialHistogram(p)) => u64_value(p.count),
            (DataPointField::Count, DataPointRef::Summary(p)) => u64_value(p.count),
            (DataPointField::Sum, DataPointRef::Histogram(p)) => {
                p.sum.map(Value::Double).unwrap_or(Value::Absent)
            }
            (DataPointField::Sum, DataPointRef::ExponentialHistogram(p)) => {
                p.sum.map(Value::Double).unwrap_or(Value::Absent)
            }
            (DataPointField::Sum, DataPointRef::Summary(p)) => Value::Double(p.sum),
            (DataPointField::BucketCounts, DataPointRef::Histogram(p)) => {
                Value::Slice(p.bucket_counts.iter().copied().map(u64_value).collect())
            }
            (DataPointField::ExplicitBounds, DataPointRef::Histogram(p)) => {
                Value::Slice(p.explicit_bounds.iter().copied().map(Value::Double).collect())
            }
            (DataPointField::Scale, DataPointRef::ExponentialHistogram(p)) => {
                Value::Int(p.scale.into())
            }
            (DataPointField::ZeroCount, DataPointRef::ExponentialHistogram(p)) => {
                u64_value(p.zero_count)
            }
            _ => Value::Absent,
        }
    }

    fn write_point(&mut self, field: DataPointField, value: Value) -> Result<(), FieldError> {
        let point = self.point_mut().ok_or(FieldError::NotPresent)?;
        match (field, point) {
            (DataPointField::StartTimeUnixNano, p) => {
                p.fields().set_start_time_unix_nano(expect_u64(value)?)
            }
            (DataPointField::TimeUnixNano, p) => p.fields().set_time_unix_nano(expect_u64(value)?),
            (DataPointField::Flags, p) => p.fields().set_flags(expect_u32(value)?),
            (DataPointField::ValueInt, DataPointMut::Number(p)) => {
                p.value = NumberValue::Int(expect_int(value)?)
            }
            (DataPointField::ValueDouble, DataPointMut::Number(p)) => {
                p.value = NumberValue::Double(expect_double(value)?)
            }
            (DataPointField::Count, DataPointMut::Histogram(p)) => p.count = expect_u64(value)?,
            (DataPointField::Count, DataPointMut::ExponentialHistogram(p)) => {
                p.count = expect_u64(value)?
            }
            (DataPointField::Count, DataPointMut::Summary(p)) => p.count = expect_u64(value)?,
            (DataPointField::Sum, DataPointMut::Histogram(p)) => {
                p.sum = Some(expect_double(value)?)
            }
            (DataPointField::Sum, DataPointMut::ExponentialHistogram(p)) => {
                p.sum = Some(expect_double(value)?)
            }
            (DataPointField::Sum, DataPointMut::Summary(p)) => p.sum = expect_double(value)?,
            (DataPointField::BucketCounts, DataPointMut::Histogram(p)) => {
                p.bucket_counts = expect_slice(value, expect_u64)?
            }
            (DataPointField::ExplicitBounds, DataPointMut::Histogram(p)) => {
                p.explicit_bounds = expect_slice(value, expect_double)?
            }
            (DataPointField::Scale, DataPointMut::ExponentialHistogram(p)) => {
                p.scale = expect_i32(value)?
            }
            (DataPointField::ZeroCount, DataPointMut::ExponentialHistogram(p)) => {
                p.zero_count = expect_u64(value)?
            }
            _ => return Err(FieldError::NotPresent),
        }
        Ok(())
    }
}

fn expect_slice<T>(
    value: Value,
    item: fn(Value) -> Result<T, FieldError>,
) -> Result<Vec<T>, FieldError> {
    match value {
        Value::Slice(items) => items.into_iter().map(item).collect(),
        other => Err(FieldError::TypeMismatch {
            expected: "slice",
            found: other.kind(),
        }),
    }
}

impl TransformContext for DataPointContext {
    type Field = DataPointField;
    type Sibling = Metric;

    const NAME: &'static str = "datapoint";

    fn resolve_path(fields: &[String]) -> Option<PathTarget<DataPointField>> {
        let parts = split_fields(fields);
        let field = match parts.as_slice() {
            ["attributes"] => return Some(PathTarget::Attributes(MapSlot::Record)),
            ["start_time_unix_nano"] => DataPointField::StartTimeUnixNano,
            ["time_unix_nano"] => DataPointField::TimeUnixNano,
            ["flags"] => DataPointField::Flags,
            ["value_int"] => DataPointField::ValueInt,
            ["value_double"] => DataPointField::ValueDouble,
            ["count"] => DataPointField::Count,
            ["sum"] => DataPointField::Sum,
            ["bucket_counts"] => DataPointField::BucketCounts,
            ["explicit_bounds"] => DataPointField::ExplicitBounds,
            ["scale"] => DataPointField::Scale,
            ["zero_count"] => DataPointField::ZeroCount,
            other => {
                return match resolve_metric_path(other)? {
                    PathTarget::Field(f) => Some(PathTarget::Field(DataPointField::Metric(f))),
                    PathTarget::Attributes(slot) => Some(PathTarget::Attributes(slot)),
                }
            }
        };
        Some(PathTarget::Field(field))
    }

    fn parse_enum(symbol: &str) -> Option<i64> {
        lookup_enum(METRIC_ENUMS, symbol).or_else(|| lookup_enum(DATA_POINT_ENUMS, symbol))
    }

    fn field_kind(field: DataPointField) -> Option<ValueKind> {
        let kind = match field {
            DataPointField::Metric(f) => metric_field_kind(f),
            DataPointField::ValueDouble | DataPointField::Sum => ValueKind::Double,
            DataPointField::BucketCounts | DataPointField::ExplicitBounds => ValueKind::Slice,
            DataPointField::StartTimeUnixNano
            | DataPointField::TimeUnixNano
            | DataPointField::Flags
            | DataPointField::ValueInt
            | DataPointField::Count
            | DataPointField::Scale
            | DataPointField::ZeroCount => ValueKind::Int,
        };
        Some(kind)
    }

    fn get_field(&self, field: DataPointField) -> Value {
        match field {
            DataPointField::Metric(f) => {
                get_metric_field(f, &self.metric, &self.resource, &self.scope)
            }
            other => self.read_point(other),
        }
    }

    fn set_field(&mut self, field: DataPointField, value: Value) -> Result<(), FieldError> {
        match field {
            DataPointField::Metric(f) => set_metric_field(
                f,
                &mut self.metric,
                &mut self.resource,
                &mut self.scope,
                value,
            ),
            other => self.write_point(other, value),
        }
    }

    fn attributes(&self, slot: MapSlot) -> Option<&AttributeMap> {
        match slot {
            MapSlot::Record => self.point().map(|p| p.fields().attributes()),
            MapSlot::Resource => Some(&self.resource.attributes),
            MapSlot::Scope => Some(&self.scope.attributes),
        }
    }

    fn attributes_mut(&mut self, slot: MapSlot) -> Option<&mut AttributeMap> {
        match slot {
            MapSlot::Record => self.point_mut().map(|p| p.fields().attributes_mut()),
            MapSlot::Resource => Some(&mut self.resource.attributes),
            MapSlot::Scope => Some(&mut self.scope.attributes),
        }
    }

    fn emit_sibling(&mut self, record: Metric) {
        self.sink.push(record);
    }

    fn describe(&self) -> String {
        format!("data point {} of metric `{}`", self.index, self.metric.name)
    }
}

impl MetricAccess for DataPointContext {
    fn metric(&self) -> &Metric {
        &self.metric
    }

    fn metric_mut(&mut self) -> &mut Metric {
        &mut self.metric
    }
}
