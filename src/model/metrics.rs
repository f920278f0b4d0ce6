//! Metric records: the metric itself and its closed set of data kinds.

use super::{AttributeMap, InstrumentationScope, Resource};
use opentelemetry_proto::tonic::metrics::v1::Exemplar;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsData {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl MetricsData {
    /// Total number of metrics across every resource and scope.
    pub fn metric_count(&self) -> usize {
        self.resource_metrics
            .iter()
            .flat_map(|rm| &rm.scope_metrics)
            .map(|sm| sm.metrics.len())
            .sum()
    }

    /// Iterates every metric in document order.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics
            .iter()
            .flat_map(|rm| &rm.scope_metrics)
            .flat_map(|sm| &sm.metrics)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scope_metrics: Vec<ScopeMetrics>,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeMetrics {
    pub scope: InstrumentationScope,
    pub metrics: Vec<Metric>,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub data: MetricData,
}

/// The data carried by a metric. The variant set is fixed by the OTLP model.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MetricData {
    #[default]
    Empty,
    Gauge(Gauge),
    Sum(Sum),
    Histogram(Histogram),
    ExponentialHistogram(ExponentialHistogram),
    Summary(Summary),
}

/// Numeric tag of a [`MetricData`] variant, as exposed by `metric.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Empty = 0,
    Gauge = 1,
    Sum = 2,
    Histogram = 3,
    ExponentialHistogram = 4,
    Summary = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationTemporality {
    #[default]
    Unspecified = 0,
    Delta = 1,
    Cumulative = 2,
}

impl AggregationTemporality {
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => AggregationTemporality::Delta,
            2 => AggregationTemporality::Cumulative,
            _ => AggregationTemporality::Unspecified,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gauge {
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sum {
    pub data_points: Vec<NumberDataPoint>,
    pub aggregation_temporality: AggregationTemporality,
    pub is_monotonic: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Histogram {
    pub data_points: Vec<HistogramDataPoint>,
    pub aggregation_temporality: AggregationTemporality,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExponentialHistogram {
    pub data_points: Vec<ExponentialHistogramDataPoint>,
    pub aggregation_temporality: AggregationTemporality,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub data_points: Vec<SummaryDataPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NumberValue {
    #[default]
    Empty,
    Int(i64),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberDataPoint {
    pub attributes: AttributeMap,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub value: NumberValue,
    pub exemplars: Vec<Exemplar>,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramDataPoint {
    pub attributes: AttributeMap,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: Option<f64>,
    pub bucket_counts: Vec<u64>,
    pub explicit_bounds: Vec<f64>,
    pub exemplars: Vec<Exemplar>,
    pub flags: u32,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Buckets {
    pub offset: i32,
    pub bucket_counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExponentialHistogramDataPoint {
    pub attributes: AttributeMap,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: Option<f64>,
    pub scale: i32,
    pub zero_count: u64,
    pub positive: Buckets,
    pub negative: Buckets,
    pub flags: u32,
    pub exemplars: Vec<Exemplar>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub zero_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueAtQuantile {
    pub quantile: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryDataPoint {
    pub attributes: AttributeMap,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: f64,
    pub quantile_values: Vec<ValueAtQuantile>,
    pub flags: u32,
}

/// Fields every data point kind carries.
pub trait DataPointFields {
    fn attributes(&self) -> &AttributeMap;
    fn attributes_mut(&mut self) -> &mut AttributeMap;
    fn start_time_unix_nano(&self) -> u64;
    fn set_start_time_unix_nano(&mut self, value: u64);
    fn time_unix_nano(&self) -> u64;
    fn set_time_unix_nano(&mut self, value: u64);
    fn flags(&self) -> u32;
    fn set_flags(&mut self, value: u32);
}

macro_rules! impl_data_point_fields {
    ($($point:ty),+ $(,)?) => {
        $(
            impl DataPointFields for $point {
                fn attributes(&self) -> &AttributeMap {
                    &self.attributes
                }
                fn attributes_mut(&mut self) -> &mut AttributeMap {
                    &mut self.attributes
                }
                fn start_time_unix_nano(&self) -> u64 {
                    self.start_time_unix_nano
                }
                fn set_start_time_unix_nano(&mut self, value: u64) {
                    self.start_time_unix_nano = value;
                }
                fn time_unix_nano(&self) -> u64 {
                    self.time_unix_nano
                }
                fn set_time_unix_nano(&mut self, value: u64) {
                    self.time_unix_nano = value;
                }
                fn flags(&self) -> u32 {
                    self.flags
                }
                fn set_flags(&mut self, value: u32) {
                    self.flags = value;
                }
            }
        )+
    };
}

impl_data_point_fields!(
    NumberDataPoint,
    HistogramDataPoint,
    ExponentialHistogramDataPoint,
    SummaryDataPoint,
);

/// Borrowed view of one data point, whatever its kind.
#[derive(Debug, Clone, Copy)]
pub enum DataPointRef<'a> {
    Number(&'a NumberDataPoint),
    Histogram(&'a HistogramDataPoint),
    ExponentialHistogram(&'a ExponentialHistogramDataPoint),
    Summary(&'a SummaryDataPoint),
}

impl<'a> DataPointRef<'a> {
    pub fn fields(self) -> &'a dyn DataPointFields {
        match self {
            DataPointRef::Number(p) => p,
            DataPointRef::Histogram(p) => p,
            DataPointRef::ExponentialHistogram(p) => p,
            DataPointRef::Summary(p) => p,
        }
    }
}

/// Mutable view of one data point, whatever its kind.
#[derive(Debug)]
pub enum DataPointMut<'a> {
    Number(&'a mut NumberDataPoint),
    Histogram(&'a mut HistogramDataPoint),
    ExponentialHistogram(&'a mut ExponentialHistogramDataPoint),
    Summary(&'a mut SummaryDataPoint),
}

impl<'a> DataPointMut<'a> {
    pub fn fields(self) -> &'a mut dyn DataPointFields {
        match self {
            DataPointMut::Number(p) => p,
            DataPointMut::Histogram(p) => p,
            DataPointMut::ExponentialHistogram(p) => p,
            DataPointMut::Summary(p) => p,
        }
    }
}

impl Metric {
    pub fn metric_type(&self) -> MetricType {
        match &self.data {
            MetricData::Empty => MetricType::Empty,
            MetricData::Gauge(_) => MetricType::Gauge,
            MetricData::Sum(_) => MetricType::Sum,
            MetricData::Histogram(_) => MetricType::Histogram,
            MetricData::ExponentialHistogram(_) => MetricType::ExponentialHistogram,
            MetricData::Summary(_) => MetricType::Summary,
        }
    }

    /// Temporality of the kinds that carry one; `None` for gauge, summary and empty.
    pub fn aggregation_temporality(&self) -> Option<AggregationTemporality> {
        match &self.data {
            MetricData::Sum(s) => Some(s.aggregation_temporality),
            MetricData::Histogram(h) => Some(h.aggregation_temporality),
            MetricData::ExponentialHistogram(e) => Some(e.aggregation_temporality),
            _ => None,
        }
    }

    pub fn is_monotonic(&self) -> Option<bool> {
        match &self.data {
            MetricData::Sum(s) => Some(s.is_monotonic),
            _ => None,
        }
    }

    pub fn data_point_count(&self) -> usize {
        match &self.data {
            MetricData::Empty => 0,
            MetricData::Gauge(g) => g.data_points.len(),
            MetricData::Sum(s) => s.data_points.len(),
            MetricData::Histogram(h) => h.data_points.len(),
            MetricData::ExponentialHistogram(e) => e.data_points.len(),
            MetricData::Summary(s) => s.data_points.len(),
        }
    }

    pub fn data_point(&self, index: usize) -> Option<DataPointRef<'_>> {
        match &self.data {
            MetricData::Empty => None,
            MetricData::Gauge(g) => g.data_points.get(index).map(DataPointRef::Number),
            MetricData::Sum(s) => s.data_points.get(index).map(DataPointRef::Number),
            MetricData::Histogram(h) => h.data_points.get(index).map(DataPointRef::Histogram),
            MetricData::ExponentialHistogram(e) => e
                .data_points
                .get(index)
                .map(DataPointRef::ExponentialHistogram),
            MetricData::Summary(s) => s.data_points.get(index).map(DataPointRef::Summary),
        }
    }

    pub fn data_point_mut(&mut self, index: usize) -> Option<DataPointMut<'_>> {
        match &mut self.data {
            MetricData::Empty => None,
            MetricData::Gauge(g) => g.data_points.get_mut(index).map(DataPointMut::Number),
            MetricData::Sum(s) => s.data_points.get_mut(index).map(DataPointMut::Number),
            MetricData::Histogram(h) => h.data_points.get_mut(index).map(DataPointMut::Histogram),
            MetricData::ExponentialHistogram(e) => e
                .data_points
                .get_mut(index)
                .map(DataPointMut::ExponentialHistogram),
            MetricData::Summary(s) => s.data_points.get_mut(index).map(DataPointMut::Summary),
        }
    }
}
