//! OTLP metric codec - protobuf messages to and from the model

use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::metrics::v1 as proto;
use opentelemetry_proto::tonic::metrics::v1::{
    exponential_histogram_data_point, metric, number_data_point, summary_data_point,
};

use super::common::{
    attributes_from_proto, attributes_to_proto, resource_from_proto, resource_to_proto,
    scope_from_proto, scope_to_proto,
};
use crate::model::{
    AggregationTemporality, Buckets, ExponentialHistogram, ExponentialHistogramDataPoint, Gauge,
    Histogram, HistogramDataPoint, Metric, MetricData, MetricsData, NumberDataPoint, NumberValue,
    ResourceMetrics, ScopeMetrics, Sum, Summary, SummaryDataPoint, ValueAtQuantile,
};

// ============================================================================
// Protobuf -> model
// ============================================================================

pub fn from_request(request: ExportMetricsServiceRequest) -> MetricsData {
    MetricsData {
        resource_metrics: request
            .resource_metrics
            .into_iter()
            .map(|rm| ResourceMetrics {
                resource: resource_from_proto(rm.resource),
                scope_metrics: rm
                    .scope_metrics
                    .into_iter()
                    .map(|sm| ScopeMetrics {
                        scope: scope_from_proto(sm.scope),
                        metrics: sm.metrics.into_iter().map(metric_from_proto).collect(),
                        schema_url: sm.schema_url,
                    })
                    .collect(),
                schema_url: rm.schema_url,
            })
            .collect(),
    }
}

fn metric_from_proto(metric: proto::Metric) -> Metric {
    let data = match metric.data {
        Some(metric::Data::Gauge(gauge)) => MetricData::Gauge(Gauge {
            data_points: number_points_from_proto(gauge.data_points),
        }),
        Some(metric::Data::Sum(sum)) => MetricData::Sum(Sum {
            data_points: number_points_from_proto(sum.data_points),
            aggregation_temporality: AggregationTemporality::from_i32(sum.aggregation_temporality),
            is_monotonic: sum.is_monotonic,
        }),
        Some(metric::Data::Histogram(hist)) => MetricData::Histogram(Histogram {
            data_points: hist
                .data_points
                .into_iter()
                .map(|dp| HistogramDataPoint {
                    attributes: attributes_from_proto(dp.attributes),
                    start_time_unix_nano: dp.start_time_unix_nano,
                    time_unix_nano: dp.time_unix_nano,
                    count: dp.count,
                    sum: dp.sum,
                    bucket_counts: dp.bucket_counts,
                    explicit_bounds: dp.explicit_bounds,
                    exemplars: dp.exemplars,
                    flags: dp.flags,
                    min: dp.min,
                    max: dp.max,
                })
                .collect(),
            aggregation_temporality: AggregationTemporality::from_i32(hist.aggregation_temporality),
        }),
        Some(metric::Data::ExponentialHistogram(hist)) => {
            MetricData::ExponentialHistogram(ExponentialHistogram {
                data_points: hist
                    .data_points
                    .into_iter()
                    .map(|dp| ExponentialHistogramDataPoint {
                        attributes: attributes_from_proto(dp.attributes),
                        start_time_unix_nano: dp.start_time_unix_nano,
                        time_unix_nano: dp.time_unix_nano,
                        count: dp.count,
                        sum: dp.sum,
                        scale: dp.scale,
                        zero_count: dp.zero_count,
                        positive: buckets_from_proto(dp.positive),
                        negative: buckets_from_proto(dp.negative),
                        flags: dp.flags,
                        exemplars: dp.exemplars,
                        min: dp.min,
                        max: dp.max,
                        zero_threshold: dp.zero_threshold,
                    })
                    .collect(),
                aggregation_temporality: AggregationTemporality::from_i32(
                    hist.aggregation_temporality,
                ),
            })
        }
        Some(metric::Data::Summary(summary)) => MetricData::Summary(Summary {
            data_points: summary
                .data_points
                .into_iter()
                .map(|dp| SummaryDataPoint {
                    attributes: attributes_from_proto(dp.attributes),
                    start_time_unix_nano: dp.start_time_unix_nano,
                    time_unix_nano: dp.time_unix_nano,
                    count: dp.count,
                    sum: dp.sum,
                    quantile_values: dp
                        .quantile_values
                        .into_iter()
                        .map(|q| ValueAtQuantile {
                            quantile: q.quantile,
                            value: q.value,
                        })
                        .collect(),
                    flags: dp.flags,
                })
                .collect(),
        }),
        None => MetricData::Empty,
    };
    Metric {
        name: metric.name,
        description: metric.description,
        unit: metric.unit,
        data,
    }
}

fn number_points_from_proto(points: Vec<proto::NumberDataPoint>) -> Vec<NumberDataPoint> {
    points
        .into_iter()
        .map(|dp| NumberDataPoint {
            attributes: attributes_from_proto(dp.attributes),
            start_time_unix_nano: dp.start_time_unix_nano,
            time_unix_nano: dp.time_unix_nano,
            value: match dp.value {
                Some(number_data_point::Value::AsInt(i)) => NumberValue::Int(i),
                Some(number_data_point::Value::AsDouble(d)) => NumberValue::Double(d),
                None => NumberValue::Empty,
            },
            exemplars: dp.exemplars,
            flags: dp.flags,
        })
        .collect()
}

fn buckets_from_proto(buckets: Option<exponential_histogram_data_point::Buckets>) -> Buckets {
    buckets
        .map(|b| Buckets {
            offset: b.offset,
            bucket_counts: b.bucket_counts,
        })
        .unwrap_or_default()
}

// ============================================================================
// Model -> protobuf
// ============================================================================

pub fn to_request(data: MetricsData) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: data
            .resource_metrics
            .into_iter()
            .map(|rm| proto::ResourceMetrics {
                resource: resource_to_proto(rm.resource),
                scope_metrics: rm
                    .scope_metrics
                    .into_iter()
                    .map(|sm| proto::ScopeMetrics {
                        scope: scope_to_proto(sm.scope),
                        metrics: sm.metrics.into_iter().map(metric_to_proto).collect(),
                        schema_url: sm.schema_url,
                    })
                    .collect(),
                schema_url: rm.schema_url,
            })
            .collect(),
    }
}

fn metric_to_proto(metric: Metric) -> proto::Metric {
    let data = match metric.data {
        MetricData::Empty => None,
        MetricData::Gauge(gauge) => Some(metric::Data::Gauge(proto::Gauge {
            data_points: number_points_to_proto(gauge.data_points),
        })),
        MetricData::Sum(sum) => Some(metric::Data::Sum(proto::Sum {
            data_points: number_points_to_proto(sum.data_points),
            aggregation_temporality: sum.aggregation_temporality.as_i32(),
            is_monotonic: sum.is_monotonic,
        })),
        MetricData::Histogram(hist) => Some(metric::Data::Histogram(proto::Histogram {
            data_points: hist
                .data_points
                .into_iter()
                .map(|dp| proto::HistogramDataPoint {
                    attributes: attributes_to_proto(dp.attributes),
                    start_time_unix_nano: dp.start_time_unix_nano,
                    time_unix_nano: dp.time_unix_nano,
                    count: dp.count,
                    sum: dp.sum,
                    bucket_counts: dp.bucket_counts,
                    explicit_bounds: dp.explicit_bounds,
                    exemplars: dp.exemplars,
                    flags: dp.flags,
                    min: dp.min,
                    max: dp.max,
                })
                .collect(),
            aggregation_temporality: hist.aggregation_temporality.as_i32(),
        })),
        MetricData::ExponentialHistogram(hist) => Some(metric::Data::ExponentialHistogram(
            proto::ExponentialHistogram {
                data_points: hist
                    .data_points
                    .into_iter()
                    .map(|dp| proto::ExponentialHistogramDataPoint {
                        attributes: attributes_to_proto(dp.attributes),
                        start_time_unix_nano: dp.start_time_unix_nano,
                        time_unix_nano: dp.time_unix_nano,
                        count: dp.count,
                        sum: dp.sum,
                        scale: dp.scale,
                        zero_count: dp.zero_count,
                        positive: Some(buckets_to_proto(dp.positive)),
                        negative: Some(buckets_to_proto(dp.negative)),
                        flags: dp.flags,
                        exemplars: dp.exemplars,
                        min: dp.min,
                        max: dp.max,
                        zero_threshold: dp.zero_threshold,
                    })
                    .collect(),
                aggregation_temporality: hist.aggregation_temporality.as_i32(),
            },
        )),
        MetricData::Summary(summary) => Some(metric::Data::Summary(proto::Summary {
            data_points: summary
                .data_points
                .into_iter()
                .map(|dp| proto::SummaryDataPoint {
                    attributes: attributes_to_proto(dp.attributes),
                    start_time_unix_nano: dp.start_time_unix_nano,
                    time_unix_nano: dp.time_unix_nano,
                    count: dp.count,
                    sum: dp.sum,
                    quantile_values: dp
                        .quantile_values
                        .into_iter()
                        .map(|q| summary_data_point::ValueAtQuantile {
                            quantile: q.quantile,
                            value: q.value,
                        })
                        .collect(),
                    flags: dp.flags,
                })
                .collect(),
        })),
    };
    proto::Metric {
        name: metric.name,
        description: metric.description,
        unit: metric.unit,
        data,
        ..Default::default()
    }
}

fn number_points_to_proto(points: Vec<NumberDataPoint>) -> Vec<proto::NumberDataPoint> {
    points
        .into_iter()
        .map(|dp| proto::NumberDataPoint {
            attributes: attributes_to_proto(dp.attributes),
            start_time_unix_nano: dp.start_time_unix_nano,
            time_unix_nano: dp.time_unix_nano,
            exemplars: dp.exemplars,
            flags: dp.flags,
            value: match dp.value {
                NumberValue::Int(i) => Some(number_data_point::Value::AsInt(i)),
                NumberValue::Double(d) => Some(number_data_point::Value::AsDouble(d)),
                NumberValue::Empty => None,
            },
        })
        .collect()
}

fn buckets_to_proto(buckets: Buckets) -> exponential_histogram_data_point::Buckets {
    exponential_histogram_data_point::Buckets {
        offset: buckets.offset,
        bucket_counts: buckets.bucket_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};

    fn summary_request() -> ExportMetricsServiceRequest {
        ExportMetricsServiceRequest {
            resource_metrics: vec![proto::ResourceMetrics {
                resource: Some(Default::default()),
                scope_metrics: vec![proto::ScopeMetrics {
                    scope: Some(Default::default()),
                    metrics: vec![proto::Metric {
                        name: "latency".to_string(),
                        unit: "ms".to_string(),
                        data: Some(metric::Data::Summary(proto::Summary {
                            data_points: vec![proto::SummaryDataPoint {
                                attributes: vec![KeyValue {
                                    key: "a".to_string(),
                                    value: Some(AnyValue {
                                        value: Some(any_value::Value::StringValue(
                                            "b".to_string(),
                                        )),
                                    }),
                                }],
                                time_unix_nano: 7,
                                count: 42,
                                sum: 3.5,
                                ..Default::default()
                            }],
                        })),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn summary_decodes_into_model() {
        let data = from_request(summary_request());
        assert_eq!(data.metric_count(), 1);
        let metric = data.metrics().next().unwrap();
        assert_eq!(metric.name, "latency");
        let MetricData::Summary(summary) = &metric.data else {
            panic!("expected summary, got {:?}", metric.data);
        };
        assert_eq!(summary.data_points[0].count, 42);
        assert_eq!(
            summary.data_points[0].attributes.get("a"),
            Some(&Value::from("b"))
        );
    }

    #[test]
    fn model_converts_back_to_request() {
        let request = summary_request();
        assert_eq!(to_request(from_request(request.clone())), request);
    }

    #[test]
    fn metric_without_data_is_empty() {
        let metric = metric_from_proto(proto::Metric {
            name: "bare".to_string(),
            ..Default::default()
        });
        assert_eq!(metric.data, MetricData::Empty);
        assert!(metric_to_proto(metric).data.is_none());
    }
}
