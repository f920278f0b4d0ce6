//! Signal processors: compiled statement groups applied to decoded batches.
//!
//! Each processor holds its groups in configuration order. A group visits
//! every record of its context kind in a scope before the next group runs,
//! and records a group emits are appended to the scope's collection once
//! that group's pass is done. Independent batches can be processed in
//! parallel with `process_batches`; records within one batch never are.

use rayon::prelude::*;
use std::mem;
use tracing::{debug, trace};

use crate::config::{ContextKind, ContextStatements, TransformConfig};
use crate::error::{Error, Result};
use crate::model::{InstrumentationScope, LogsData, MetricsData, Resource, TracesData};
use crate::transform::{
    DataPointContext, ErrorMode, ExecutionError, LogContext, MetricAccess, MetricContext,
    SiblingSink, SpanContext, StandardFunctions, Statements, TransformContext,
};

// ============================================================================
// Record passes
// ============================================================================

type PassResult = std::result::Result<(), ExecutionError>;

/// A context the processors can build around one record of a collection.
trait RecordPass: TransformContext + Sized {
    fn open(
        record: Self::Sibling,
        resource: Resource,
        scope: InstrumentationScope,
        sink: SiblingSink<Self::Sibling>,
    ) -> Self;

    fn close(self) -> (Self::Sibling, Resource, InstrumentationScope);

    fn run(&mut self, statements: &Statements<Self>, mode: ErrorMode) -> PassResult {
        statements.execute(self, mode)
    }
}

impl RecordPass for MetricContext {
    fn open(
        record: Self::Sibling,
        resource: Resource,
        scope: InstrumentationScope,
        sink: SiblingSink<Self::Sibling>,
    ) -> Self {
        MetricContext::new(record, resource, scope).with_sink(sink)
    }

    fn close(self) -> (Self::Sibling, Resource, InstrumentationScope) {
        self.into_parts()
    }
}

impl RecordPass for DataPointContext {
    fn open(
        record: Self::Sibling,
        resource: Resource,
        scope: InstrumentationScope,
        sink: SiblingSink<Self::Sibling>,
    ) -> Self {
        DataPointContext::new(record, resource, scope).with_sink(sink)
    }

    fn close(self) -> (Self::Sibling, Resource, InstrumentationScope) {
        self.into_parts()
    }

    /// Every data point of the metric, in order. The count is re-read each
    /// step since statements may change the metric's kind.
    fn run(&mut self, statements: &Statements<Self>, mode: ErrorMode) -> PassResult {
        let mut index = 0;
        while index < self.metric().data_point_count() {
            self.set_index(index);
            statements.execute(self, mode)?;
            index += 1;
        }
        Ok(())
    }
}

impl RecordPass for LogContext {
    fn open(
        record: Self::Sibling,
        resource: Resource,
        scope: InstrumentationScope,
        sink: SiblingSink<Self::Sibling>,
    ) -> Self {
        LogContext::new(record, resource, scope).with_sink(sink)
    }

    fn close(self) -> (Self::Sibling, Resource, InstrumentationScope) {
        self.into_parts()
    }
}

impl RecordPass for SpanContext {
    fn open(
        record: Self::Sibling,
        resource: Resource,
        scope: InstrumentationScope,
        sink: SiblingSink<Self::Sibling>,
    ) -> Self {
        SpanContext::new(record, resource, scope).with_sink(sink)
    }

    fn close(self) -> (Self::Sibling, Resource, InstrumentationScope) {
        self.into_parts()
    }
}

/// Run `statements` over every record of one scope's collection. The
/// resource and scope are lent to each context in turn and handed back
/// after it, so edits to them carry over to the next record.
fn run_pass<C>(
    statements: &Statements<C>,
    mode: ErrorMode,
    records: &mut Vec<C::Sibling>,
    resource: &mut Resource,
    scope: &mut InstrumentationScope,
) -> PassResult
where
    C: RecordPass,
    C::Sibling: Default,
{
    if statements.is_empty() {
        return Ok(());
    }
    let sink = SiblingSink::new();
    for record in records.iter_mut() {
        let mut ctx = C::open(
            mem::take(record),
            mem::take(resource),
            mem::take(scope),
            sink.clone(),
        );
        let result = ctx.run(statements, mode);
        let (r, res, sc) = ctx.close();
        *record = r;
        *resource = res;
        *scope = sc;
        result?;
    }
    records.extend(sink.drain());
    Ok(())
}

fn compile<C: StandardFunctions>(statements: &[String]) -> Result<Statements<C>> {
    Ok(Statements::compile(statements, C::standard_registry()?)?)
}

fn wrong_context(signal: &'static str, context: ContextKind) -> Error {
    crate::config::ConfigError::WrongContext { signal, context }.into()
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Clone)]
pub enum MetricGroup {
    Metric(Statements<MetricContext>),
    DataPoint(Statements<DataPointContext>),
}

#[derive(Debug, Clone, Default)]
pub struct MetricsProcessor {
    groups: Vec<MetricGroup>,
    error_mode: ErrorMode,
}

impl MetricsProcessor {
    pub fn new(error_mode: ErrorMode) -> Self {
        MetricsProcessor {
            groups: Vec::new(),
            error_mode,
        }
    }

    pub fn with_group(mut self, group: MetricGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Compile configured groups against the standard registries.
    pub fn from_statements(groups: &[ContextStatements], error_mode: ErrorMode) -> Result<Self> {
        let groups = groups
            .iter()
            .map(|group| match group.context {
                ContextKind::Metric => compile(&group.statements).map(MetricGroup::Metric),
                ContextKind::Datapoint => compile(&group.statements).map(MetricGroup::DataPoint),
                other => Err(wrong_context("metric", other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MetricsProcessor { groups, error_mode })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn process(&self, data: &mut MetricsData) -> PassResult {
        for rm in &mut data.resource_metrics {
            let resource = &mut rm.resource;
            for sm in &mut rm.scope_metrics {
                for group in &self.groups {
                    match group {
                        MetricGroup::Metric(statements) => run_pass(
                            statements,
                            self.error_mode,
                            &mut sm.metrics,
                            resource,
                            &mut sm.scope,
                        )?,
                        MetricGroup::DataPoint(statements) => run_pass(
                            statements,
                            self.error_mode,
                            &mut sm.metrics,
                            resource,
                            &mut sm.scope,
                        )?,
                    }
                }
            }
        }
        trace!(metrics = data.metric_count(), "processed metrics batch");
        Ok(())
    }

    pub fn process_batches(&self, batches: &mut [MetricsData]) -> PassResult {
        batches
            .par_iter_mut()
            .try_for_each(|batch| self.process(batch))
    }
}

// ============================================================================
// Logs
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogsProcessor {
    groups: Vec<Statements<LogContext>>,
    error_mode: ErrorMode,
}

impl LogsProcessor {
    pub fn new(error_mode: ErrorMode) -> Self {
        LogsProcessor {
            groups: Vec::new(),
            error_mode,
        }
    }

    pub fn with_group(mut self, statements: Statements<LogContext>) -> Self {
        self.groups.push(statements);
        self
    }

    pub fn from_statements(groups: &[ContextStatements], error_mode: ErrorMode) -> Result<Self> {
        let groups = groups
            .iter()
            .map(|group| match group.context {
                ContextKind::Log => compile(&group.statements),
                other => Err(wrong_context("log", other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LogsProcessor { groups, error_mode })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn process(&self, data: &mut LogsData) -> PassResult {
        for rl in &mut data.resource_logs {
            let resource = &mut rl.resource;
            for sl in &mut rl.scope_logs {
                for statements in &self.groups {
                    run_pass(
                        statements,
                        self.error_mode,
                        &mut sl.log_records,
                        resource,
                        &mut sl.scope,
                    )?;
                }
            }
        }
        trace!(records = data.records().count(), "processed logs batch");
        Ok(())
    }

    pub fn process_batches(&self, batches: &mut [LogsData]) -> PassResult {
        batches
            .par_iter_mut()
            .try_for_each(|batch| self.process(batch))
    }
}

// ============================================================================
// Traces
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TracesProcessor {
    groups: Vec<Statements<SpanContext>>,
    error_mode: ErrorMode,
}

impl TracesProcessor {
    pub fn new(error_mode: ErrorMode) -> Self {
        TracesProcessor {
            groups: Vec::new(),
            error_mode,
        }
    }

    pub fn with_group(mut self, statements: Statements<SpanContext>) -> Self {
        self.groups.push(statements);
        self
    }

    pub fn from_statements(groups: &[ContextStatements], error_mode: ErrorMode) -> Result<Self> {
        let groups = groups
            .iter()
            .map(|group| match group.context {
                ContextKind::Span => compile(&group.statements),
                other => Err(wrong_context("trace", other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TracesProcessor { groups, error_mode })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn process(&self, data: &mut TracesData) -> PassResult {
        for rs in &mut data.resource_spans {
            let resource = &mut rs.resource;
            for ss in &mut rs.scope_spans {
                for statements in &self.groups {
                    run_pass(
                        statements,
                        self.error_mode,
                        &mut ss.spans,
                        resource,
                        &mut ss.scope,
                    )?;
                }
            }
        }
        trace!(spans = data.spans().count(), "processed traces batch");
        Ok(())
    }

    pub fn process_batches(&self, batches: &mut [TracesData]) -> PassResult {
        batches
            .par_iter_mut()
            .try_for_each(|batch| self.process(batch))
    }
}

// ============================================================================
// All signals
// ============================================================================

/// The three signal processors built from one configuration.
#[derive(Debug, Clone, Default)]
pub struct TransformProcessor {
    pub metrics: MetricsProcessor,
    pub logs: LogsProcessor,
    pub traces: TracesProcessor,
}

impl TransformProcessor {
    pub fn from_config(config: &TransformConfig) -> Result<Self> {
        config.validate()?;
        let mode = config.error_mode;
        let processor = TransformProcessor {
            metrics: MetricsProcessor::from_statements(&config.metric_statements, mode)?,
            logs: LogsProcessor::from_statements(&config.log_statements, mode)?,
            traces: TracesProcessor::from_statements(&config.trace_statements, mode)?,
        };
        debug!(
            error_mode = ?mode,
            metric_groups = processor.metrics.groups.len(),
            log_groups = processor.logs.groups.len(),
            trace_groups = processor.traces.groups.len(),
            "built transform processor"
        );
        Ok(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Gauge, LogRecord, Metric, MetricData, NumberDataPoint, NumberValue, ResourceLogs,
        ResourceMetrics, ScopeLogs, ScopeMetrics, Summary, SummaryDataPoint, Value,
    };
    use crate::transform::RuntimeError;

    fn metrics_data(metrics: Vec<Metric>) -> MetricsData {
        MetricsData {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn summary(name: &str, points: usize) -> Metric {
        Metric {
            name: name.to_string(),
            data: MetricData::Summary(Summary {
                data_points: (0..points)
                    .map(|i| SummaryDataPoint {
                        count: i as u64 + 1,
                        ..Default::default()
                    })
                    .collect(),
            }),
            ..Default::default()
        }
    }

    fn logs_data(records: Vec<LogRecord>) -> LogsData {
        LogsData {
            resource_logs: vec![ResourceLogs {
                scope_logs: vec![ScopeLogs {
                    log_records: records,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn metric_processor(context: ContextKind, statements: &[&str]) -> MetricsProcessor {
        MetricsProcessor::from_statements(
            &[ContextStatements::new(context, statements.iter().copied())],
            ErrorMode::Propagate,
        )
        .unwrap()
    }

    #[test]
    fn derived_metrics_are_appended_after_the_pass() {
        let processor = metric_processor(
            ContextKind::Metric,
            &[r#"convert_summary_count_val_to_sum("delta", true)"#],
        );
        let mut data = metrics_data(vec![summary("latency", 1), summary("size", 1)]);
        processor.process(&mut data).unwrap();
        let names: Vec<_> = data.metrics().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["latency", "size", "latency_count", "size_count"]);
    }

    #[test]
    fn datapoint_context_converts_once_per_point() {
        let processor = metric_processor(
            ContextKind::Datapoint,
            &[r#"convert_summary_sum_val_to_sum("cumulative", false)"#],
        );
        let mut data = metrics_data(vec![summary("latency", 2)]);
        processor.process(&mut data).unwrap();
        assert_eq!(data.metric_count(), 3);
        assert!(data.metrics().skip(1).all(|m| m.name == "latency_sum"));
    }

    #[test]
    fn datapoint_statements_see_each_point() {
        let processor = metric_processor(
            ContextKind::Datapoint,
            &[r#"set(attributes["metric"], metric.name)"#],
        );
        let gauge = Metric {
            name: "cpu".to_string(),
            data: MetricData::Gauge(Gauge {
                data_points: vec![
                    NumberDataPoint {
                        value: NumberValue::Double(0.5),
                        ..Default::default()
                    },
                    NumberDataPoint::default(),
                ],
            }),
            ..Default::default()
        };
        let mut data = metrics_data(vec![gauge]);
        processor.process(&mut data).unwrap();
        let metric = data.metrics().next().unwrap();
        let MetricData::Gauge(gauge) = &metric.data else {
            panic!("expected gauge");
        };
        for point in &gauge.data_points {
            assert_eq!(point.attributes.get("metric"), Some(&Value::from("cpu")));
        }
    }

    #[test]
    fn resource_edits_carry_over_between_records() {
        let processor = LogsProcessor::from_statements(
            &[ContextStatements::new(
                ContextKind::Log,
                [r#"set(resource.attributes["seen"], attributes["id"])"#],
            )],
            ErrorMode::Propagate,
        )
        .unwrap();
        let records = ["a", "b"]
            .into_iter()
            .map(|id| LogRecord {
                attributes: [("id", Value::from(id))].into_iter().collect(),
                ..Default::default()
            })
            .collect();
        let mut data = logs_data(records);
        processor.process(&mut data).unwrap();
        let resource = &data.resource_logs[0].resource;
        assert_eq!(resource.attributes.get("seen"), Some(&Value::from("b")));
    }

    #[test]
    fn propagated_error_leaves_record_in_place() {
        let processor = LogsProcessor::from_statements(
            &[ContextStatements::new(
                ContextKind::Log,
                [r#"set(time_unix_nano, "soon")"#],
            )],
            ErrorMode::Propagate,
        )
        .unwrap();
        let mut data = logs_data(vec![LogRecord {
            severity_text: "WARN".to_string(),
            ..Default::default()
        }]);
        let err = processor.process(&mut data).unwrap_err();
        assert!(matches!(err.source, RuntimeError::TypeMismatch { .. }));
        assert_eq!(data.records().next().unwrap().severity_text, "WARN");
    }

    #[test]
    fn batches_process_in_parallel() {
        let processor = LogsProcessor::from_statements(
            &[ContextStatements::new(
                ContextKind::Log,
                ["truncate_all(attributes, 2)"],
            )],
            ErrorMode::Propagate,
        )
        .unwrap();
        let mut batches: Vec<LogsData> = (0..16)
            .map(|_| {
                logs_data(vec![LogRecord {
                    attributes: [("k", Value::from("long value"))].into_iter().collect(),
                    ..Default::default()
                }])
            })
            .collect();
        processor.process_batches(&mut batches).unwrap();
        for batch in &batches {
            let record = batch.records().next().unwrap();
            assert_eq!(record.attributes.get("k"), Some(&Value::from("lo")));
        }
    }

    #[test]
    fn wrong_context_is_rejected() {
        let err = MetricsProcessor::from_statements(
            &[ContextStatements::new(ContextKind::Span, Vec::<String>::new())],
            ErrorMode::Propagate,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn from_config_reports_bad_statement() {
        let config = TransformConfig {
            trace_statements: vec![ContextStatements::new(
                ContextKind::Span,
                ["limit(attributes)"],
            )],
            ..Default::default()
        };
        match TransformProcessor::from_config(&config) {
            Err(Error::Statement(err)) => assert_eq!(err.statement, "limit(attributes)"),
            other => panic!("expected statement error, got {other:?}"),
        }
    }
}
