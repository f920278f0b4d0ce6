//! otlp-transform - Statement-driven transformation of OTLP telemetry
//!
//! This crate applies small, compiled transformation statements to OpenTelemetry
//! Protocol (OTLP) data (metrics, logs, traces). Statements are plain function
//! calls such as `truncate_all(attributes, 128)` or
//! `convert_summary_count_val_to_sum("delta", true)`, compiled once against a
//! per-context function registry and then applied to every record.
//!
//! # Design Principles
//!
//! - **No I/O**: Core never touches network or filesystem
//! - **No async**: Pure synchronous transforms
//! - **Compile once**: Statements are parsed, bound and built at startup
//! - **Owned model**: Records are decoded into an editable model and encoded back
//!
//! # High-level API
//!
//! The simplest way to use this crate is with the high-level transform functions:
//!
//! ```ignore
//! use otlp_transform::{transform_logs, InputFormat, TransformConfig, TransformProcessor};
//!
//! let config = TransformConfig::from_json(config_bytes)?;
//! let processor = TransformProcessor::from_config(&config)?;
//!
//! // Decode, transform and re-encode OTLP logs in the same format
//! let out = transform_logs(bytes, InputFormat::Protobuf, &processor.logs)?;
//! ```
//!
//! # Lower-level API
//!
//! For more control over individual steps:
//!
//! ```ignore
//! use otlp_transform::transform::{LogContext, StandardFunctions, Statements};
//! use otlp_transform::{decode_logs, ErrorMode, InputFormat, LogsProcessor};
//!
//! // Step 1: Compile statements against the log registry
//! let statements = Statements::compile(
//!     &[r#"set(attributes["env"], "prod")"#],
//!     LogContext::standard_registry()?,
//! )?;
//!
//! // Step 2: Decode OTLP bytes into the model
//! let mut logs = decode_logs(bytes, InputFormat::Protobuf)?;
//!
//! // Step 3: Apply the statements to every record
//! LogsProcessor::new(ErrorMode::Propagate)
//!     .with_group(statements)
//!     .process(&mut logs)?;
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod processor;
pub mod transform;

pub use config::{ConfigError, ContextKind, ContextStatements, TransformConfig};
pub use decode::{
    decode_logs, decode_logs_with_format, decode_metrics, decode_metrics_with_format,
    decode_traces, decode_traces_with_format, encode_logs, encode_metrics, encode_traces,
    looks_like_json, DecodeError, InputFormat,
};
pub use error::{Error, Result};
pub use model::{AttributeMap, LogsData, MetricsData, TracesData, Value};
pub use processor::{
    LogsProcessor, MetricGroup, MetricsProcessor, TracesProcessor, TransformProcessor,
};
pub use transform::{init_registries, ErrorMode};

// ============================================================================
// High-level API functions
// ============================================================================

/// Transform OTLP metrics.
///
/// Decodes `bytes`, runs every statement group of `processor`, and encodes
/// the result in the concrete format the payload decoded as, so `Auto`
/// answers a protobuf fallback with protobuf.
///
/// # Example
///
/// ```ignore
/// use otlp_transform::{transform_metrics, InputFormat};
///
/// let out = transform_metrics(otlp_bytes, InputFormat::Auto, &processor.metrics)?;
/// ```
pub fn transform_metrics(
    bytes: &[u8],
    format: InputFormat,
    processor: &MetricsProcessor,
) -> Result<Vec<u8>> {
    // Step 1: Decode OTLP metrics
    let (mut data, used) = decode_metrics_with_format(bytes, format)?;

    // Step 2: Apply statements
    processor.process(&mut data)?;

    // Step 3: Encode in the format the payload decoded as
    Ok(encode_metrics(data, used)?)
}

/// Transform OTLP logs. See [`transform_metrics`].
pub fn transform_logs(
    bytes: &[u8],
    format: InputFormat,
    processor: &LogsProcessor,
) -> Result<Vec<u8>> {
    let (mut data, used) = decode_logs_with_format(bytes, format)?;
    processor.process(&mut data)?;
    Ok(encode_logs(data, used)?)
}

/// Transform OTLP traces. See [`transform_metrics`].
pub fn transform_traces(
    bytes: &[u8],
    format: InputFormat,
    processor: &TracesProcessor,
) -> Result<Vec<u8>> {
    let (mut data, used) = decode_traces_with_format(bytes, format)?;
    processor.process(&mut data)?;
    Ok(encode_traces(data, used)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
    use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
    use opentelemetry_proto::tonic::resource::v1::Resource;
    use prost::Message;

    fn string_kv(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(value.to_string())),
            }),
        }
    }

    fn create_test_log_request() -> ExportLogsServiceRequest {
        ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                resource: Some(Resource {
                    attributes: vec![string_kv("service.name", "test-service")],
                    ..Default::default()
                }),
                scope_logs: vec![ScopeLogs {
                    log_records: vec![LogRecord {
                        time_unix_nano: 1_700_000_000_000_000_000,
                        severity_number: 9,
                        severity_text: "INFO".to_string(),
                        body: Some(AnyValue {
                            value: Some(any_value::Value::StringValue("started".to_string())),
                        }),
                        attributes: vec![
                            string_kv("log.key", "a fairly long value"),
                            string_kv("short", "ok"),
                        ],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn log_processor(statements: &[&str]) -> LogsProcessor {
        LogsProcessor::from_statements(
            &[ContextStatements::new(
                ContextKind::Log,
                statements.iter().copied(),
            )],
            ErrorMode::Propagate,
        )
        .unwrap()
    }

    #[test]
    fn test_transform_logs_protobuf() {
        let bytes = create_test_log_request().encode_to_vec();
        let processor = log_processor(&["truncate_all(attributes, 8)"]);

        let out = transform_logs(&bytes, InputFormat::Protobuf, &processor).unwrap();

        let decoded = ExportLogsServiceRequest::decode(out.as_slice()).unwrap();
        let record = &decoded.resource_logs[0].scope_logs[0].log_records[0];
        assert_eq!(record.attributes[0], string_kv("log.key", "a fairly"));
        assert_eq!(record.attributes[1], string_kv("short", "ok"));
        assert_eq!(record.severity_text, "INFO");
    }

    #[test]
    fn test_transform_logs_empty_processor_is_identity() {
        let request = create_test_log_request();
        let bytes = request.encode_to_vec();

        let out = transform_logs(&bytes, InputFormat::Auto, &LogsProcessor::default()).unwrap();

        let decoded = ExportLogsServiceRequest::decode(out.as_slice()).unwrap();
        assert_eq!(
            decoded.resource_logs[0].scope_logs[0].log_records,
            request.resource_logs[0].scope_logs[0].log_records
        );
    }

    #[test]
    fn test_transform_logs_json_stays_json() {
        let processor = log_processor(&[r#"set(attributes["env"], "prod")"#]);
        let data = decode_logs(&create_test_log_request().encode_to_vec(), InputFormat::Protobuf)
            .unwrap();
        let json = encode_logs(data, InputFormat::Json).unwrap();

        let out = transform_logs(&json, InputFormat::Auto, &processor).unwrap();

        assert!(looks_like_json(&out));
        let logs = decode_logs(&out, InputFormat::Json).unwrap();
        let record = logs.records().next().unwrap();
        assert_eq!(record.attributes.get("env"), Some(&Value::from("prod")));
    }

    #[test]
    fn test_transform_logs_answers_in_decoded_format() {
        // Starts like JSON but only decodes as protobuf (an empty group on field 15).
        let mut bytes = vec![b'{', b'|'];
        bytes.extend(create_test_log_request().encode_to_vec());
        let processor = log_processor(&[r#"set(attributes["env"], "prod")"#]);

        let out = transform_logs(&bytes, InputFormat::Auto, &processor).unwrap();

        assert!(!looks_like_json(&out));
        let decoded = ExportLogsServiceRequest::decode(out.as_slice()).unwrap();
        let record = &decoded.resource_logs[0].scope_logs[0].log_records[0];
        assert_eq!(record.attributes.last(), Some(&string_kv("env", "prod")));
    }

    #[test]
    fn test_transform_logs_invalid_input() {
        let processor = LogsProcessor::default();
        let result = transform_logs(b"not valid protobuf", InputFormat::Protobuf, &processor);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_transform_logs_execution_error() {
        let bytes = create_test_log_request().encode_to_vec();
        let processor = log_processor(&[r#"set(severity_number, "loud")"#]);
        let err = transform_logs(&bytes, InputFormat::Protobuf, &processor).unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
        assert!(err.to_string().contains("set(severity_number, \"loud\")"));
    }
}
