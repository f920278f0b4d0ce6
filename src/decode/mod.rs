//! OTLP codec layer - raw bytes to and from the telemetry model
//!
//! This module decodes OTLP export requests for logs, traces and metrics in
//! both protobuf and JSON formats into the owned model the transform engine
//! edits, and encodes the model back into the same wire formats.
//!
//! # Usage
//!
//! ```ignore
//! use otlp_transform::decode::{decode_logs, encode_logs, InputFormat};
//!
//! let logs = decode_logs(bytes, InputFormat::Protobuf)?;
//! let out = encode_logs(logs, InputFormat::Protobuf)?;
//! ```
//!
//! Gzip decompression stays the caller's responsibility.

mod common;
mod logs;
mod metrics;
mod traces;

pub use common::{looks_like_json, DecodeError};

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{LogsData, MetricsData, TracesData};

/// Input format for OTLP decoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// Protocol Buffers binary format
    Protobuf,
    /// JSON format
    Json,
    /// Auto-detect JSON vs protobuf, with fallback decoding
    Auto,
}

impl InputFormat {
    /// Infer input format from Content-Type header.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let content_type = content_type.map(|v| v.trim().to_ascii_lowercase());

        match content_type.as_deref() {
            Some("application/json") | Some("application/otlp+json") => InputFormat::Json,
            Some("application/x-protobuf")
            | Some("application/protobuf")
            | Some("application/otlp") => InputFormat::Protobuf,
            _ => InputFormat::Auto,
        }
    }

    /// Returns the canonical Content-Type string for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            InputFormat::Protobuf => "application/x-protobuf",
            InputFormat::Json => "application/json",
            InputFormat::Auto => "application/x-protobuf", // Default to protobuf
        }
    }
}

/// Decode OTLP metrics from raw bytes.
pub fn decode_metrics(bytes: &[u8], format: InputFormat) -> Result<MetricsData, DecodeError> {
    decode_metrics_with_format(bytes, format).map(|(data, _)| data)
}

/// Decode OTLP metrics, also returning the concrete format the payload
/// decoded as (never `Auto`).
pub fn decode_metrics_with_format(
    bytes: &[u8],
    format: InputFormat,
) -> Result<(MetricsData, InputFormat), DecodeError> {
    decode_request::<ExportMetricsServiceRequest>(bytes, format)
        .map(|(request, used)| (metrics::from_request(request), used))
}

/// Decode OTLP logs from raw bytes.
pub fn decode_logs(bytes: &[u8], format: InputFormat) -> Result<LogsData, DecodeError> {
    decode_logs_with_format(bytes, format).map(|(data, _)| data)
}

/// See [`decode_metrics_with_format`].
pub fn decode_logs_with_format(
    bytes: &[u8],
    format: InputFormat,
) -> Result<(LogsData, InputFormat), DecodeError> {
    decode_request::<ExportLogsServiceRequest>(bytes, format)
        .map(|(request, used)| (logs::from_request(request), used))
}

/// Decode OTLP traces from raw bytes.
pub fn decode_traces(bytes: &[u8], format: InputFormat) -> Result<TracesData, DecodeError> {
    decode_traces_with_format(bytes, format).map(|(data, _)| data)
}

/// See [`decode_metrics_with_format`].
pub fn decode_traces_with_format(
    bytes: &[u8],
    format: InputFormat,
) -> Result<(TracesData, InputFormat), DecodeError> {
    decode_request::<ExportTraceServiceRequest>(bytes, format)
        .map(|(request, used)| (traces::from_request(request), used))
}

/// Encode metrics as an OTLP export request. `Auto` encodes protobuf.
pub fn encode_metrics(data: MetricsData, format: InputFormat) -> Result<Vec<u8>, DecodeError> {
    encode_request(&metrics::to_request(data), format)
}

/// Encode logs as an OTLP export request. `Auto` encodes protobuf.
pub fn encode_logs(data: LogsData, format: InputFormat) -> Result<Vec<u8>, DecodeError> {
    encode_request(&logs::to_request(data), format)
}

/// Encode traces as an OTLP export request. `Auto` encodes protobuf.
pub fn encode_traces(data: TracesData, format: InputFormat) -> Result<Vec<u8>, DecodeError> {
    encode_request(&traces::to_request(data), format)
}

// ============================================================================
// Format dispatch
// ============================================================================

/// Decodes `bytes` and reports which concrete format succeeded.
fn decode_request<M>(bytes: &[u8], format: InputFormat) -> Result<(M, InputFormat), DecodeError>
where
    M: Message + Default + DeserializeOwned,
{
    match format {
        InputFormat::Protobuf => Ok((M::decode(bytes)?, InputFormat::Protobuf)),
        InputFormat::Json => Ok((serde_json::from_slice(bytes)?, InputFormat::Json)),
        InputFormat::Auto => {
            if looks_like_json(bytes) {
                match serde_json::from_slice::<M>(bytes) {
                    Ok(request) => Ok((request, InputFormat::Json)),
                    Err(json_err) => M::decode(bytes)
                        .map(|request| (request, InputFormat::Protobuf))
                        .map_err(|proto_err| {
                            DecodeError::Unsupported(format!(
                                "json decode failed: {json_err}; \
                                 protobuf fallback failed: {proto_err}"
                            ))
                        }),
                }
            } else {
                match M::decode(bytes) {
                    Ok(request) => Ok((request, InputFormat::Protobuf)),
                    Err(proto_err) => serde_json::from_slice::<M>(bytes)
                        .map(|request| (request, InputFormat::Json))
                        .map_err(|json_err| {
                            DecodeError::Unsupported(format!(
                                "protobuf decode failed: {proto_err}; \
                                 json fallback failed: {json_err}"
                            ))
                        }),
                }
            }
        }
    }
}

fn encode_request<M>(request: &M, format: InputFormat) -> Result<Vec<u8>, DecodeError>
where
    M: Message + Serialize,
{
    match format {
        InputFormat::Json => Ok(serde_json::to_vec(request)?),
        InputFormat::Protobuf | InputFormat::Auto => Ok(request.encode_to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        LogRecord, Metric, MetricData, ResourceLogs, ResourceMetrics, ScopeLogs, ScopeMetrics,
        Sum, Value,
    };

    fn logs() -> LogsData {
        LogsData {
            resource_logs: vec![ResourceLogs {
                scope_logs: vec![ScopeLogs {
                    log_records: vec![LogRecord {
                        time_unix_nano: 123,
                        severity_number: 9,
                        body: Value::from("hello"),
                        attributes: [("k", Value::from("v"))].into_iter().collect(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn input_format_from_content_type() {
        assert_eq!(
            InputFormat::from_content_type(Some("application/json")),
            InputFormat::Json
        );
        assert_eq!(
            InputFormat::from_content_type(Some(" Application/X-Protobuf ")),
            InputFormat::Protobuf
        );
        assert_eq!(
            InputFormat::from_content_type(Some("text/plain")),
            InputFormat::Auto
        );
        assert_eq!(InputFormat::from_content_type(None), InputFormat::Auto);
    }

    #[test]
    fn input_format_content_type() {
        assert_eq!(
            InputFormat::Protobuf.content_type(),
            "application/x-protobuf"
        );
        assert_eq!(InputFormat::Json.content_type(), "application/json");
        assert_eq!(InputFormat::Auto.content_type(), "application/x-protobuf");
    }

    #[test]
    fn auto_reports_format_used() {
        let proto = encode_logs(logs(), InputFormat::Protobuf).unwrap();
        let json = encode_logs(logs(), InputFormat::Json).unwrap();
        let (_, used) = decode_logs_with_format(&proto, InputFormat::Auto).unwrap();
        assert_eq!(used, InputFormat::Protobuf);
        let (_, used) = decode_logs_with_format(&json, InputFormat::Auto).unwrap();
        assert_eq!(used, InputFormat::Json);
    }

    #[test]
    fn auto_reports_protobuf_after_json_fallback() {
        // `{` followed by `|` is an empty group on field 15: not JSON, but
        // valid protobuf that decoders skip.
        let mut bytes = vec![b'{', b'|'];
        bytes.extend(encode_logs(logs(), InputFormat::Protobuf).unwrap());
        assert!(looks_like_json(&bytes));
        let (decoded, used) = decode_logs_with_format(&bytes, InputFormat::Auto).unwrap();
        assert_eq!(used, InputFormat::Protobuf);
        assert_eq!(decoded, logs());
    }

    #[test]
    fn protobuf_logs_round_trip() {
        let bytes = encode_logs(logs(), InputFormat::Protobuf).unwrap();
        let decoded = decode_logs(&bytes, InputFormat::Protobuf).unwrap();
        assert_eq!(decoded, logs());
    }

    #[test]
    fn json_logs_round_trip() {
        let bytes = encode_logs(logs(), InputFormat::Json).unwrap();
        assert!(looks_like_json(&bytes));
        let decoded = decode_logs(&bytes, InputFormat::Json).unwrap();
        assert_eq!(decoded, logs());
    }

    #[test]
    fn auto_decodes_both_formats() {
        let proto = encode_logs(logs(), InputFormat::Protobuf).unwrap();
        let json = encode_logs(logs(), InputFormat::Json).unwrap();
        assert_eq!(decode_logs(&proto, InputFormat::Auto).unwrap(), logs());
        assert_eq!(decode_logs(&json, InputFormat::Auto).unwrap(), logs());
    }

    #[test]
    fn auto_reports_both_failures() {
        let err = decode_metrics(b"{not json", InputFormat::Auto).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("json decode failed"));
        assert!(message.contains("protobuf fallback failed"));
    }

    #[test]
    fn metrics_round_trip() {
        let data = MetricsData {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![Metric {
                        name: "requests".to_string(),
                        data: MetricData::Sum(Sum::default()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let bytes = encode_metrics(data.clone(), InputFormat::Auto).unwrap();
        assert_eq!(decode_metrics(&bytes, InputFormat::Protobuf).unwrap(), data);
    }
}
