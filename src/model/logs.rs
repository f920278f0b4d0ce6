use super::{AttributeMap, InstrumentationScope, Resource, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogsData {
    pub resource_logs: Vec<ResourceLogs>,
}

impl LogsData {
    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.resource_logs
            .iter()
            .flat_map(|rl| &rl.scope_logs)
            .flat_map(|sl| &sl.log_records)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceLogs {
    pub resource: Resource,
    pub scope_logs: Vec<ScopeLogs>,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeLogs {
    pub scope: InstrumentationScope,
    pub log_records: Vec<LogRecord>,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogRecord {
    pub time_unix_nano: u64,
    pub observed_time_unix_nano: u64,
    pub severity_number: i32,
    pub severity_text: String,
    pub body: Value,
    pub attributes: AttributeMap,
    pub dropped_attributes_count: u32,
    pub flags: u32,
    pub trace_id: Vec<u8>,
    pub span_id: Vec<u8>,
}
