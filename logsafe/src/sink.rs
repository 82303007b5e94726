//! Where sanitized records go.
//!
//! The sink is the seam to the host's logging setup. The default
//! [`TracingSink`] writes one info line per record via `tracing`; anything
//! fancier (structured shipping, per-route filtering) implements
//! [`RecordSink`] instead.

use tracing::info;

use crate::record::HttpLogRecord;

/// Which side of the transaction a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Request,
    Response,
}

impl RecordKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Request => "REQUEST DATA",
            RecordKind::Response => "RESPONSE DATA",
        }
    }
}

/// Receives each sanitized record, synchronously, on the request's own
/// worker. Implementations must not panic; a slow sink slows the request.
pub trait RecordSink: Send + Sync + 'static {
    fn emit(&self, kind: RecordKind, handler: &str, record: &HttpLogRecord);
}

/// Default sink: one `tracing` info line per record, prefixed
/// `REQUEST DATA:` / `RESPONSE DATA:`, tagged with the resolved handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn emit(&self, kind: RecordKind, handler: &str, record: &HttpLogRecord) {
        info!(target: "logsafe", handler, "{}: {}", kind.prefix(), record);
    }
}
