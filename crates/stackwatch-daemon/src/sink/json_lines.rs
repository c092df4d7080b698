//! Sink writing one JSON object per line

use super::Sink;
use stackwatch_core::EventRecord;
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

/// Writes each record as a single JSON line to `W`.
///
/// Write failures are logged and the record is dropped.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send + std::fmt::Debug> Sink for JsonLinesSink<W> {
    fn transmit(&self, record: EventRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode event record: {}", e);
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!("Failed to write event record: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_one_line_per_record_in_order() {
        let sink = JsonLinesSink::new(Vec::new());
        for id in ["e1", "e2"] {
            let mut record = EventRecord::new();
            record.insert("EventId".to_string(), json!(id));
            record.insert("ResourceStatus".to_string(), json!("CREATE_COMPLETE"));
            sink.transmit(record);
        }

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "{\"EventId\":\"e1\",\"ResourceStatus\":\"CREATE_COMPLETE\"}\n\
             {\"EventId\":\"e2\",\"ResourceStatus\":\"CREATE_COMPLETE\"}\n"
        );
    }
}
