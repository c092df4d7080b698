//! Sink backed by an unbounded tokio channel

use super::Sink;
use stackwatch_core::EventRecord;
use tokio::sync::mpsc;
use tracing::debug;

/// Forwards records into an mpsc channel.
///
/// A closed receiver drops the record; senders never block.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EventRecord>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<EventRecord>) -> Self {
        Self { tx }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Sink for ChannelSink {
    fn transmit(&self, record: EventRecord) {
        if self.tx.send(record).is_err() {
            debug!("Channel sink receiver dropped; record discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_receiver_is_silent() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(sink.is_closed());
        sink.transmit(EventRecord::new());
    }
}
