// A player connection's handle into a source's fan-out set

use tokio::sync::mpsc::Sender;

use crate::rtmp::Message;

/// A weak back-reference from a playing connection into a source's
/// consumer set. Holds the egress-queue sender the source uses to
/// deliver fanned-out messages; never blocks (see `send`).
pub struct Consumer {
    pub connection_id: u64,
    pub stream_id: i32,
    sender: Sender<Message>,
}

impl Consumer {
    pub fn new(connection_id: u64, stream_id: i32, sender: Sender<Message>) -> Consumer {
        Consumer {
            connection_id,
            stream_id,
            sender,
        }
    }

    /// Delivers a message to this consumer's egress queue. Drops the
    /// message (instead of blocking) when the queue is full, per the
    /// backpressure policy: a single slow consumer must not stall others.
    pub fn send(&self, mut message: Message) -> bool {
        message.stream_id = self.stream_id;
        self.sender.try_send(message).is_ok()
    }
}
