// A named in-process stream aggregator: receives a publisher's messages and
// fans them out, in order, to every registered consumer.

use std::sync::Mutex;

use crate::rtmp::Message;
use crate::session::Request;

use super::consumer::Consumer;

/// Stream key: `vhost/app/stream`
pub fn source_key(request: &Request) -> String {
    format!("{}/{}/{}", request.vhost, request.app, request.stream)
}

struct SourceState {
    current_publisher_connection_id: Option<u64>,
    consumers: Vec<Consumer>,
}

/// `{ request, current_publisher_connection_id, consumers, lock }`
///
/// Created on first publisher or player reference and never destroyed for
/// the process lifetime (see the open question on source reaping).
pub struct Source {
    pub key: String,
    state: Mutex<SourceState>,
}

impl Source {
    pub fn new(key: String) -> Source {
        Source {
            key,
            state: Mutex::new(SourceState {
                current_publisher_connection_id: None,
                consumers: Vec::new(),
            }),
        }
    }

    pub fn on_publish(&self, connection_id: u64) {
        let mut state = self.state.lock().expect("source lock poisoned");
        state.current_publisher_connection_id = Some(connection_id);
    }

    pub fn on_unpublish(&self, connection_id: u64) {
        let mut state = self.state.lock().expect("source lock poisoned");
        if state.current_publisher_connection_id == Some(connection_id) {
            state.current_publisher_connection_id = None;
        }
    }

    pub fn current_publisher(&self) -> Option<u64> {
        self.state.lock().expect("source lock poisoned").current_publisher_connection_id
    }

    /// Fans `message` out to every consumer, in the insertion order the
    /// consumers were added. A consumer whose egress queue is full simply
    /// drops this message; the others are unaffected (property #4).
    pub fn on_message(&self, message: &Message) {
        let state = self.state.lock().expect("source lock poisoned");
        for consumer in state.consumers.iter() {
            consumer.send(message.clone());
        }
    }

    pub fn create_consumer(&self, consumer: Consumer) {
        let mut state = self.state.lock().expect("source lock poisoned");
        state.consumers.push(consumer);
    }

    pub fn destroy_consumer(&self, connection_id: u64) {
        let mut state = self.state.lock().expect("source lock poisoned");
        state.consumers.retain(|c| c.connection_id != connection_id);
    }

    pub fn consumer_count(&self) -> usize {
        self.state.lock().expect("source lock poisoned").consumers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::RTMP_TYPE_AUDIO;
    use tokio::sync::mpsc::channel;

    fn audio(ts: i64, payload: Vec<u8>) -> Message {
        Message::new(RTMP_TYPE_AUDIO, ts, 1, payload)
    }

    #[tokio::test]
    async fn fans_out_every_message_to_every_consumer_in_order() {
        let source = Source::new("v/live/s".to_string());

        let (tx_a, mut rx_a) = channel(16);
        let (tx_b, mut rx_b) = channel(16);
        source.create_consumer(Consumer::new(1, 10, tx_a));
        source.create_consumer(Consumer::new(2, 20, tx_b));

        source.on_message(&audio(1, vec![1]));
        source.on_message(&audio(2, vec![2]));
        source.on_message(&audio(3, vec![3]));

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await.unwrap().payload, vec![1]);
            assert_eq!(rx.recv().await.unwrap().payload, vec![2]);
            assert_eq!(rx.recv().await.unwrap().payload, vec![3]);
        }
    }

    #[tokio::test]
    async fn rewrites_each_consumer_stream_id_on_delivery() {
        let source = Source::new("v/live/s".to_string());
        let (tx, mut rx) = channel(16);
        source.create_consumer(Consumer::new(1, 42, tx));

        source.on_message(&audio(1, vec![9]));

        assert_eq!(rx.recv().await.unwrap().stream_id, 42);
    }

    #[tokio::test]
    async fn a_full_consumer_queue_does_not_block_delivery_to_others() {
        let source = Source::new("v/live/s".to_string());

        let (tx_full, rx_full) = channel(1);
        let (tx_ok, mut rx_ok) = channel(16);
        source.create_consumer(Consumer::new(1, 1, tx_full));
        source.create_consumer(Consumer::new(2, 2, tx_ok));

        // Fill the first consumer's queue without draining it.
        source.on_message(&audio(1, vec![1]));
        source.on_message(&audio(2, vec![2]));
        source.on_message(&audio(3, vec![3]));

        // The second consumer received all three despite the first being full.
        assert_eq!(rx_ok.recv().await.unwrap().payload, vec![1]);
        assert_eq!(rx_ok.recv().await.unwrap().payload, vec![2]);
        assert_eq!(rx_ok.recv().await.unwrap().payload, vec![3]);

        drop(rx_full);
    }

    #[tokio::test]
    async fn destroy_consumer_removes_it_from_future_fan_out() {
        let source = Source::new("v/live/s".to_string());
        let (tx, mut rx) = channel(16);
        source.create_consumer(Consumer::new(1, 1, tx));

        source.destroy_consumer(1);
        source.on_message(&audio(1, vec![1]));

        assert_eq!(source.consumer_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_and_unpublish_track_the_current_publisher() {
        let source = Source::new("v/live/s".to_string());
        assert_eq!(source.current_publisher(), None);

        source.on_publish(7);
        assert_eq!(source.current_publisher(), Some(7));

        source.on_unpublish(7);
        assert_eq!(source.current_publisher(), None);
    }

    #[test]
    fn unpublish_from_a_stale_connection_id_is_a_no_op() {
        let source = Source::new("v/live/s".to_string());
        source.on_publish(7);
        source.on_unpublish(8);
        assert_eq!(source.current_publisher(), Some(7));
    }
}
