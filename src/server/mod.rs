// RTMP server

mod config;
mod connection_id;
mod tcp;

use std::sync::Arc;

pub use config::*;
pub use connection_id::*;
pub use tcp::*;

use crate::log::Logger;
use crate::source::SourceRegistry;

/// Runs the RTMP server: binds the TCP listener and serves connections
/// until the listener itself fails.
pub async fn run_server(logger: Logger, config: Arc<RtmpServerConfiguration>, registry: Arc<SourceRegistry>) {
    let connection_ids = Arc::new(ConnectionIdGenerator::new());

    let (end_notifier, mut end_receiver) = tokio::sync::mpsc::channel::<()>(1);

    tcp_server(
        Arc::new(logger.make_child_logger("[SERVER:TCP] ")),
        config,
        registry,
        connection_ids,
        end_notifier,
    );

    end_receiver.recv().await.expect("could not receive signal from TCP server task");
}
