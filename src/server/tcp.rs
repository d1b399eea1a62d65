// TCP server

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::Sender;

use crate::log::Logger;
use crate::session::run_connection;
use crate::source::SourceRegistry;

use super::{ConnectionIdGenerator, RtmpServerConfiguration};

/// Run the TCP server
pub fn tcp_server(
    logger: Arc<Logger>,
    config: Arc<RtmpServerConfiguration>,
    registry: Arc<SourceRegistry>,
    connection_ids: Arc<ConnectionIdGenerator>,
    end_notifier: Sender<()>,
) {
    tokio::spawn(async move {
        let listen_addr = config.get_tcp_listen_addr();

        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                logger.log_error(&format!("Could not create TCP listener: {e}"));
                end_notifier.send(()).await.expect("failed to notify to main thread");
                return;
            }
        };

        logger.log_info(&format!("Listening on {listen_addr}"));

        loop {
            match listener.accept().await {
                Ok((connection, addr)) => {
                    if config.log_requests {
                        logger.log_info(&format!("Accepted connection from {}", addr.ip()));
                    }
                    handle_connection_tcp(connection, config.clone(), registry.clone(), connection_ids.clone(), logger.clone());
                }
                Err(e) => {
                    logger.log_error(&format!("Could not accept connection: {e}"));
                    end_notifier.send(()).await.expect("failed to notify to main thread");
                    return;
                }
            }
        }
    });
}

fn handle_connection_tcp(
    connection: TcpStream,
    config: Arc<RtmpServerConfiguration>,
    registry: Arc<SourceRegistry>,
    connection_ids: Arc<ConnectionIdGenerator>,
    logger: Arc<Logger>,
) {
    tokio::spawn(async move {
        let connection_id = connection_ids.next();
        run_connection(connection, connection_id, config, registry, logger).await;
    });
}
