// The three cooperating tasks per connection: ingress pump, egress pump,
// stage driver (serving loop). The queues are the only channel between
// them; each owns the protocol-state fields it is the sole writer of.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};

use crate::log::Logger;
use crate::rtmp::{self, handshake::perform_handshake, write_message, ChunkDecoder, Message};
use crate::server::RtmpServerConfiguration;
use crate::source::SourceRegistry;

use super::request::Request;
use super::stage::{ConnectStage, IdentifyStage, Stage, StageContext, StageOutcome};

/// Single cancellation primitive watched by all three tasks, replacing the
/// quit-channel/flag/lock three-way dance: a flag makes late queue sends
/// fall through to drop, and `notify_one` wakes a task blocked mid-I/O.
struct QuitSignal {
    quited: AtomicBool,
    notify: Notify,
}

impl QuitSignal {
    fn new() -> QuitSignal {
        QuitSignal {
            quited: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    fn signal(&self) {
        self.quited.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_quited(&self) -> bool {
        self.quited.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if self.is_quited() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Drives one accepted TCP connection to completion: handshake, then the
/// ingress/egress/serving task trio, until the stage machine reaches
/// `Final` or the socket fails.
pub async fn run_connection<S>(
    mut socket: S,
    connection_id: u64,
    config: Arc<RtmpServerConfiguration>,
    registry: Arc<SourceRegistry>,
    logger: Arc<Logger>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if let Err(e) = perform_handshake(&mut socket).await {
        logger.log_warning(&format!("handshake failed: {e}"));
        return;
    }

    let (reader, writer) = split(socket);

    let queue_capacity = config.queue_capacity.max(1);
    let (ingress_tx, mut ingress_rx) = mpsc::channel::<Message>(queue_capacity);
    let (egress_tx, egress_rx) = mpsc::channel::<Message>(queue_capacity);

    let quit = Arc::new(QuitSignal::new());

    let ingress_logger = logger.clone();
    let ingress_quit = quit.clone();
    let ingress_chunk_size = config.chunk_size;
    let ingress_task = tokio::spawn(async move {
        run_ingress(reader, ingress_tx, ingress_quit, ingress_logger, ingress_chunk_size).await;
    });

    let egress_logger = logger.clone();
    let egress_quit = quit.clone();
    let egress_chunk_size = config.chunk_size;
    let egress_task = tokio::spawn(async move {
        run_egress(writer, egress_rx, egress_quit, egress_logger, egress_chunk_size).await;
    });

    let mut ctx = StageContext {
        connection_id,
        logger: logger.clone(),
        registry,
        egress: egress_tx,
        request: Request::default(),
        stream_id: (rtmp::DEFAULT_SID as i32) - 1,
    };
    let mut stage: Box<dyn Stage> = Box::new(ConnectStage::new());

    loop {
        tokio::select! {
            _ = quit.wait() => break,
            maybe_message = ingress_rx.recv() => {
                match maybe_message {
                    None => break,
                    Some(message) => {
                        if !drive_message(&mut stage, &mut ctx, message, &logger) {
                            break;
                        }
                    }
                }
            }
        }
    }

    stage.on_teardown(&mut ctx);
    quit.signal();

    let _ = ingress_task.await;
    let _ = egress_task.await;
}

/// Feeds one ingress message through the current stage, applying any
/// transition it requests. Returns false when the serving loop should end.
fn drive_message(stage: &mut Box<dyn Stage>, ctx: &mut StageContext, mut message: Message, logger: &Logger) -> bool {
    loop {
        let outcome = match stage.consume(ctx, message.clone()) {
            Ok(o) => o,
            Err(e) => {
                logger.log_warning(&format!("connection ending: {e}"));
                return false;
            }
        };

        match outcome {
            StageOutcome::Continue => return true,
            StageOutcome::Transition(next) => {
                stage.on_teardown(ctx);
                *stage = next;
                return true;
            }
            StageOutcome::TransitionAndReplay(next) => {
                stage.on_teardown(ctx);
                *stage = next;
                // loop again, replaying the same message against the new stage
            }
            StageOutcome::Republish => {
                stage.on_teardown(ctx);
                *stage = Box::new(IdentifyStage::new());
                return true;
            }
            StageOutcome::Final => return false,
        }

        message = message.clone();
    }
}

async fn run_ingress<R>(
    mut reader: R,
    ingress_tx: mpsc::Sender<Message>,
    quit: Arc<QuitSignal>,
    logger: Arc<Logger>,
    initial_chunk_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut decoder = ChunkDecoder::new();
    decoder.set_chunk_size(initial_chunk_size);
    let mut in_ack_window: u32 = 0;
    let mut in_acked_bytes: u64 = 0;

    loop {
        let read_fut = decoder.read_message(&mut reader);
        tokio::pin!(read_fut);

        tokio::select! {
            _ = quit.wait() => break,
            result = &mut read_fut => {
                match result {
                    Ok(message) => {
                        if !apply_protocol_control(&message, &mut decoder, &mut in_ack_window, &mut in_acked_bytes, &logger) {
                            if ingress_tx.try_send(message).is_err() {
                                logger.log_warning("ingress queue full, dropping message");
                            }
                        }
                    }
                    Err(e) => {
                        logger.log_warning(&format!("ingress read failed: {e}"));
                        break;
                    }
                }
            }
        }
    }

    quit.signal();
}

/// Handles the four protocol-control message types in-line, per §4.2.
/// Returns true if the message was consumed here and must not be forwarded.
fn apply_protocol_control(
    message: &Message,
    decoder: &mut ChunkDecoder,
    in_ack_window: &mut u32,
    in_acked_bytes: &mut u64,
    logger: &Logger,
) -> bool {
    match message.message_type {
        rtmp::RTMP_TYPE_SET_CHUNK_SIZE => {
            if message.payload.len() >= 4 {
                let size = u32::from_be_bytes(message.payload[0..4].try_into().unwrap()) as usize;
                if !(rtmp::RTMP_MIN_CHUNK_SIZE..=rtmp::RTMP_MAX_CHUNK_SIZE).contains(&size) {
                    logger.log_warning(&format!("peer requested out-of-range chunk size {size}"));
                }
                decoder.set_chunk_size(size);
            }
            true
        }
        rtmp::RTMP_TYPE_WINDOW_ACK_SIZE => {
            if message.payload.len() >= 4 {
                *in_ack_window = u32::from_be_bytes(message.payload[0..4].try_into().unwrap());
            }
            true
        }
        rtmp::RTMP_TYPE_ACKNOWLEDGEMENT => {
            if message.payload.len() >= 4 {
                *in_acked_bytes = u32::from_be_bytes(message.payload[0..4].try_into().unwrap()) as u64;
            }
            true
        }
        rtmp::RTMP_TYPE_SET_PEER_BANDWIDTH => true,
        _ => false,
    }
}

async fn run_egress<W>(
    mut writer: W,
    mut egress_rx: mpsc::Receiver<Message>,
    quit: Arc<QuitSignal>,
    logger: Arc<Logger>,
    initial_chunk_size: usize,
) where
    W: AsyncWrite + Unpin,
{
    let mut out_chunk_size = initial_chunk_size;

    loop {
        tokio::select! {
            _ = quit.wait() => break,
            maybe_message = egress_rx.recv() => {
                match maybe_message {
                    None => break,
                    Some(message) => {
                        if message.message_type == rtmp::RTMP_TYPE_SET_CHUNK_SIZE && message.payload.len() >= 4 {
                            out_chunk_size = u32::from_be_bytes(message.payload[0..4].try_into().unwrap()) as usize;
                        }

                        if let Err(e) = write_message(&mut writer, &message, out_chunk_size).await {
                            logger.log_warning(&format!("egress write failed: {e}"));
                            break;
                        }
                    }
                }
            }
        }
    }

    let _ = writer.shutdown().await;
    quit.signal();
}
