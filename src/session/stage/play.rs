use std::sync::Arc;

use crate::error::RtmpError;
use crate::rtmp::{self, Message, Packet};
use crate::source::{Consumer, Source};

use super::{Stage, StageContext, StageOutcome};

/// Handles the `play` command: raises the chunk size, looks up/creates the
/// Source, emits the standard start-of-play status sequence, and registers
/// a consumer.
pub struct PlayStage;

impl PlayStage {
    pub fn new() -> PlayStage {
        PlayStage
    }
}

impl Default for PlayStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for PlayStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        let Packet::Play { stream_name, .. } = packet else {
            return Ok(StageOutcome::Final);
        };

        ctx.request.stream = stream_name;

        ctx.send(Packet::SetChunkSize {
            chunk_size: rtmp::RTMP_SERVING_CHUNK_SIZE as u32,
        });

        let source = ctx.registry.find_or_create(&ctx.request);

        ctx.send(Packet::UserControl {
            event_type: rtmp::STREAM_BEGIN,
            payload: (ctx.stream_id as u32).to_be_bytes().to_vec(),
        });
        ctx.send(rtmp::make_on_status("NetStream.Play.Reset", "Playing and resetting stream", false));
        ctx.send(rtmp::make_on_status("NetStream.Play.Start", "Started playing stream", false));
        ctx.send(Packet::SampleAccess { video: true, audio: true });
        ctx.send(rtmp::make_on_status("NetStream.Data.Start", "Started playing stream", true));

        let consumer = Consumer::new(ctx.connection_id, ctx.stream_id, ctx.egress.clone());
        source.create_consumer(consumer);

        Ok(StageOutcome::Transition(Box::new(PlayingStage::new(source))))
    }
}

/// Players do not upload; every ingress message is dropped. The Source
/// feeds this connection's egress queue directly via the Consumer handle.
pub struct PlayingStage {
    source: Arc<Source>,
}

impl PlayingStage {
    pub fn new(source: Arc<Source>) -> PlayingStage {
        PlayingStage { source }
    }
}

impl Stage for PlayingStage {
    fn consume(&mut self, _ctx: &mut StageContext, _message: Message) -> Result<StageOutcome, RtmpError> {
        Ok(StageOutcome::Continue)
    }

    fn on_teardown(&mut self, ctx: &mut StageContext) {
        self.source.destroy_consumer(ctx.connection_id);
    }
}
