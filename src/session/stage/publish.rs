use std::sync::Arc;

use crate::error::RtmpError;
use crate::rtmp::{self, Message, Packet};
use crate::source::Source;

use super::{Stage, StageContext, StageOutcome};

/// FMLE publish sub-dialog, first leg: waits for `FCPublish`.
pub struct FMLEPublishStage;

impl FMLEPublishStage {
    pub fn new() -> FMLEPublishStage {
        FMLEPublishStage
    }
}

impl Default for FMLEPublishStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for FMLEPublishStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        match packet {
            Packet::FCPublish { transaction_id, .. } => {
                ctx.send(Packet::Call {
                    command_name: "_result".to_string(),
                    transaction_id,
                    arguments: vec![],
                });
                Ok(StageOutcome::Transition(Box::new(FMLEPublishStartStage::new())))
            }
            Packet::CreateStream { transaction_id } => {
                let stream_id = ctx.next_stream_id();
                ctx.send(Packet::CreateStreamResponse {
                    transaction_id,
                    stream_id: stream_id as f64,
                });
                Ok(StageOutcome::Continue)
            }
            _ => Ok(StageOutcome::Final),
        }
    }
}

/// FMLE publish sub-dialog, second leg: waits for `publish` (or another
/// `createStream`, which FMLE issues before `publish`).
pub struct FMLEPublishStartStage;

impl FMLEPublishStartStage {
    pub fn new() -> FMLEPublishStartStage {
        FMLEPublishStartStage
    }
}

impl Default for FMLEPublishStartStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for FMLEPublishStartStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        match packet {
            Packet::CreateStream { transaction_id } => {
                let stream_id = ctx.next_stream_id();
                ctx.send(Packet::CreateStreamResponse {
                    transaction_id,
                    stream_id: stream_id as f64,
                });
                Ok(StageOutcome::Continue)
            }
            Packet::Publish { stream_name, .. } => {
                ctx.request.stream = stream_name;
                let source = ctx.registry.find_or_create(&ctx.request);
                source.on_publish(ctx.connection_id);

                ctx.send(Packet::Call {
                    command_name: "onFCPublish".to_string(),
                    transaction_id: 0.0,
                    arguments: vec![],
                });
                ctx.send(rtmp::make_on_status("NetStream.Publish.Start", "Started publishing stream", false));

                Ok(StageOutcome::Transition(Box::new(FMLEPublishingStage::new(source))))
            }
            _ => Ok(StageOutcome::Final),
        }
    }
}

/// Active publishing state, reached from either the FMLE dialog or a
/// direct Flash `publish`. Audio/video/data are handed to the Source;
/// `FCUnpublish` is a control signal, not an error.
pub struct FMLEPublishingStage {
    source: Arc<Source>,
}

impl FMLEPublishingStage {
    pub fn new(source: Arc<Source>) -> FMLEPublishingStage {
        FMLEPublishingStage { source }
    }
}

impl Stage for FMLEPublishingStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        if message.is_media() {
            self.source.on_message(&message);
            return Ok(StageOutcome::Continue);
        }

        if !message.is_command() {
            return Ok(StageOutcome::Continue);
        }

        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        match packet {
            Packet::FCUnpublish { .. } => Ok(StageOutcome::Republish),
            _ => {
                ctx.logger.log_debug("dropping unexpected command while publishing");
                Ok(StageOutcome::Continue)
            }
        }
    }

    fn on_teardown(&mut self, ctx: &mut StageContext) {
        self.source.on_unpublish(ctx.connection_id);
    }
}

/// Direct Flash publish dialog: same chunk-size bump as FMLE, keyed on a
/// bare `publish` with no `FCPublish`/`releaseStream` dance first.
pub struct FlashPublishStage;

impl FlashPublishStage {
    pub fn new() -> FlashPublishStage {
        FlashPublishStage
    }
}

impl Default for FlashPublishStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for FlashPublishStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        let Packet::Publish { stream_name, .. } = packet else {
            return Ok(StageOutcome::Final);
        };

        ctx.request.stream = stream_name;

        ctx.send(Packet::SetChunkSize {
            chunk_size: rtmp::RTMP_SERVING_CHUNK_SIZE as u32,
        });

        let source = ctx.registry.find_or_create(&ctx.request);
        source.on_publish(ctx.connection_id);

        ctx.send(Packet::Call {
            command_name: "onFCPublish".to_string(),
            transaction_id: 0.0,
            arguments: vec![],
        });
        ctx.send(rtmp::make_on_status("NetStream.Publish.Start", "Started publishing stream", false));

        Ok(StageOutcome::Transition(Box::new(FMLEPublishingStage::new(source))))
    }
}
