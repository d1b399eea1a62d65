use crate::error::RtmpError;
use crate::rtmp::{Message, Packet};

use super::play::PlayStage;
use super::publish::FMLEPublishStage;
use super::{Stage, StageContext, StageOutcome};

/// Waits for the client to say what it wants to do with the connection:
/// play a stream, or publish one (FMLE or Flash dialect).
pub struct IdentifyStage;

impl IdentifyStage {
    pub fn new() -> IdentifyStage {
        IdentifyStage
    }
}

impl Default for IdentifyStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for IdentifyStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        if message.is_user_control() || !message.is_command() {
            return Ok(StageOutcome::Continue);
        }

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
                Ok(StageOutcome::Transition(Box::new(IdentifyCreateStreamStage::new())))
            }
            Packet::Play { .. } => Ok(StageOutcome::TransitionAndReplay(Box::new(PlayStage::new()))),
            Packet::ReleaseStream { transaction_id, .. } => {
                ctx.send(Packet::Call {
                    command_name: "_result".to_string(),
                    transaction_id,
                    arguments: vec![],
                });
                Ok(StageOutcome::Transition(Box::new(FMLEPublishStage::new())))
            }
            Packet::Call { transaction_id, .. } => {
                ctx.send(Packet::Call {
                    command_name: "_result".to_string(),
                    transaction_id,
                    arguments: vec![],
                });
                Ok(StageOutcome::Continue)
            }
            _ => Ok(StageOutcome::Final),
        }
    }
}

/// Entered right after `createStream`'s response is sent; waits for the
/// client to pick `play` or `publish` on the new stream.
pub struct IdentifyCreateStreamStage;

impl IdentifyCreateStreamStage {
    pub fn new() -> IdentifyCreateStreamStage {
        IdentifyCreateStreamStage
    }
}

impl Default for IdentifyCreateStreamStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for IdentifyCreateStreamStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        if message.is_user_control() || !message.is_command() {
            return Ok(StageOutcome::Continue);
        }

        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        match packet {
            Packet::Play { .. } => Ok(StageOutcome::TransitionAndReplay(Box::new(PlayStage::new()))),
            Packet::Publish { .. } => Ok(StageOutcome::TransitionAndReplay(Box::new(
                super::publish::FlashPublishStage::new(),
            ))),
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
