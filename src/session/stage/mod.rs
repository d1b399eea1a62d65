// The per-connection state machine: connect -> identify -> (play |
// fmle-publish | flash-publish) -> serving.
//
// Grounded on `examples/original_source/rtmp/stage.go` (cittu/go-srs):
// stages there are interfaces implementing `ConsumeMessage(msg) (err error)`
// with a sentinel error ending the loop. Generalized here into a `Stage`
// trait returning a `StageOutcome`, whose `Final` variant ends the serving
// loop directly, so a stage can both mutate shared context and hand control
// to the next stage explicitly.

mod connect;
mod identify;
mod play;
mod publish;

pub use connect::ConnectStage;
pub use identify::{IdentifyCreateStreamStage, IdentifyStage};
pub use play::{PlayStage, PlayingStage};
pub use publish::{FMLEPublishStage, FMLEPublishStartStage, FMLEPublishingStage, FlashPublishStage};

use std::sync::Arc;

use tokio::sync::mpsc::Sender;

use crate::error::RtmpError;
use crate::log::Logger;
use crate::rtmp::{Message, Packet};
use crate::source::SourceRegistry;

use super::request::Request;

/// Context shared across the stage chain for one connection. Owned
/// exclusively by the serving task; no lock needed.
pub struct StageContext {
    pub connection_id: u64,
    pub logger: Arc<Logger>,
    pub registry: Arc<SourceRegistry>,
    pub egress: Sender<Message>,
    pub request: Request,
    pub stream_id: i32,
}

impl StageContext {
    /// Enqueues a packet addressed to the connection's current stream id
    pub fn send(&self, packet: Packet) {
        let message = packet.encode(self.stream_id);
        let _ = self.egress.try_send(message);
    }

    pub fn next_stream_id(&mut self) -> i32 {
        self.stream_id += 1;
        self.stream_id
    }
}

/// What a stage wants to happen after consuming one message
pub enum StageOutcome {
    /// Stay on the current stage object
    Continue,
    /// Move to a new stage
    Transition(Box<dyn Stage>),
    /// Move to a new stage and immediately hand it the same message again
    /// (used when a stage transition is triggered by a command the next
    /// stage itself needs to parse, e.g. `play` reaching `IdentifyStage`)
    TransitionAndReplay(Box<dyn Stage>),
    /// Republish control signal: not an error, re-enters Identify
    Republish,
    /// Ends the serving loop cleanly
    Final,
}

/// A state in the per-connection control flow
pub trait Stage: Send {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError>;

    /// Called once when this connection's serving loop ends while this
    /// stage is active (teardown hook — e.g. unregistering a consumer)
    fn on_teardown(&mut self, _ctx: &mut StageContext) {}
}
