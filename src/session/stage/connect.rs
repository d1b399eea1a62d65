use crate::error::RtmpError;
use crate::rtmp::{self, Message, Packet};
use crate::session::request::discover_tc_url;

use super::identify::IdentifyStage;
use super::{Stage, StageContext, StageOutcome};

/// Accepts only the `connect` command. Parses the tc_url, validates it,
/// sends the window-ack/peer-bandwidth/`_result`/`onBWDone` quadruplet from
/// §6, then hands off to `IdentifyStage`.
pub struct ConnectStage;

impl ConnectStage {
    pub fn new() -> ConnectStage {
        ConnectStage
    }
}

impl Default for ConnectStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ConnectStage {
    fn consume(&mut self, ctx: &mut StageContext, message: Message) -> Result<StageOutcome, RtmpError> {
        let packet = match Packet::decode(&message)? {
            Some(p) => p,
            None => return Ok(StageOutcome::Continue),
        };

        let Packet::Connect {
            command_object,
            arguments,
            ..
        } = packet
        else {
            return Ok(StageOutcome::Final);
        };

        let tc_url = command_object
            .get("tcUrl")
            .map(|v| v.get_string().to_string())
            .unwrap_or_default();

        let (schema, host, vhost, app, port, param) = discover_tc_url(&tc_url)?;

        ctx.request.tc_url = tc_url;
        ctx.request.schema = schema;
        ctx.request.host = host.clone();
        ctx.request.vhost = vhost;
        ctx.request.app = app;
        ctx.request.port = port;
        ctx.request.param = param;
        ctx.request.object_encoding = command_object.get("objectEncoding").map(|v| v.get_float()).unwrap_or(0.0);
        ctx.request.page_url = command_object.get("pageUrl").map(|v| v.get_string().to_string()).unwrap_or_default();
        ctx.request.swf_url = command_object.get("swfUrl").map(|v| v.get_string().to_string()).unwrap_or_default();
        ctx.request.args = arguments;

        ctx.request.validate()?;

        ctx.send(Packet::SetWindowAckSize {
            ack_window_size: rtmp::RTMP_DEFAULT_WINDOW_ACK_SIZE,
        });
        ctx.send(Packet::SetPeerBandwidth {
            ack_window_size: rtmp::RTMP_DEFAULT_WINDOW_ACK_SIZE,
            bandwidth_type: rtmp::RTMP_DEFAULT_PEER_BANDWIDTH_TYPE,
        });
        ctx.send(rtmp::make_connect_response(&command_object, ctx.connection_id));
        ctx.send(Packet::OnBWDone);

        Ok(StageOutcome::Transition(Box::new(IdentifyStage::new())))
    }
}
