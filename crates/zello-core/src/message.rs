//! Zello control and audio message model.
//!
//! Control messages are JSON text frames discriminated by `command`.
//! Audio travels as binary frames: a type byte, the stream id in
//! big-endian, four reserved bytes, then the raw Opus payload.

use serde::{Deserialize, Serialize};

/// Binary frame type byte for audio.
pub const AUDIO_FRAME_TYPE: u8 = 0x01;

/// Length of the binary audio frame header.
pub const AUDIO_HEADER_LEN: usize = 9;

/// Outbound logon request.
#[derive(Debug, Serialize)]
pub struct LogonRequest<'a> {
    pub command: &'static str,
    pub seq: u64,
    pub auth_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
    pub username: &'a str,
    pub password: &'a str,
    pub channel: &'a str,
}

/// Outbound stream start request.
#[derive(Debug, Serialize)]
pub struct StartStreamRequest<'a> {
    pub command: &'static str,
    pub seq: u64,
    pub channel: &'a str,
    #[serde(rename = "type")]
    pub stream_type: &'static str,
    pub codec: &'static str,
    pub codec_header: String,
    pub packet_duration: u32,
}

/// Outbound stream stop request.
#[derive(Debug, Serialize)]
pub struct StopStreamRequest {
    pub command: &'static str,
    pub seq: u64,
    pub stream_id: u32,
}

/// Outbound channel text message, used as the keep-alive ping.
#[derive(Debug, Serialize)]
pub struct SendTextMessage<'a> {
    pub command: &'static str,
    pub seq: u64,
    pub channel: &'a str,
    pub text: &'a str,
    #[serde(rename = "for")]
    pub for_user: &'a str,
}

/// Any inbound JSON frame. Zello responses and events share one loose
/// shape, so unknown fields are simply absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMessage {
    pub command: Option<String>,
    pub seq: Option<u64>,
    pub stream_id: Option<u32>,
    pub from: Option<String>,
    pub codec_header: Option<String>,
    pub refresh_token: Option<String>,
    pub success: Option<bool>,
    pub error: Option<String>,
    pub text: Option<String>,
}

impl ServerMessage {
    /// Parse an inbound text frame.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// True when this frame carries the given command.
    pub fn is_command(&self, command: &str) -> bool {
        self.command.as_deref() == Some(command)
    }
}

/// Build an outbound binary audio frame around an Opus payload.
pub fn encode_audio_frame(stream_id: u32, opus: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(AUDIO_HEADER_LEN + opus.len());
    frame.push(AUDIO_FRAME_TYPE);
    frame.extend_from_slice(&stream_id.to_be_bytes());
    frame.extend_from_slice(&[0u8; 4]);
    frame.extend_from_slice(opus);
    frame
}

/// Split an inbound binary frame into stream id and Opus payload.
///
/// Returns `None` for frames that are not audio.
pub fn decode_audio_frame(frame: &[u8]) -> Option<(u32, &[u8])> {
    if frame.len() < AUDIO_HEADER_LEN || frame[0] != AUDIO_FRAME_TYPE {
        return None;
    }
    let stream_id = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
    Some((stream_id, &frame[AUDIO_HEADER_LEN..]))
}

/// Parse the destination RID out of an `on_alert` page command.
///
/// The text is either `"page <rid>"` or `"page<rid>"`.
pub fn parse_page_command(text: &str) -> Option<u32> {
    let rest = text.strip_prefix("page")?;
    rest.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logon_serializes_null_auth_token() {
        let logon = LogonRequest {
            command: "logon",
            seq: 1,
            auth_token: None,
            refresh_token: Some("rt"),
            username: "user",
            password: "pass",
            channel: "chan",
        };
        let json = serde_json::to_value(&logon).unwrap();
        assert_eq!(json["command"], "logon");
        assert!(json["auth_token"].is_null());
        assert_eq!(json["refresh_token"], "rt");
    }

    #[test]
    fn test_logon_omits_absent_refresh_token() {
        let logon = LogonRequest {
            command: "logon",
            seq: 1,
            auth_token: Some("tok"),
            refresh_token: None,
            username: "user",
            password: "pass",
            channel: "chan",
        };
        let json = serde_json::to_value(&logon).unwrap();
        assert_eq!(json["auth_token"], "tok");
        assert!(json.get("refresh_token").is_none());
    }

    #[test]
    fn test_start_stream_shape() {
        let start = StartStreamRequest {
            command: "start_stream",
            seq: 2,
            channel: "chan",
            stream_type: "audio",
            codec: "opus",
            codec_header: "gD4BPA==".to_string(),
            packet_duration: 60,
        };
        let json = serde_json::to_value(&start).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["codec"], "opus");
        assert_eq!(json["packet_duration"], 60);
    }

    #[test]
    fn test_server_message_parse() {
        let msg = ServerMessage::parse(
            r#"{"command":"on_channel_status","channel":"x","refresh_token":"abc"}"#,
        )
        .unwrap();
        assert!(msg.is_command("on_channel_status"));
        assert_eq!(msg.refresh_token.as_deref(), Some("abc"));

        let reply = ServerMessage::parse(r#"{"seq":3,"success":true,"stream_id":42}"#).unwrap();
        assert_eq!(reply.stream_id, Some(42));
        assert_eq!(reply.success, Some(true));
        assert!(reply.command.is_none());
    }

    #[test]
    fn test_audio_frame_roundtrip() {
        let frame = encode_audio_frame(0x2a, &[0xde, 0xad]);
        assert_eq!(frame[0], AUDIO_FRAME_TYPE);
        assert_eq!(&frame[1..5], &[0x00, 0x00, 0x00, 0x2a]);
        assert_eq!(&frame[5..9], &[0u8; 4]);

        let (sid, payload) = decode_audio_frame(&frame).unwrap();
        assert_eq!(sid, 0x2a);
        assert_eq!(payload, &[0xde, 0xad]);
    }

    #[test]
    fn test_non_audio_frame_ignored() {
        assert!(decode_audio_frame(&[0x02, 0, 0, 0, 1, 0, 0, 0, 0, 9]).is_none());
        assert!(decode_audio_frame(&[0x01, 0, 0]).is_none());
    }

    #[test]
    fn test_parse_page_command_variants() {
        assert_eq!(parse_page_command("page 9001"), Some(9001));
        assert_eq!(parse_page_command("page9001"), Some(9001));
        assert_eq!(parse_page_command("page  77 "), Some(77));
        assert_eq!(parse_page_command("hello"), None);
        assert_eq!(parse_page_command("page abc"), None);
    }
}
