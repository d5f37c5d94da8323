//! The Zello WebSocket session.
//!
//! One session owns one socket. A single receive task is the only reader;
//! it decodes inbound audio to 8 kHz PCM and surfaces control traffic as
//! [`SessionEvent`]s. Outbound traffic (JSON, audio, pings) serializes
//! through a single sink guarded by a mutex, with a strictly monotonic
//! `seq` stamped on every JSON frame.
//!
//! Reconnection runs in one driver task. The receive loop never calls
//! back into connect; on exit it signals the driver and returns. The
//! driver makes a bounded number of attempts and then sets a sticky
//! stop flag that short-circuits every later attempt until it is
//! explicitly reset.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use zellolink_codec_core::{resample, OpusDecoder, OpusEncoder};

use crate::codec_header::{outbound_header, CodecAttributes};
use crate::error::{Result, ZelloError};
use crate::jwt::create_jwt;
use crate::message::{
    decode_audio_frame, encode_audio_frame, parse_page_command, LogonRequest, SendTextMessage,
    ServerMessage, StartStreamRequest, StopStreamRequest,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Outbound sample rate on the Zello leg.
const TX_SAMPLE_RATE: u32 = 16000;

/// Samples per outbound Opus packet: 60 ms at 16 kHz.
const TX_BLOCK_SAMPLES: usize = 960;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingLogon,
    Authenticated,
    Reconnecting,
}

/// Events surfaced to the bridge.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One packet worth of 8 kHz PCM from the channel.
    Pcm { samples: Vec<i16>, from: Option<String> },
    /// The inbound stream ended.
    StreamEnd,
    /// A channel alert requested a radio action, currently only paging.
    RadioCommand { command: String, dst_id: u32 },
    /// The socket dropped; the reconnect driver has been signalled.
    Disconnected,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ZelloSessionConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub channel: String,
    /// Static developer token; preferred over JWT minting when present.
    pub auth_token: Option<String>,
    /// JWT issuer, used with `private_key_pem` when no static token is set.
    pub issuer: Option<String>,
    /// RSA private key PEM for JWT minting.
    pub private_key_pem: Option<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    /// How long to wait for `on_channel_status` after logon.
    pub auth_timeout: Duration,
    /// How long to wait for command responses such as `start_stream`.
    pub response_timeout: Duration,
}

impl Default for ZelloSessionConfig {
    fn default() -> Self {
        Self {
            url: crate::ZELLO_DEFAULT_URL.to_string(),
            username: String::new(),
            password: String::new(),
            channel: String::new(),
            auth_token: None,
            issuer: None,
            private_key_pem: None,
            max_reconnect_attempts: 3,
            reconnect_delay: Duration::from_secs(5),
            auth_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
        }
    }
}

/// Outbound audio state: accumulator plus the 16 kHz encoder.
struct TxAudio {
    encoder: OpusEncoder,
    accumulator: Vec<i16>,
}

/// Inbound audio state, owned exclusively by the receive task.
struct RecvAudio {
    /// Codec attributes per stream id, expired on stream stop.
    headers: HashMap<u32, CodecAttributes>,
    /// Opus decoders per stream id, rebuilt when the declared rate moves.
    decoders: HashMap<u32, OpusDecoder>,
    /// 8 kHz playback accumulator.
    playback: Vec<i16>,
    /// Stream id of the current inbound transmission.
    rx_stream_id: Option<u32>,
    /// Sender name from the most recent control message.
    last_from: Option<String>,
}

impl RecvAudio {
    fn new() -> Self {
        Self {
            headers: HashMap::new(),
            decoders: HashMap::new(),
            playback: Vec::new(),
            rx_stream_id: None,
            last_from: None,
        }
    }
}

/// A Zello channel session over one WebSocket.
pub struct ZelloSession {
    config: ZelloSessionConfig,
    state_tx: watch::Sender<SessionState>,
    seq: AtomicU64,
    stop_reconnect: AtomicBool,
    closing: AtomicBool,
    tx_stream_id: AtomicU32,
    refresh_token: StdMutex<Option<String>>,
    pending_stream_start: StdMutex<Option<oneshot::Sender<u32>>>,
    sink: Mutex<Option<WsSink>>,
    tx_audio: Mutex<TxAudio>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    link_down: Notify,
    reconnect_busy: Mutex<()>,
    recv_task: StdMutex<Option<JoinHandle<()>>>,
    driver_task: StdMutex<Option<JoinHandle<()>>>,
}

impl ZelloSession {
    /// Create a session and the receiving end of its event channel.
    pub fn new(
        config: ZelloSessionConfig,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>)> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _state_rx) = watch::channel(SessionState::Disconnected);
        let session = Arc::new(Self {
            config,
            state_tx,
            seq: AtomicU64::new(1),
            stop_reconnect: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            tx_stream_id: AtomicU32::new(0),
            refresh_token: StdMutex::new(None),
            pending_stream_start: StdMutex::new(None),
            sink: Mutex::new(None),
            tx_audio: Mutex::new(TxAudio {
                encoder: OpusEncoder::new(TX_SAMPLE_RATE)?,
                accumulator: Vec::new(),
            }),
            events_tx,
            link_down: Notify::new(),
            reconnect_busy: Mutex::new(()),
            recv_task: StdMutex::new(None),
            driver_task: StdMutex::new(None),
        });
        Ok((session, events_rx))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// True once the server has acknowledged logon.
    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Stream id of the current outbound transmission, 0 when idle.
    pub fn tx_stream_id(&self) -> u32 {
        self.tx_stream_id.load(Ordering::SeqCst)
    }

    /// True when reconnection has been exhausted and parked.
    pub fn reconnect_stopped(&self) -> bool {
        self.stop_reconnect.load(Ordering::SeqCst)
    }

    /// Clear the sticky reconnect stop flag.
    pub fn reset_reconnect(&self) {
        self.stop_reconnect.store(false, Ordering::SeqCst);
    }

    /// Open the WebSocket and start the receive loop.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        self.set_state(SessionState::Connecting);
        let (ws, _response) = match connect_async(self.config.url.as_str()).await {
            Ok(ok) => ok,
            Err(e) => {
                self.set_state(SessionState::Disconnected);
                return Err(e.into());
            }
        };
        info!(url = %self.config.url, "websocket connected");

        let (sink, source) = ws.split();
        *self.sink.lock().await = Some(sink);

        let task = tokio::spawn(Self::receive_loop(Arc::clone(self), source));
        let old = self.recv_task.lock().unwrap().replace(task);
        if let Some(old) = old {
            old.abort();
        }
        self.set_state(SessionState::AwaitingLogon);
        Ok(())
    }

    /// Send the logon and wait for the channel-status acknowledgement.
    ///
    /// The first attempt authenticates with the configured token or a
    /// freshly minted JWT; once the server has handed us a refresh token,
    /// later attempts present that instead with a null auth token.
    pub async fn authenticate(&self) -> Result<()> {
        let refresh = self.refresh_token.lock().unwrap().clone();
        let mut minted: Option<String> = None;
        let auth_token: Option<&str> = if refresh.is_some() {
            None
        } else if let Some(token) = &self.config.auth_token {
            Some(token.as_str())
        } else if let (Some(issuer), Some(pem)) = (&self.config.issuer, &self.config.private_key_pem)
        {
            minted = Some(create_jwt(issuer, pem)?);
            minted.as_deref()
        } else {
            None
        };

        let logon = LogonRequest {
            command: "logon",
            seq: self.next_seq(),
            auth_token,
            refresh_token: refresh.as_deref(),
            username: &self.config.username,
            password: &self.config.password,
            channel: &self.config.channel,
        };
        self.send_json(&logon).await?;

        let mut state_rx = self.state_tx.subscribe();
        timeout(
            self.config.auth_timeout,
            state_rx.wait_for(|s| *s == SessionState::Authenticated),
        )
        .await
        .map_err(|_| ZelloError::LogonFailed("no on_channel_status before timeout".into()))?
        .map_err(|_| ZelloError::LogonFailed("session dropped during logon".into()))?;

        info!(channel = %self.config.channel, "authenticated to zello channel");
        Ok(())
    }

    /// Connect, authenticate, and start the reconnect driver.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.connect().await?;
        self.authenticate().await?;
        self.spawn_reconnect_driver();
        Ok(())
    }

    /// Tear down the old socket and retry connect plus logon a bounded
    /// number of times. Exhaustion sets the sticky stop flag; while a
    /// reconnect is already running, further calls return immediately.
    pub async fn reconnect(self: &Arc<Self>) -> Result<()> {
        if self.stop_reconnect.load(Ordering::SeqCst) {
            return Err(ZelloError::ReconnectExhausted);
        }
        let Ok(_guard) = self.reconnect_busy.try_lock() else {
            return Ok(());
        };

        self.set_state(SessionState::Reconnecting);
        let attempts = self.config.max_reconnect_attempts;
        for attempt in 1..=attempts {
            self.dispose_socket().await;
            warn!(attempt, attempts, "reconnecting to zello");
            match self.connect().await {
                Ok(()) => match self.authenticate().await {
                    Ok(()) => {
                        self.stop_reconnect.store(false, Ordering::SeqCst);
                        info!("zello session re-established");
                        return Ok(());
                    }
                    Err(e) => warn!(error = %e, "re-authentication failed"),
                },
                Err(e) => warn!(error = %e, "reconnect attempt failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.reconnect_delay).await;
            }
        }

        self.stop_reconnect.store(true, Ordering::SeqCst);
        self.set_state(SessionState::Disconnected);
        error!(attempts, "reconnect attempts exhausted, parking session");
        Err(ZelloError::ReconnectExhausted)
    }

    /// Ask the server for an outbound audio stream and cache its id.
    pub async fn start_stream(&self) -> Result<u32> {
        let (reply_tx, reply_rx) = oneshot::channel();
        *self.pending_stream_start.lock().unwrap() = Some(reply_tx);

        let request = StartStreamRequest {
            command: "start_stream",
            seq: self.next_seq(),
            channel: &self.config.channel,
            stream_type: "audio",
            codec: "opus",
            codec_header: outbound_header(),
            packet_duration: 60,
        };
        self.send_json(&request).await?;

        let stream_id = timeout(self.config.response_timeout, reply_rx)
            .await
            .map_err(|_| ZelloError::Timeout("start_stream response"))?
            .map_err(|_| ZelloError::Protocol("start_stream response dropped".into()))?;
        self.tx_stream_id.store(stream_id, Ordering::SeqCst);
        info!(stream_id, "zello outbound stream started");
        Ok(stream_id)
    }

    /// End the outbound stream, if any.
    pub async fn stop_stream(&self) -> Result<()> {
        let stream_id = self.tx_stream_id.swap(0, Ordering::SeqCst);
        if stream_id == 0 {
            return Ok(());
        }
        self.tx_audio.lock().await.accumulator.clear();

        let request = StopStreamRequest { command: "stop_stream", seq: self.next_seq(), stream_id };
        self.send_json(&request).await?;
        info!(stream_id, "zello outbound stream stopped");
        Ok(())
    }

    /// Queue 8 kHz PCM for transmission. Complete 60 ms blocks are
    /// Opus-encoded and sent immediately, in order.
    pub async fn send_audio(&self, pcm_8k: &[i16]) -> Result<()> {
        let stream_id = self.tx_stream_id.load(Ordering::SeqCst);
        if stream_id == 0 {
            return Err(ZelloError::Protocol("no outbound stream".into()));
        }

        let upsampled = resample(pcm_8k, 8000, TX_SAMPLE_RATE)?;
        let mut audio = self.tx_audio.lock().await;
        audio.accumulator.extend_from_slice(&upsampled);

        while audio.accumulator.len() >= TX_BLOCK_SAMPLES {
            let block: Vec<i16> = audio.accumulator.drain(..TX_BLOCK_SAMPLES).collect();
            let packet = audio.encoder.encode(&block)?;
            let frame = encode_audio_frame(stream_id, &packet);
            self.send_raw(Message::Binary(frame)).await?;
        }
        Ok(())
    }

    /// Send the keep-alive text ping.
    pub async fn send_ping(&self) -> Result<()> {
        let request = SendTextMessage {
            command: "send_text_message",
            seq: self.next_seq(),
            channel: &self.config.channel,
            text: "ping",
            for_user: &self.config.username,
        };
        self.send_json(&request).await
    }

    /// Close the socket and stop all session tasks.
    pub async fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);

        let mut sink_guard = self.sink.lock().await;
        if let Some(mut sink) = sink_guard.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        drop(sink_guard);

        let recv = self.recv_task.lock().unwrap().take();
        if let Some(task) = recv {
            task.abort();
        }
        let driver = self.driver_task.lock().unwrap().take();
        if let Some(task) = driver {
            task.abort();
        }
        self.set_state(SessionState::Disconnected);
        info!("zello session closed");
    }

    fn spawn_reconnect_driver(self: &Arc<Self>) {
        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                session.link_down.notified().await;
                if session.closing.load(Ordering::SeqCst) {
                    break;
                }
                if session.stop_reconnect.load(Ordering::SeqCst) {
                    continue;
                }
                if let Err(e) = session.reconnect().await {
                    error!(error = %e, "reconnect driver parked");
                }
            }
        });
        let old = self.driver_task.lock().unwrap().replace(task);
        if let Some(old) = old {
            old.abort();
        }
    }

    async fn dispose_socket(&self) {
        let task = self.recv_task.lock().unwrap().take();
        if let Some(task) = task {
            task.abort();
        }
        let mut sink = self.sink.lock().await;
        if let Some(mut old) = sink.take() {
            let _ = old.close().await;
        }
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(?previous, ?state, "session state change");
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    async fn send_json<T: Serialize>(&self, message: &T) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.send_raw(Message::Text(text)).await
    }

    async fn send_raw(&self, message: Message) -> Result<()> {
        let mut sink = self.sink.lock().await;
        match sink.as_mut() {
            Some(sink) => sink.send(message).await.map_err(Into::into),
            None => Err(ZelloError::NotConnected),
        }
    }

    /// The receive loop: sole reader of the socket. On exit it signals
    /// the reconnect driver rather than reconnecting itself.
    async fn receive_loop(session: Arc<Self>, mut source: WsSource) {
        let mut recv = RecvAudio::new();

        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Binary(data)) => {
                    if let Err(e) = session.handle_audio(&mut recv, &data) {
                        warn!(error = %e, "dropping undecodable audio frame");
                    }
                }
                Ok(Message::Text(text)) => {
                    session.handle_text(&mut recv, &text);
                }
                Ok(Message::Ping(payload)) => {
                    let _ = session.send_raw(Message::Pong(payload)).await;
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(_)) => {
                    info!("server closed websocket");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "websocket receive failed");
                    break;
                }
            }
        }

        if session.closing.load(Ordering::SeqCst) {
            return;
        }
        session.set_state(SessionState::Disconnected);
        let _ = session.events_tx.send(SessionEvent::Disconnected);
        if !session.stop_reconnect.load(Ordering::SeqCst) {
            session.link_down.notify_one();
        }
    }

    /// Decode one binary audio frame and deliver accumulated PCM.
    fn handle_audio(&self, recv: &mut RecvAudio, data: &[u8]) -> Result<()> {
        let Some((stream_id, opus)) = decode_audio_frame(data) else {
            return Ok(());
        };
        let attrs = recv.headers.get(&stream_id).copied().unwrap_or_default();
        let rate = attrs.sample_rate_hz as u32;

        let rebuild = match recv.decoders.get(&stream_id) {
            Some(decoder) => decoder.sample_rate() != rate,
            None => true,
        };
        if rebuild {
            if recv.decoders.contains_key(&stream_id) {
                warn!(stream_id, rate, "codec rate changed, rebuilding decoder");
            }
            recv.decoders.insert(stream_id, OpusDecoder::new(rate)?);
        }
        let decoder = recv
            .decoders
            .get_mut(&stream_id)
            .ok_or_else(|| ZelloError::Protocol("decoder missing after rebuild".into()))?;

        // Allow up to the 120 ms Opus maximum at this rate.
        let max_samples = (rate as usize / 1000) * 120;
        let pcm = decoder.decode(opus, max_samples)?;
        let pcm_8k = resample(&pcm, rate, 8000)?;
        recv.playback.extend_from_slice(&pcm_8k);

        let target = attrs.frame_samples_8k();
        while target > 0 && recv.playback.len() >= target {
            let chunk: Vec<i16> = recv.playback.drain(..target).collect();
            let _ = self
                .events_tx
                .send(SessionEvent::Pcm { samples: chunk, from: recv.last_from.clone() });
        }
        Ok(())
    }

    /// Apply one control message to session and receive state.
    fn handle_text(&self, recv: &mut RecvAudio, text: &str) {
        let msg = match ServerMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "malformed control message");
                return;
            }
        };

        if let Some(from) = &msg.from {
            recv.last_from = Some(from.clone());
        }
        if let Some(token) = &msg.refresh_token {
            *self.refresh_token.lock().unwrap() = Some(token.clone());
        }
        if let (Some(header), Some(stream_id)) = (&msg.codec_header, msg.stream_id) {
            match CodecAttributes::decode(header) {
                Ok(attrs) => {
                    debug!(stream_id, rate = attrs.sample_rate_hz, "codec header bound to stream");
                    recv.headers.insert(stream_id, attrs);
                }
                Err(e) => warn!(error = %e, "ignoring bad codec header"),
            }
        }

        match msg.command.as_deref() {
            Some("on_channel_status") => {
                self.set_state(SessionState::Authenticated);
            }
            Some("on_alert") => {
                if let Some(text) = &msg.text {
                    if let Some(dst_id) = parse_page_command(text) {
                        info!(dst_id, from = ?msg.from, "page request from channel");
                        let _ = self.events_tx.send(SessionEvent::RadioCommand {
                            command: "page".to_string(),
                            dst_id,
                        });
                    }
                }
            }
            Some("on_stream_start") => {
                if let Some(stream_id) = msg.stream_id {
                    recv.rx_stream_id = Some(stream_id);
                }
            }
            Some("on_stream_stop") => {
                if let Some(stream_id) = msg.stream_id {
                    recv.headers.remove(&stream_id);
                    recv.decoders.remove(&stream_id);
                    if recv.rx_stream_id == Some(stream_id) {
                        recv.rx_stream_id = None;
                    }
                    let _ = self.events_tx.send(SessionEvent::StreamEnd);
                }
            }
            Some(other) => {
                debug!(command = other, "unhandled control message");
            }
            None => {
                if let Some(stream_id) = msg.stream_id {
                    let pending = self.pending_stream_start.lock().unwrap().take();
                    match pending {
                        Some(reply) if msg.success == Some(true) => {
                            let _ = reply.send(stream_id);
                        }
                        other => {
                            // Not a start_stream acknowledgement; restore
                            // any pending waiter and track the stream.
                            *self.pending_stream_start.lock().unwrap() = other;
                            recv.rx_stream_id = Some(stream_id);
                        }
                    }
                } else if let Some(error) = &msg.error {
                    warn!(error = %error, "server rejected request");
                }
            }
        }
    }
}

impl Drop for ZelloSession {
    fn drop(&mut self) {
        if let Ok(mut task) = self.recv_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        if let Ok(mut task) = self.driver_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}
