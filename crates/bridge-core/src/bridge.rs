//! The call bridge state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;
use tracing::{debug, info, warn};

use zellolink_codec_core::{
    apply_gain, AmbeVocoder, ImbeVocoder, MbeVocoder, MBE_FRAME_SAMPLES,
};
use zellolink_dfsi_core::dmr::{
    self, DmrCallInfo, DmrSuperFrame, DMR_DT_TERMINATOR, DMR_DT_VOICE, DMR_DT_VOICE_HEADER,
    DMR_FLAG_GRANT_DEMAND, DMR_FLAG_PRIVACY, DMR_SLOT2,
};
use zellolink_dfsi_core::ldu::{
    has_valid_markers, ldu1_algorithm_hint, ldu2_algorithm_id, pack_tdu, EncryptionSync,
    LinkControl,
};
use zellolink_dfsi_core::{
    FnePeer, P25Data, Tsbk, VoiceSuperFrame, LDU1_FRAME_TYPES, LDU2_FRAME_TYPES,
    P25_ALGO_UNENCRYPT, P25_DUID_HDU, P25_DUID_LDU1, P25_DUID_LDU2, P25_DUID_TDU, P25_DUID_TDULC,
    P25_DUID_TSDU, P25_TSBK_IOSP_CALL_ALRT,
};
use zellolink_zello_core::AliasMap;

use crate::error::Result;
use crate::slots::{CallSlot, SlotIndex};
use crate::zello_sink::ZelloAudioSink;

/// Samples per egress block handed to the Zello leg: 120 ms at 8 kHz,
/// which the session turns into two 60 ms Opus packets.
const RX_BLOCK_SAMPLES: usize = 960;

/// Peak threshold below which a 20 ms frame counts as silence.
const SILENCE_THRESHOLD: i32 = 100;

/// Which radio network the transmit leg speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    Dmr = 1,
    P25 = 2,
}

/// Bridge configuration, resolved from the gateway's YAML.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Source RID stamped on traffic originated from Zello.
    pub source_id: u32,
    /// Destination TGID bridged in both directions.
    pub destination_id: u32,
    /// FNE peer id stamped into outbound message headers.
    pub peer_id: u32,
    pub tx_mode: TxMode,
    /// TDMA slot used for DMR transmit, 1 or 2.
    pub dmr_slot: u8,
    /// Resolve the source RID from the Zello sender alias when possible.
    pub override_source_id: bool,
    /// Emit a grant-demand terminator before voice flows.
    pub grant_demand: bool,
    pub rx_audio_gain: f32,
    pub tx_audio_gain: f32,
    pub vocoder_decoder_gain: f32,
    pub vocoder_encoder_gain: f32,
    pub vocoder_decoder_auto_gain: bool,
    /// Continuous silence after which an ingress call is dropped.
    pub drop_time: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source_id: 0,
            destination_id: 0,
            peer_id: 0,
            tx_mode: TxMode::P25,
            dmr_slot: 1,
            override_source_id: false,
            grant_demand: false,
            rx_audio_gain: 1.0,
            tx_audio_gain: 1.0,
            vocoder_decoder_gain: 1.0,
            vocoder_encoder_gain: 1.0,
            vocoder_decoder_auto_gain: false,
            drop_time: Duration::from_millis(180),
        }
    }
}

/// Transmit-direction state (Zello toward the radio network).
struct TxState {
    in_call: bool,
    stream_id: u32,
    /// Voice frame counter: 0..17 across the P25 LDU1/LDU2 pair, 0..2
    /// within a DMR burst.
    p25_n: u8,
    /// Voice payloads sent within the current stream.
    p25_seq: u32,
    pcm_accumulator: Vec<i16>,
    src_override: u32,
    ldu1: VoiceSuperFrame,
    ldu2: VoiceSuperFrame,
    dmr: DmrSuperFrame,
    /// DMR superframe burst index, 0..5.
    dmr_burst: u8,
    call_start: Option<Instant>,
    last_voice: Option<Instant>,
}

impl TxState {
    fn new() -> Self {
        Self {
            in_call: false,
            stream_id: 0,
            p25_n: 0,
            p25_seq: 0,
            pcm_accumulator: Vec::new(),
            src_override: 0,
            ldu1: VoiceSuperFrame::new(),
            ldu2: VoiceSuperFrame::new(),
            dmr: DmrSuperFrame::new(),
            dmr_burst: 0,
            call_start: None,
            last_voice: None,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// The bidirectional voice bridge.
pub struct CallBridge {
    config: BridgeConfig,
    peer: Arc<dyn FnePeer>,
    zello: Arc<dyn ZelloAudioSink>,
    aliases: AliasMap,
    encoder: Box<dyn MbeVocoder>,
    decoder: Box<dyn MbeVocoder>,
    tx: TxState,
    rx_slots: [CallSlot; 3],
    rx_accumulator: Vec<i16>,
}

impl CallBridge {
    /// Build a bridge with the software vocoder matching `tx_mode`.
    pub fn new(
        config: BridgeConfig,
        peer: Arc<dyn FnePeer>,
        zello: Arc<dyn ZelloAudioSink>,
        aliases: AliasMap,
    ) -> Self {
        let (encoder, decoder): (Box<dyn MbeVocoder>, Box<dyn MbeVocoder>) = match config.tx_mode {
            TxMode::P25 => (Box::new(ImbeVocoder::new()), Box::new(ImbeVocoder::new())),
            TxMode::Dmr => (Box::new(AmbeVocoder::new()), Box::new(AmbeVocoder::new())),
        };
        Self::with_vocoders(config, peer, zello, aliases, encoder, decoder)
    }

    /// Build a bridge around caller-supplied vocoder handles, e.g. a
    /// hardware engine.
    pub fn with_vocoders(
        config: BridgeConfig,
        peer: Arc<dyn FnePeer>,
        zello: Arc<dyn ZelloAudioSink>,
        aliases: AliasMap,
        mut encoder: Box<dyn MbeVocoder>,
        mut decoder: Box<dyn MbeVocoder>,
    ) -> Self {
        encoder.set_encoder_gain(config.vocoder_encoder_gain);
        decoder.set_decoder_gain(config.vocoder_decoder_gain);
        decoder.set_auto_gain(config.vocoder_decoder_auto_gain);
        Self {
            config,
            peer,
            zello,
            aliases,
            encoder,
            decoder,
            tx: TxState::new(),
            rx_slots: [CallSlot::new(), CallSlot::new(), CallSlot::new()],
            rx_accumulator: Vec::new(),
        }
    }

    /// True while Zello audio is being transmitted toward the radio
    /// network.
    pub fn tx_in_call(&self) -> bool {
        self.tx.in_call
    }

    /// True while a radio call is open toward Zello on any slot.
    pub fn rx_in_call(&self) -> bool {
        self.rx_slots.iter().any(|slot| slot.call_in_progress)
    }

    /// Ingress: one chunk of 8 kHz PCM from the Zello session.
    ///
    /// Call boundaries are derived from the audio itself: the first
    /// non-silent chunk opens a call, and the drop timer closes it after
    /// sustained silence.
    pub async fn process_rx_pcm(&mut self, pcm: &[i16], from: Option<&str>) -> Result<()> {
        let silent = is_silent(pcm);

        if !self.tx.in_call {
            if silent {
                return Ok(());
            }
            self.start_tx_call(from).await?;
        }

        if silent {
            if let Some(last) = self.tx.last_voice {
                if last.elapsed() >= self.config.drop_time {
                    self.end_tx_call("silence drop timer").await?;
                    return Ok(());
                }
            }
        } else {
            self.tx.last_voice = Some(Instant::now());
        }

        self.tx.pcm_accumulator.extend_from_slice(pcm);
        while self.tx.pcm_accumulator.len() >= MBE_FRAME_SAMPLES {
            let mut frame: Vec<i16> =
                self.tx.pcm_accumulator.drain(..MBE_FRAME_SAMPLES).collect();
            apply_gain(&mut frame, self.config.tx_audio_gain);

            let codeword = match self.encoder.encode(&frame) {
                Ok(cw) => cw,
                Err(e) => {
                    warn!(error = %e, "vocoder encode failed, dropping frame");
                    continue;
                }
            };

            match self.config.tx_mode {
                TxMode::P25 => {
                    let n = self.tx.p25_n as usize;
                    if n < 9 {
                        self.tx.ldu1.set_codeword(n, &codeword)?;
                    } else {
                        self.tx.ldu2.set_codeword(n - 9, &codeword)?;
                    }

                    if n == 8 {
                        let lc =
                            LinkControl::group_voice(self.tx_src(), self.config.destination_id);
                        let payload = self.tx.ldu1.pack_ldu1(&lc, self.config.peer_id);
                        self.send_voice_payload(payload).await?;
                        self.tx.p25_n = 9;
                    } else if n == 17 {
                        let payload = self.tx.ldu2.pack_ldu2(
                            &EncryptionSync::clear(),
                            self.tx_src(),
                            self.config.destination_id,
                            self.config.peer_id,
                        );
                        self.send_voice_payload(payload).await?;
                        self.tx.p25_n = 0;
                    } else {
                        self.tx.p25_n += 1;
                    }
                }
                TxMode::Dmr => {
                    let n = self.tx.p25_n as usize;
                    self.tx.dmr.set_codeword(n, &codeword)?;
                    if n == 2 {
                        let payload = self.tx.dmr.pack_voice(&self.dmr_call(DMR_DT_VOICE, 0));
                        self.send_voice_payload(payload).await?;
                        self.tx.dmr_burst =
                            (self.tx.dmr_burst + 1) % dmr::DMR_BURSTS_PER_SUPERFRAME;
                        self.tx.p25_n = 0;
                    } else {
                        self.tx.p25_n += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Ingress: the Zello stream ended while we may still be in a call.
    pub async fn on_zello_stream_end(&mut self) -> Result<()> {
        if self.tx.in_call {
            self.end_tx_call("zello stream end").await?;
        }
        Ok(())
    }

    /// Egress: one message from the FNE master.
    pub async fn on_p25_data(&mut self, data: &P25Data) -> Result<()> {
        match data.duid {
            duid if duid == P25_DUID_TSDU => {
                self.handle_tsdu(data);
                Ok(())
            }
            duid if duid == P25_DUID_HDU => {
                let slot = &mut self.rx_slots[SlotIndex::P25 as usize];
                slot.ignore_call = false;
                slot.algo_id = 0;
                Ok(())
            }
            duid if duid == P25_DUID_LDU1 || duid == P25_DUID_LDU2 => {
                self.handle_ldu(data).await
            }
            duid if duid == P25_DUID_TDU || duid == P25_DUID_TDULC => {
                self.handle_terminator(data, SlotIndex::P25 as usize).await
            }
            duid if duid == DMR_DT_VOICE_HEADER => self.handle_dmr_header(data).await,
            duid if duid == DMR_DT_VOICE => self.handle_dmr_voice(data).await,
            duid if duid == DMR_DT_TERMINATOR => {
                self.handle_terminator(data, rx_slot_index(data)).await
            }
            duid => {
                debug!(duid, "ignoring non-voice duid");
                Ok(())
            }
        }
    }

    /// A page command raised by the Zello leg: emit a call alert TSBK.
    pub async fn on_radio_command(&mut self, command: &str, dst_id: u32) -> Result<()> {
        if command != "page" {
            warn!(command, "unsupported radio command");
            return Ok(());
        }
        let src_id = self.config.source_id;
        let tsbk = Tsbk::call_alert(src_id, dst_id);
        self.peer
            .send_tsbk(Bytes::from(tsbk.encode()), random_stream_id())
            .await?;
        info!(src_id, dst_id, "call alert sent to radio network");
        Ok(())
    }

    async fn start_tx_call(&mut self, from: Option<&str>) -> Result<()> {
        let stream_id = random_stream_id();
        let now = Instant::now();
        self.tx.stream_id = stream_id;
        self.tx.p25_n = 0;
        self.tx.p25_seq = 0;
        self.tx.src_override = if self.config.override_source_id {
            from.map(|f| self.aliases.lookup(f)).unwrap_or(0)
        } else {
            0
        };
        self.tx.call_start = Some(now);
        self.tx.last_voice = Some(now);
        self.tx.in_call = true;

        let src_id = self.tx_src();
        info!(
            stream_id,
            src_id,
            dst_id = self.config.destination_id,
            from = from.unwrap_or(""),
            "zello call started toward radio network"
        );

        match self.config.tx_mode {
            TxMode::P25 => {
                if self.config.grant_demand {
                    let tdu =
                        pack_tdu(src_id, self.config.destination_id, self.config.peer_id, true);
                    let seq = self.peer.pkt_seq(false);
                    self.peer.send_master(Bytes::from(tdu), seq, stream_id).await?;
                }
            }
            TxMode::Dmr => {
                // Every DMR call opens with a voice LC header; the grant
                // demand rides its flag bits.
                let flags = if self.config.grant_demand { DMR_FLAG_GRANT_DEMAND } else { 0 };
                let header = dmr::pack_voice_header(&self.dmr_call(DMR_DT_VOICE_HEADER, flags));
                let seq = self.peer.pkt_seq(false);
                self.peer.send_master(Bytes::from(header), seq, stream_id).await?;
            }
        }
        Ok(())
    }

    async fn end_tx_call(&mut self, reason: &str) -> Result<()> {
        let stream_id = self.tx.stream_id;
        let terminator = match self.config.tx_mode {
            TxMode::P25 => {
                pack_tdu(self.tx_src(), self.config.destination_id, self.config.peer_id, false)
            }
            TxMode::Dmr => dmr::pack_terminator(&self.dmr_call(DMR_DT_TERMINATOR, 0)),
        };
        let seq = self.peer.pkt_seq(false);
        self.peer.send_master(Bytes::from(terminator), seq, stream_id).await?;

        let duration = self
            .tx
            .call_start
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        info!(
            stream_id,
            ldus = self.tx.p25_seq,
            duration_secs = format!("{:.1}", duration),
            reason,
            "zello call ended"
        );
        self.tx.reset();
        Ok(())
    }

    async fn send_voice_payload(&mut self, payload: Vec<u8>) -> Result<()> {
        // The FNE packet counter restarts with each new stream.
        let seq = self.peer.pkt_seq(self.tx.p25_seq == 0);
        self.peer
            .send_master(Bytes::from(payload), seq, self.tx.stream_id)
            .await?;
        self.tx.p25_seq += 1;
        Ok(())
    }

    fn tx_src(&self) -> u32 {
        if self.tx.src_override != 0 {
            self.tx.src_override
        } else {
            self.config.source_id
        }
    }

    fn dmr_call(&self, frame_type: u8, flags: u8) -> DmrCallInfo {
        DmrCallInfo {
            frame_type,
            slot: self.config.dmr_slot,
            dst_id: self.config.destination_id,
            src_id: self.tx_src(),
            peer_id: self.config.peer_id,
            burst: self.tx.dmr_burst,
            flags,
        }
    }

    /// Track the slot's stream id. A new stream id invalidates the
    /// previous call outright: any call in progress on the slot is
    /// closed and the slot returns to idle before the new stream is
    /// adopted.
    async fn track_stream(&mut self, idx: usize, data: &P25Data) {
        if self.rx_slots[idx].rx_stream_id == data.stream_id {
            return;
        }
        if self.rx_slots[idx].call_in_progress {
            warn!(
                old = self.rx_slots[idx].rx_stream_id,
                new = data.stream_id,
                "stream takeover, closing previous zello stream"
            );
            let _ = self.zello.stop_stream().await;
            self.rx_accumulator.clear();
        }
        self.rx_slots[idx].reset();
        self.rx_slots[idx].rx_stream_id = data.stream_id;
    }

    fn handle_tsdu(&self, data: &P25Data) {
        match Tsbk::decode(&data.data) {
            Ok(tsbk) if tsbk.opcode == P25_TSBK_IOSP_CALL_ALRT => {
                info!(
                    src_id = tsbk.src_id,
                    dst_id = tsbk.dst_id,
                    "call alert received from radio network"
                );
            }
            Ok(tsbk) => debug!(opcode = tsbk.opcode, "ignoring tsbk"),
            Err(e) => warn!(error = %e, "undecodable tsbk"),
        }
    }

    async fn handle_ldu(&mut self, data: &P25Data) -> Result<()> {
        if data.dst_id != self.config.destination_id {
            debug!(dst_id = data.dst_id, "ignoring ldu for other talkgroup");
            return Ok(());
        }
        let idx = SlotIndex::P25 as usize;
        self.track_stream(idx, data).await;

        if self.rx_slots[idx].ignore_call {
            return Ok(());
        }

        // Reject encrypted traffic before opening anything toward Zello.
        let algo_id = if data.duid == P25_DUID_LDU1 {
            ldu1_algorithm_hint(&data.data)
        } else {
            ldu2_algorithm_id(&data.data)
        };
        if let Some(algo_id) = algo_id.filter(|&a| a != P25_ALGO_UNENCRYPT) {
            warn!(algo_id, stream_id = data.stream_id, "encrypted call, ignoring stream");
            let was_in_progress = self.rx_slots[idx].call_in_progress;
            self.rx_slots[idx].ignore_call = true;
            self.rx_slots[idx].algo_id = algo_id;
            self.rx_slots[idx].call_in_progress = false;
            if was_in_progress {
                let _ = self.zello.stop_stream().await;
            }
            return Ok(());
        }

        let frame_types = if data.duid == P25_DUID_LDU1 {
            &LDU1_FRAME_TYPES
        } else {
            &LDU2_FRAME_TYPES
        };
        if !has_valid_markers(&data.data, frame_types) {
            debug!(stream_id = data.stream_id, "dropping ldu with bad frame markers");
            return Ok(());
        }

        if !self.rx_slots[idx].call_in_progress {
            let zello_stream = self.zello.start_stream().await?;
            let slot = &mut self.rx_slots[idx];
            slot.call_in_progress = true;
            slot.tx_stream_id = zello_stream;
            slot.rx_start = Some(Instant::now());
            slot.rx_src = data.src_id;
            slot.rx_dst = data.dst_id;
            info!(
                peer_id = data.peer_id,
                src_id = data.src_id,
                dst_id = data.dst_id,
                stream_id = data.stream_id,
                zello_stream,
                "radio call started toward zello"
            );
        }

        let frame = if data.duid == P25_DUID_LDU1 {
            VoiceSuperFrame::unpack_ldu1(&data.data).map(|(f, _)| f)
        } else {
            VoiceSuperFrame::unpack_ldu2(&data.data).map(|(f, _)| f)
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "dropping undecodable ldu");
                return Ok(());
            }
        };

        let mut pcm = Vec::with_capacity(9 * MBE_FRAME_SAMPLES);
        for i in 0..9 {
            match self.decoder.decode(frame.codeword(i)) {
                Ok(samples) => pcm.extend_from_slice(&samples),
                Err(e) => {
                    warn!(error = %e, "vocoder decode failed, substituting silence");
                    pcm.extend_from_slice(&[0i16; MBE_FRAME_SAMPLES]);
                }
            }
        }
        apply_gain(&mut pcm, self.config.rx_audio_gain);
        self.rx_accumulator.extend_from_slice(&pcm);

        while self.rx_accumulator.len() >= RX_BLOCK_SAMPLES {
            let block: Vec<i16> = self.rx_accumulator.drain(..RX_BLOCK_SAMPLES).collect();
            self.zello.send_audio(&block).await?;
        }

        let slot = &mut self.rx_slots[idx];
        slot.rx_seq += 1;
        slot.rx_type = data.duid;
        Ok(())
    }

    /// A DMR voice LC header: bind the slot to the stream and apply the
    /// privacy flag before any voice arrives.
    async fn handle_dmr_header(&mut self, data: &P25Data) -> Result<()> {
        if data.dst_id != self.config.destination_id {
            return Ok(());
        }
        let idx = rx_slot_index(data);
        self.track_stream(idx, data).await;

        let Some(info) = dmr::call_info(&data.data) else {
            debug!("dropping short dmr header");
            return Ok(());
        };
        if info.flags & DMR_FLAG_PRIVACY != 0 {
            warn!(stream_id = data.stream_id, slot = info.slot, "private dmr call, ignoring stream");
            self.rx_slots[idx].ignore_call = true;
        } else {
            self.rx_slots[idx].ignore_call = false;
            self.rx_slots[idx].algo_id = 0;
        }
        Ok(())
    }

    /// A DMR voice burst: three AMBE codewords toward Zello.
    async fn handle_dmr_voice(&mut self, data: &P25Data) -> Result<()> {
        if data.dst_id != self.config.destination_id {
            debug!(dst_id = data.dst_id, "ignoring dmr burst for other talkgroup");
            return Ok(());
        }
        let idx = rx_slot_index(data);
        self.track_stream(idx, data).await;

        if self.rx_slots[idx].ignore_call {
            return Ok(());
        }

        let (frame, info) = match DmrSuperFrame::unpack_voice(&data.data) {
            Ok(ok) => ok,
            Err(e) => {
                debug!(error = %e, "dropping undecodable dmr burst");
                return Ok(());
            }
        };
        if info.flags & DMR_FLAG_PRIVACY != 0 {
            warn!(stream_id = data.stream_id, slot = info.slot, "private dmr call, ignoring stream");
            let was_in_progress = self.rx_slots[idx].call_in_progress;
            self.rx_slots[idx].ignore_call = true;
            self.rx_slots[idx].call_in_progress = false;
            if was_in_progress {
                let _ = self.zello.stop_stream().await;
            }
            return Ok(());
        }

        if !self.rx_slots[idx].call_in_progress {
            let zello_stream = self.zello.start_stream().await?;
            let slot = &mut self.rx_slots[idx];
            slot.call_in_progress = true;
            slot.tx_stream_id = zello_stream;
            slot.rx_start = Some(Instant::now());
            slot.rx_src = data.src_id;
            slot.rx_dst = data.dst_id;
            info!(
                peer_id = data.peer_id,
                src_id = data.src_id,
                dst_id = data.dst_id,
                stream_id = data.stream_id,
                slot = info.slot,
                zello_stream,
                "dmr call started toward zello"
            );
        }

        let mut pcm = Vec::with_capacity(dmr::DMR_CODEWORDS_PER_BURST * MBE_FRAME_SAMPLES);
        for i in 0..dmr::DMR_CODEWORDS_PER_BURST {
            match self.decoder.decode(frame.codeword(i)) {
                Ok(samples) => pcm.extend_from_slice(&samples),
                Err(e) => {
                    warn!(error = %e, "vocoder decode failed, substituting silence");
                    pcm.extend_from_slice(&[0i16; MBE_FRAME_SAMPLES]);
                }
            }
        }
        apply_gain(&mut pcm, self.config.rx_audio_gain);
        self.rx_accumulator.extend_from_slice(&pcm);

        while self.rx_accumulator.len() >= RX_BLOCK_SAMPLES {
            let block: Vec<i16> = self.rx_accumulator.drain(..RX_BLOCK_SAMPLES).collect();
            self.zello.send_audio(&block).await?;
        }

        let slot = &mut self.rx_slots[idx];
        slot.rx_seq += 1;
        slot.rx_type = data.duid;
        Ok(())
    }

    async fn handle_terminator(&mut self, data: &P25Data, idx: usize) -> Result<()> {
        let slot = &self.rx_slots[idx];
        let was_in_progress = slot.call_in_progress;
        let duration = slot.duration_secs();
        let (src_id, dst_id, frames) = (slot.rx_src, slot.rx_dst, slot.rx_seq);

        if was_in_progress {
            let _ = self.zello.stop_stream().await;
            // Residual audio below one block belongs to the ended call.
            self.rx_accumulator.clear();
            info!(
                peer_id = data.peer_id,
                src_id,
                dst_id,
                stream_id = data.stream_id,
                frames,
                duration_secs = format!("{:.1}", duration),
                "radio call ended"
            );
        }
        self.rx_slots[idx].reset();
        Ok(())
    }
}

/// Receive slot for a frame: DMR frames land on the slot named by their
/// TDMA slot number, everything else on the fixed P25 slot.
fn rx_slot_index(data: &P25Data) -> usize {
    if dmr::is_dmr_frame_type(data.duid) {
        if data.call_type == DMR_SLOT2 {
            SlotIndex::Dmr2 as usize
        } else {
            SlotIndex::Dmr1 as usize
        }
    } else {
        SlotIndex::P25 as usize
    }
}

fn is_silent(pcm: &[i16]) -> bool {
    pcm.iter().all(|&s| (s as i32).abs() < SILENCE_THRESHOLD)
}

fn random_stream_id() -> u32 {
    let mut rng = rand::thread_rng();
    loop {
        let id: u32 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}
