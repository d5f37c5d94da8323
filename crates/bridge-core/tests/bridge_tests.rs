//! End-to-end bridge tests against recording doubles for the FNE peer
//! and the Zello leg.

use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use zellolink_bridge_core::{BridgeConfig, CallBridge, TxMode, ZelloAudioSink};
use zellolink_codec_core::{AmbeVocoder, ImbeVocoder, MbeVocoder};
use zellolink_dfsi_core::dmr::{
    DmrCallInfo, DmrSuperFrame, DMR_DT_TERMINATOR, DMR_DT_VOICE, DMR_DT_VOICE_HEADER,
    DMR_FLAG_PRIVACY, DMR_SLOT1, DMR_SLOT2, DMR_VOICE_PAYLOAD_LEN,
};
use zellolink_dfsi_core::ldu::{EncryptionSync, LinkControl};
use zellolink_dfsi_core::{
    FnePeer, P25Data, Tsbk, VoiceSuperFrame, DfsiError, LDU_HEADER_LEN, LDU_PAYLOAD_LEN,
    LDU_TRAILER_ALGID_OFFSET, P25_DUID_LDU1, P25_DUID_LDU2, P25_DUID_TDU, P25_DUID_TSDU,
    P25_TSBK_IOSP_CALL_ALRT, FRAME_MARKER_OFFSETS,
};
use zellolink_zello_core::AliasMap;

#[derive(Debug, Clone)]
struct SentFrame {
    payload: Vec<u8>,
    pkt_seq: u16,
    stream_id: u32,
}

#[derive(Default)]
struct RecordingPeer {
    frames: Mutex<Vec<SentFrame>>,
    tsbks: Mutex<Vec<Vec<u8>>>,
    seq: AtomicU16,
}

impl RecordingPeer {
    fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().unwrap().clone()
    }

    fn voice_frames(&self) -> Vec<SentFrame> {
        self.frames()
            .into_iter()
            .filter(|f| f.payload[0] == P25_DUID_LDU1 || f.payload[0] == P25_DUID_LDU2)
            .collect()
    }

    fn terminators(&self) -> Vec<SentFrame> {
        self.frames()
            .into_iter()
            .filter(|f| f.payload[0] == P25_DUID_TDU)
            .collect()
    }
}

#[async_trait]
impl FnePeer for RecordingPeer {
    async fn send_master(
        &self,
        payload: Bytes,
        pkt_seq: u16,
        stream_id: u32,
    ) -> Result<(), DfsiError> {
        self.frames
            .lock()
            .unwrap()
            .push(SentFrame { payload: payload.to_vec(), pkt_seq, stream_id });
        Ok(())
    }

    async fn send_tsbk(&self, payload: Bytes, _stream_id: u32) -> Result<(), DfsiError> {
        self.tsbks.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn pkt_seq(&self, reset: bool) -> u16 {
        if reset {
            self.seq.store(0, Ordering::SeqCst);
        }
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingSink {
    started: AtomicU32,
    stopped: AtomicU32,
    blocks: Mutex<Vec<Vec<i16>>>,
}

#[async_trait]
impl ZelloAudioSink for RecordingSink {
    async fn start_stream(&self) -> zellolink_bridge_core::Result<u32> {
        let n = self.started.fetch_add(1, Ordering::SeqCst);
        Ok(100 + n)
    }

    async fn stop_stream(&self) -> zellolink_bridge_core::Result<()> {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_audio(&self, pcm_8k: &[i16]) -> zellolink_bridge_core::Result<()> {
        self.blocks.lock().unwrap().push(pcm_8k.to_vec());
        Ok(())
    }
}

fn test_config() -> BridgeConfig {
    BridgeConfig {
        source_id: 1234567,
        destination_id: 9000,
        peer_id: 77,
        tx_mode: TxMode::P25,
        drop_time: Duration::from_millis(100),
        ..Default::default()
    }
}

fn make_bridge(
    config: BridgeConfig,
) -> (CallBridge, Arc<RecordingPeer>, Arc<RecordingSink>) {
    let peer = Arc::new(RecordingPeer::default());
    let sink = Arc::new(RecordingSink::default());
    let bridge = CallBridge::new(
        config,
        peer.clone(),
        sink.clone(),
        AliasMap::default(),
    );
    (bridge, peer, sink)
}

fn speech(samples: usize) -> Vec<i16> {
    (0..samples)
        .map(|i| {
            let t = i as f32 / 8000.0;
            ((2.0 * std::f32::consts::PI * 220.0 * t).sin() * 8000.0) as i16
        })
        .collect()
}

/// An LDU1 payload of vocoded silence addressed to the test talkgroup.
fn clear_ldu1(src: u32, dst: u32) -> Vec<u8> {
    let mut vocoder = ImbeVocoder::new();
    let cw = vocoder.encode(&[0i16; 160]).unwrap();
    let mut frame = VoiceSuperFrame::new();
    for i in 0..9 {
        frame.set_codeword(i, &cw).unwrap();
    }
    frame.pack_ldu1(&LinkControl::group_voice(src, dst), 1)
}

fn clear_ldu2(src: u32, dst: u32) -> Vec<u8> {
    let mut vocoder = ImbeVocoder::new();
    let cw = vocoder.encode(&[0i16; 160]).unwrap();
    let mut frame = VoiceSuperFrame::new();
    for i in 0..9 {
        frame.set_codeword(i, &cw).unwrap();
    }
    frame.pack_ldu2(&EncryptionSync::clear(), src, dst, 1)
}

fn p25_event(duid: u8, src: u32, dst: u32, stream_id: u32, payload: Vec<u8>) -> P25Data {
    P25Data {
        peer_id: 1,
        src_id: src,
        dst_id: dst,
        call_type: 0,
        duid,
        frame_type: 0,
        stream_id,
        data: Bytes::from(payload),
    }
}

#[tokio::test]
async fn ingress_emits_ldu1_after_nine_frames() {
    let (mut bridge, peer, _sink) = make_bridge(test_config());

    // Three 480-sample chunks cover nine 20 ms vocoder frames.
    for _ in 0..3 {
        bridge.process_rx_pcm(&speech(480), None).await.unwrap();
    }

    let voice = peer.voice_frames();
    assert_eq!(voice.len(), 1, "expected exactly one LDU1");
    let ldu1 = &voice[0];
    assert_eq!(ldu1.payload.len(), LDU_PAYLOAD_LEN);
    assert_eq!(ldu1.payload[0], P25_DUID_LDU1);
    // First LDU of a stream restarts the FNE packet counter.
    assert_eq!(ldu1.pkt_seq, 0);
    assert_ne!(ldu1.stream_id, 0);

    let (frame, lc) = VoiceSuperFrame::unpack_ldu1(&ldu1.payload).unwrap();
    assert_eq!(lc.src_id, 1234567);
    assert_eq!(lc.dst_id, 9000);
    assert!(!frame.codeword(0).iter().all(|&b| b == 0));
}

#[tokio::test]
async fn ingress_alternates_ldu1_and_ldu2() {
    let (mut bridge, peer, _sink) = make_bridge(test_config());

    // 36 frames = two full LDU1/LDU2 super-frame pairs.
    for _ in 0..12 {
        bridge.process_rx_pcm(&speech(480), None).await.unwrap();
    }

    let voice = peer.voice_frames();
    assert_eq!(voice.len(), 4);
    assert_eq!(voice[0].payload[0], P25_DUID_LDU1);
    assert_eq!(voice[1].payload[0], P25_DUID_LDU2);
    assert_eq!(voice[2].payload[0], P25_DUID_LDU1);
    assert_eq!(voice[3].payload[0], P25_DUID_LDU2);

    // Packet sequence is monotonic within the stream after the reset.
    let seqs: Vec<u16> = voice.iter().map(|f| f.pkt_seq).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
    // One stream id across the whole transmission.
    assert!(voice.iter().all(|f| f.stream_id == voice[0].stream_id));
}

#[tokio::test]
async fn ingress_silence_does_not_open_call() {
    let (mut bridge, peer, _sink) = make_bridge(test_config());

    for _ in 0..10 {
        bridge.process_rx_pcm(&[0i16; 480], None).await.unwrap();
    }
    assert!(!bridge.tx_in_call());
    assert!(peer.frames().is_empty());
}

#[tokio::test]
async fn ingress_grant_demand_precedes_voice() {
    let config = BridgeConfig { grant_demand: true, ..test_config() };
    let (mut bridge, peer, _sink) = make_bridge(config);

    bridge.process_rx_pcm(&speech(480), None).await.unwrap();

    let frames = peer.frames();
    assert!(!frames.is_empty());
    assert_eq!(frames[0].payload[0], P25_DUID_TDU);
    assert!(zellolink_dfsi_core::ldu::tdu_grant_demand(&frames[0].payload));
}

#[tokio::test]
async fn ingress_drop_timer_ends_call_with_terminator() {
    let (mut bridge, peer, _sink) = make_bridge(test_config());

    bridge.process_rx_pcm(&speech(480), None).await.unwrap();
    assert!(bridge.tx_in_call());

    tokio::time::sleep(Duration::from_millis(150)).await;
    bridge.process_rx_pcm(&[0i16; 480], None).await.unwrap();

    assert!(!bridge.tx_in_call());
    assert_eq!(peer.terminators().len(), 1);
}

#[tokio::test]
async fn ingress_zello_stream_end_terminates_call() {
    let (mut bridge, peer, _sink) = make_bridge(test_config());

    bridge.process_rx_pcm(&speech(480), None).await.unwrap();
    bridge.on_zello_stream_end().await.unwrap();

    assert!(!bridge.tx_in_call());
    assert_eq!(peer.terminators().len(), 1);
}

#[tokio::test]
async fn ingress_alias_overrides_source_id() {
    let aliases = AliasMap::from_yaml(
        "zelloAliases:\n  - rid: 555\n    alias: \"Alice\"\n",
    )
    .unwrap();
    let config = BridgeConfig { override_source_id: true, ..test_config() };
    let peer = Arc::new(RecordingPeer::default());
    let sink = Arc::new(RecordingSink::default());
    let mut bridge = CallBridge::new(config, peer.clone(), sink, aliases);

    for _ in 0..3 {
        bridge.process_rx_pcm(&speech(480), Some("Alice")).await.unwrap();
    }

    let voice = peer.voice_frames();
    let (_, lc) = VoiceSuperFrame::unpack_ldu1(&voice[0].payload).unwrap();
    assert_eq!(lc.src_id, 555);
}

#[tokio::test]
async fn egress_two_ldus_deliver_three_blocks() {
    let (mut bridge, _peer, sink) = make_bridge(test_config());

    let stream = 31337;
    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU1, 42, 9000, stream, clear_ldu1(42, 9000)))
        .await
        .unwrap();
    assert!(bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 1);

    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU2, 42, 9000, stream, clear_ldu2(42, 9000)))
        .await
        .unwrap();

    // 18 codewords decode to 2880 samples: three 960-sample blocks.
    let blocks = sink.blocks.lock().unwrap().clone();
    assert_eq!(blocks.len(), 3);
    assert!(blocks.iter().all(|b| b.len() == 960));

    bridge
        .on_p25_data(&p25_event(P25_DUID_TDU, 42, 9000, stream, vec![P25_DUID_TDU; 24]))
        .await
        .unwrap();
    assert!(!bridge.rx_in_call());
    assert_eq!(sink.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn egress_other_talkgroup_ignored() {
    let (mut bridge, _peer, sink) = make_bridge(test_config());

    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU1, 42, 8000, 5, clear_ldu1(42, 8000)))
        .await
        .unwrap();

    assert!(!bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn egress_encrypted_call_never_reaches_zello() {
    let (mut bridge, _peer, sink) = make_bridge(test_config());

    let stream = 999;
    // Header-valid trailer with an AES algorithm id.
    let mut encrypted = clear_ldu1(42, 9000);
    encrypted[LDU_HEADER_LEN + LDU_TRAILER_ALGID_OFFSET] = 0x84;

    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU1, 42, 9000, stream, encrypted))
        .await
        .unwrap();
    assert!(!bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 0);

    // Later clear frames of the same stream stay ignored.
    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU1, 42, 9000, stream, clear_ldu1(42, 9000)))
        .await
        .unwrap();
    assert_eq!(sink.started.load(Ordering::SeqCst), 0);
    assert!(sink.blocks.lock().unwrap().is_empty());

    // Terminator restores idle; a fresh clear stream bridges again.
    bridge
        .on_p25_data(&p25_event(P25_DUID_TDU, 42, 9000, stream, vec![P25_DUID_TDU; 24]))
        .await
        .unwrap();
    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU1, 42, 9000, 1000, clear_ldu1(42, 9000)))
        .await
        .unwrap();
    assert!(bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn egress_bad_markers_dropped_silently() {
    let (mut bridge, _peer, sink) = make_bridge(test_config());

    let mut corrupted = clear_ldu1(42, 9000);
    corrupted[LDU_HEADER_LEN + FRAME_MARKER_OFFSETS[3]] = 0x00;

    bridge
        .on_p25_data(&p25_event(P25_DUID_LDU1, 42, 9000, 5, corrupted))
        .await
        .unwrap();

    assert!(!bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 0);
    assert!(sink.blocks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn page_command_emits_call_alert_tsbk() {
    let (mut bridge, peer, _sink) = make_bridge(test_config());

    bridge.on_radio_command("page", 9001).await.unwrap();

    let tsbks = peer.tsbks.lock().unwrap().clone();
    assert_eq!(tsbks.len(), 1);
    let tsbk = Tsbk::decode(&tsbks[0]).unwrap();
    assert_eq!(tsbk.opcode, P25_TSBK_IOSP_CALL_ALRT);
    assert_eq!(tsbk.src_id, 1234567);
    assert_eq!(tsbk.dst_id, 9001);
}

fn dmr_config() -> BridgeConfig {
    BridgeConfig { tx_mode: TxMode::Dmr, dmr_slot: 1, ..test_config() }
}

/// A DMR voice burst of vocoded silence addressed to the test talkgroup.
fn dmr_voice_burst(src: u32, dst: u32, slot: u8, burst: u8) -> Vec<u8> {
    let mut vocoder = AmbeVocoder::new();
    let cw = vocoder.encode(&[0i16; 160]).unwrap();
    let mut frame = DmrSuperFrame::new();
    for i in 0..3 {
        frame.set_codeword(i, &cw).unwrap();
    }
    frame.pack_voice(&DmrCallInfo {
        frame_type: DMR_DT_VOICE,
        slot,
        dst_id: dst,
        src_id: src,
        peer_id: 1,
        burst,
        flags: 0,
    })
}

fn dmr_control(frame_type: u8, src: u32, dst: u32, slot: u8, flags: u8) -> Vec<u8> {
    let call = DmrCallInfo { frame_type, slot, dst_id: dst, src_id: src, peer_id: 1, burst: 0, flags };
    match frame_type {
        DMR_DT_VOICE_HEADER => zellolink_dfsi_core::dmr::pack_voice_header(&call),
        _ => zellolink_dfsi_core::dmr::pack_terminator(&call),
    }
}

fn dmr_event(duid: u8, src: u32, dst: u32, slot: u8, stream_id: u32, payload: Vec<u8>) -> P25Data {
    P25Data {
        peer_id: 1,
        src_id: src,
        dst_id: dst,
        call_type: slot,
        duid,
        frame_type: 0,
        stream_id,
        data: Bytes::from(payload),
    }
}

#[tokio::test]
async fn dmr_ingress_emits_header_then_bursts() {
    let (mut bridge, peer, _sink) = make_bridge(dmr_config());

    // Nine 20 ms frames make three DMR bursts.
    for _ in 0..3 {
        bridge.process_rx_pcm(&speech(480), None).await.unwrap();
    }

    let frames = peer.frames();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].payload[0], DMR_DT_VOICE_HEADER);

    let bursts = &frames[1..];
    for (i, sent) in bursts.iter().enumerate() {
        assert_eq!(sent.payload.len(), DMR_VOICE_PAYLOAD_LEN);
        assert_eq!(sent.payload[0], DMR_DT_VOICE);
        let (frame, info) = DmrSuperFrame::unpack_voice(&sent.payload).unwrap();
        assert_eq!(info.slot, DMR_SLOT1);
        assert_eq!(info.src_id, 1234567);
        assert_eq!(info.dst_id, 9000);
        assert_eq!(info.burst, i as u8);
        assert!(!frame.codeword(0).iter().all(|&b| b == 0));
    }

    // The first burst restarts the FNE packet counter.
    let seqs: Vec<u16> = bursts.iter().map(|f| f.pkt_seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert!(bursts.iter().all(|f| f.stream_id == bursts[0].stream_id));
}

#[tokio::test]
async fn dmr_ingress_drop_timer_sends_dmr_terminator() {
    let (mut bridge, peer, _sink) = make_bridge(dmr_config());

    bridge.process_rx_pcm(&speech(480), None).await.unwrap();
    assert!(bridge.tx_in_call());

    tokio::time::sleep(Duration::from_millis(150)).await;
    bridge.process_rx_pcm(&[0i16; 480], None).await.unwrap();

    assert!(!bridge.tx_in_call());
    let frames = peer.frames();
    assert_eq!(frames.last().unwrap().payload[0], DMR_DT_TERMINATOR);
}

#[tokio::test]
async fn dmr_egress_two_bursts_deliver_one_block() {
    let (mut bridge, _peer, sink) = make_bridge(dmr_config());

    let stream = 6000;
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_VOICE_HEADER,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_control(DMR_DT_VOICE_HEADER, 42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    assert!(!bridge.rx_in_call(), "header alone must not open a stream");

    for burst in 0..2 {
        bridge
            .on_p25_data(&dmr_event(
                DMR_DT_VOICE,
                42,
                9000,
                DMR_SLOT1,
                stream,
                dmr_voice_burst(42, 9000, DMR_SLOT1, burst),
            ))
            .await
            .unwrap();
    }
    assert!(bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 1);

    // Two bursts decode to 960 samples: exactly one block.
    let blocks = sink.blocks.lock().unwrap().clone();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].len(), 960);

    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_TERMINATOR,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_control(DMR_DT_TERMINATOR, 42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    assert!(!bridge.rx_in_call());
    assert_eq!(sink.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dmr_slots_do_not_collide() {
    let (mut bridge, _peer, sink) = make_bridge(dmr_config());

    let stream = 6100;
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_VOICE,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_voice_burst(42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    assert!(bridge.rx_in_call());

    // A terminator on the other slot leaves the slot-1 call running.
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_TERMINATOR,
            43,
            9000,
            DMR_SLOT2,
            7000,
            dmr_control(DMR_DT_TERMINATOR, 43, 9000, DMR_SLOT2, 0),
        ))
        .await
        .unwrap();
    assert!(bridge.rx_in_call());
    assert_eq!(sink.stopped.load(Ordering::SeqCst), 0);

    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_TERMINATOR,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_control(DMR_DT_TERMINATOR, 42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    assert!(!bridge.rx_in_call());
    assert_eq!(sink.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dmr_private_call_never_reaches_zello() {
    let (mut bridge, _peer, sink) = make_bridge(dmr_config());

    let stream = 6200;
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_VOICE_HEADER,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_control(DMR_DT_VOICE_HEADER, 42, 9000, DMR_SLOT1, DMR_FLAG_PRIVACY),
        ))
        .await
        .unwrap();

    // Clear bursts of the same stream stay ignored.
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_VOICE,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_voice_burst(42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    assert!(!bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 0);
    assert!(sink.blocks.lock().unwrap().is_empty());

    // Terminator restores idle; a fresh clear stream bridges again.
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_TERMINATOR,
            42,
            9000,
            DMR_SLOT1,
            stream,
            dmr_control(DMR_DT_TERMINATOR, 42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    bridge
        .on_p25_data(&dmr_event(
            DMR_DT_VOICE,
            42,
            9000,
            DMR_SLOT1,
            6300,
            dmr_voice_burst(42, 9000, DMR_SLOT1, 0),
        ))
        .await
        .unwrap();
    assert!(bridge.rx_in_call());
    assert_eq!(sink.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inbound_call_alert_is_accepted() {
    let (mut bridge, _peer, sink) = make_bridge(test_config());

    let tsbk = Tsbk::call_alert(42, 1234567).encode();
    bridge
        .on_p25_data(&p25_event(P25_DUID_TSDU, 42, 1234567, 5, tsbk))
        .await
        .unwrap();

    // Logged only; nothing opens toward Zello.
    assert_eq!(sink.started.load(Ordering::SeqCst), 0);
}
