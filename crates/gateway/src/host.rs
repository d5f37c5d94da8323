//! Gateway host: composition and lifecycle.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};

use zellolink_bridge_core::CallBridge;
use zellolink_dfsi_core::{FnePeer, PeerEvent};
use zellolink_zello_core::{
    AliasMap, KeepAlive, KeepAliveEvent, SessionEvent, ZelloSession,
};

use crate::config::GatewayConfig;

/// The composed gateway: one Zello session, one FNE peer, one bridge.
pub struct GatewayHost {
    session: Arc<ZelloSession>,
    bridge: CallBridge,
    keepalive: KeepAlive,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
    keepalive_events: mpsc::UnboundedReceiver<KeepAliveEvent>,
    peer_events: mpsc::UnboundedReceiver<PeerEvent>,
}

impl GatewayHost {
    /// Wire the gateway components together. The FNE transport is
    /// provided by the caller along with its event channel.
    pub fn new(
        config: &GatewayConfig,
        peer: Arc<dyn FnePeer>,
        peer_events: mpsc::UnboundedReceiver<PeerEvent>,
    ) -> anyhow::Result<Self> {
        let aliases = match &config.zello_alias_file {
            Some(path) => AliasMap::load(Path::new(path)).context("loading alias file")?,
            None => AliasMap::default(),
        };

        let (session, session_events) =
            ZelloSession::new(config.session_config()?).context("creating zello session")?;
        let (keepalive, keepalive_events) = KeepAlive::new(config.ping_interval());

        let bridge = CallBridge::new(
            config.bridge_config(),
            peer,
            session.clone(),
            aliases,
        );

        Ok(Self {
            session,
            bridge,
            keepalive,
            session_events,
            keepalive_events,
            peer_events,
        })
    }

    /// Run until interrupted, then shut down in order.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.session.start().await.context("initial zello connection")?;
        self.keepalive.start();
        info!("gateway running");

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                event = self.session_events.recv() => match event {
                    Some(SessionEvent::Pcm { samples, from }) => {
                        if let Err(e) = self.bridge.process_rx_pcm(&samples, from.as_deref()).await {
                            warn!(error = %e, "ingress audio failed");
                        }
                    }
                    Some(SessionEvent::StreamEnd) => {
                        if let Err(e) = self.bridge.on_zello_stream_end().await {
                            warn!(error = %e, "stream end handling failed");
                        }
                    }
                    Some(SessionEvent::RadioCommand { command, dst_id }) => {
                        if let Err(e) = self.bridge.on_radio_command(&command, dst_id).await {
                            warn!(error = %e, "radio command failed");
                        }
                    }
                    Some(SessionEvent::Disconnected) => {
                        warn!("zello link lost, reconnect driver engaged");
                    }
                    None => break,
                },
                event = self.peer_events.recv() => match event {
                    Some(PeerEvent::P25Data(data)) => {
                        if let Err(e) = self.bridge.on_p25_data(&data).await {
                            warn!(error = %e, "egress frame failed");
                        }
                    }
                    Some(PeerEvent::Connected { peer_id }) => {
                        info!(peer_id, "fne peer connected");
                    }
                    None => break,
                },
                event = self.keepalive_events.recv() => match event {
                    Some(KeepAliveEvent::Ping) => {
                        if let Err(e) = self.session.send_ping().await {
                            warn!(error = %e, "keep-alive ping failed");
                        }
                    }
                    None => break,
                },
                result = &mut ctrl_c => {
                    result.context("listening for shutdown signal")?;
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Ordered teardown: keep-alive first, then any open streams on both
    /// legs, then the socket. Codecs drop with the bridge.
    async fn shutdown(mut self) {
        self.keepalive.stop();
        if let Err(e) = self.bridge.on_zello_stream_end().await {
            warn!(error = %e, "failed to terminate radio-bound call");
        }
        if let Err(e) = self.session.stop_stream().await {
            warn!(error = %e, "failed to stop zello stream");
        }
        self.session.close().await;
        info!("gateway stopped");
    }
}
