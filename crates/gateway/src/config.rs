//! Gateway configuration.
//!
//! The YAML keys keep their historical camelCase names so existing
//! deployments carry over unchanged. Unknown keys are ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use zellolink_bridge_core::{BridgeConfig, TxMode};
use zellolink_zello_core::ZelloSessionConfig;

/// Complete gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[serde(rename = "zelloUrl")]
    pub zello_url: String,
    #[serde(rename = "zelloUsername")]
    pub zello_username: String,
    #[serde(rename = "zelloPassword")]
    pub zello_password: String,
    #[serde(rename = "zelloChannel")]
    pub zello_channel: String,
    /// Static developer token. When unset, a JWT is minted from
    /// `zelloIssuer` and `zelloPemFilePath`.
    #[serde(rename = "zelloAuthToken")]
    pub zello_auth_token: Option<String>,
    #[serde(rename = "zelloIssuer")]
    pub zello_issuer: Option<String>,
    #[serde(rename = "zelloPemFilePath")]
    pub zello_pem_file_path: Option<PathBuf>,
    /// Keep-alive ping interval in milliseconds.
    #[serde(rename = "zelloPingInterval")]
    pub zello_ping_interval_ms: u64,
    #[serde(rename = "zelloAliasFile")]
    pub zello_alias_file: Option<PathBuf>,

    #[serde(rename = "fneAddress")]
    pub fne_address: String,
    #[serde(rename = "fnePort")]
    pub fne_port: u16,
    #[serde(rename = "peerId")]
    pub peer_id: u32,

    #[serde(rename = "sourceId")]
    pub source_id: u32,
    #[serde(rename = "destinationId")]
    pub destination_id: u32,
    /// 1 = DMR, 2 = P25.
    #[serde(rename = "txMode")]
    pub tx_mode: u8,
    /// TDMA slot for DMR transmit, 1 or 2.
    #[serde(rename = "slot")]
    pub slot: u8,
    #[serde(rename = "overrideSourceIdFromUDP")]
    pub override_source_id_from_udp: bool,
    #[serde(rename = "grantDemand")]
    pub grant_demand: bool,

    #[serde(rename = "rxAudioGain")]
    pub rx_audio_gain: f32,
    #[serde(rename = "txAudioGain")]
    pub tx_audio_gain: f32,
    #[serde(rename = "vocoderDecoderAudioGain")]
    pub vocoder_decoder_audio_gain: f32,
    #[serde(rename = "vocoderEncoderAudioGain")]
    pub vocoder_encoder_audio_gain: f32,
    #[serde(rename = "vocoderDecoderAutoGain")]
    pub vocoder_decoder_auto_gain: bool,

    /// Continuous silence in milliseconds before an ingress call drops.
    #[serde(rename = "dropTimeMs")]
    pub drop_time_ms: u64,

    #[serde(rename = "logLevel")]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            zello_url: zellolink_zello_core::ZELLO_DEFAULT_URL.to_string(),
            zello_username: String::new(),
            zello_password: String::new(),
            zello_channel: String::new(),
            zello_auth_token: None,
            zello_issuer: None,
            zello_pem_file_path: None,
            zello_ping_interval_ms: 30_000,
            zello_alias_file: None,
            fne_address: "127.0.0.1".to_string(),
            fne_port: 62031,
            peer_id: 0,
            source_id: 0,
            destination_id: 0,
            tx_mode: 2,
            slot: 1,
            override_source_id_from_udp: false,
            grant_demand: false,
            rx_audio_gain: 1.0,
            tx_audio_gain: 1.0,
            vocoder_decoder_audio_gain: 1.0,
            vocoder_encoder_audio_gain: 1.0,
            vocoder_decoder_auto_gain: false,
            drop_time_ms: 180,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("parsing gateway configuration")
    }

    /// Resolve the Zello session configuration, reading the PEM key file
    /// when JWT auth is configured.
    pub fn session_config(&self) -> anyhow::Result<ZelloSessionConfig> {
        let private_key_pem = match &self.zello_pem_file_path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading pem file {}", path.display()))?,
            ),
            None => None,
        };
        Ok(ZelloSessionConfig {
            url: self.zello_url.clone(),
            username: self.zello_username.clone(),
            password: self.zello_password.clone(),
            channel: self.zello_channel.clone(),
            auth_token: self.zello_auth_token.clone(),
            issuer: self.zello_issuer.clone(),
            private_key_pem,
            ..Default::default()
        })
    }

    /// Resolve the bridge configuration.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            source_id: self.source_id,
            destination_id: self.destination_id,
            peer_id: self.peer_id,
            tx_mode: self.tx_mode_enum(),
            dmr_slot: self.slot,
            override_source_id: self.override_source_id_from_udp,
            grant_demand: self.grant_demand,
            rx_audio_gain: self.rx_audio_gain,
            tx_audio_gain: self.tx_audio_gain,
            vocoder_decoder_gain: self.vocoder_decoder_audio_gain,
            vocoder_encoder_gain: self.vocoder_encoder_audio_gain,
            vocoder_decoder_auto_gain: self.vocoder_decoder_auto_gain,
            drop_time: Duration::from_millis(self.drop_time_ms),
        }
    }

    /// Transmit mode as an enum; anything other than 1 means P25.
    pub fn tx_mode_enum(&self) -> TxMode {
        if self.tx_mode == 1 {
            TxMode::Dmr
        } else {
            TxMode::P25
        }
    }

    /// Keep-alive interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.zello_ping_interval_ms)
    }
}
