//! Seam between the bridge and the Zello session's egress surface.
//!
//! The bridge only needs three operations from the session; putting them
//! behind a trait keeps the egress state machine testable without a
//! socket.

use async_trait::async_trait;
use std::sync::Arc;

use zellolink_zello_core::ZelloSession;

use crate::error::Result;

/// What the egress path asks of the Zello leg.
#[async_trait]
pub trait ZelloAudioSink: Send + Sync {
    /// Open an outbound stream and return its id.
    async fn start_stream(&self) -> Result<u32>;

    /// Close the outbound stream.
    async fn stop_stream(&self) -> Result<()>;

    /// Queue 8 kHz PCM for transmission.
    async fn send_audio(&self, pcm_8k: &[i16]) -> Result<()>;
}

#[async_trait]
impl ZelloAudioSink for ZelloSession {
    async fn start_stream(&self) -> Result<u32> {
        Ok(ZelloSession::start_stream(self).await?)
    }

    async fn stop_stream(&self) -> Result<()> {
        Ok(ZelloSession::stop_stream(self).await?)
    }

    async fn send_audio(&self, pcm_8k: &[i16]) -> Result<()> {
        Ok(ZelloSession::send_audio(self, pcm_8k).await?)
    }
}

#[async_trait]
impl<T: ZelloAudioSink + ?Sized> ZelloAudioSink for Arc<T> {
    async fn start_stream(&self) -> Result<u32> {
        (**self).start_stream().await
    }

    async fn stop_stream(&self) -> Result<()> {
        (**self).stop_stream().await
    }

    async fn send_audio(&self, pcm_8k: &[i16]) -> Result<()> {
        (**self).send_audio(pcm_8k).await
    }
}
