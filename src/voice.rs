//! Speech collaborator. Delivery is best-effort; callers never wait on it.

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use crate::db::models::Verdict;

#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, verdict: Verdict, message: &str) -> Result<()>;
}

/// Default sink when voice is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeech;

#[async_trait]
impl SpeechSink for SilentSpeech {
    async fn speak(&self, _verdict: Verdict, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes each utterance to the log instead of an audio device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeech;

#[async_trait]
impl SpeechSink for LogSpeech {
    async fn speak(&self, verdict: Verdict, message: &str) -> Result<()> {
        info!("🔊 [{}] {message}", verdict.label());
        Ok(())
    }
}
