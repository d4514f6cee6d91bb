//! Media capture seam

use async_trait::async_trait;

use crate::error::ClientResult;

/// One unit of captured media
#[derive(Debug, Clone, PartialEq)]
pub enum MediaChunk {
    /// Mono float samples at 16 kHz
    Audio(Vec<f32>),
    /// One JPEG-encoded camera frame
    VideoFrame(Vec<u8>),
}

/// Microphone/camera capture
#[async_trait]
pub trait MediaSource: Send {
    /// Ask the user for device access; an error means access was refused
    async fn request_permissions(&mut self) -> ClientResult<()>;

    /// Next captured chunk; `None` once capture has ended
    async fn next_chunk(&mut self) -> Option<MediaChunk>;

    /// Release the devices
    fn stop(&mut self);
}
