//! The codec seam used by the quality search and the processor.

use crate::config::EncodeSettings;
use crate::decode::DecodeRequest;
use crate::encode::EncodeRequest;
use crate::source::SourceImage;
use crate::{CodecError, Limits, Quality};

/// Decode and quality-parameterized encode.
///
/// Implementations must be deterministic: the same image, quality and
/// settings always produce the same bytes. The search relies on this to make
/// the difference it measures the difference the final output has.
pub trait Codec {
    fn decode(&self, data: &[u8]) -> Result<SourceImage, CodecError>;

    /// Encode `image` in its own format.
    fn encode(
        &self,
        image: &SourceImage,
        quality: Quality,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, CodecError>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn decode(&self, data: &[u8]) -> Result<SourceImage, CodecError> {
        (**self).decode(data)
    }

    fn encode(
        &self,
        image: &SourceImage,
        quality: Quality,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, CodecError> {
        (**self).encode(image, quality, settings)
    }
}

/// The default codec: JPEG and PNG through [`DecodeRequest`] and
/// [`EncodeRequest`].
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    limits: Limits,
}

impl ImageCodec {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

impl Codec for ImageCodec {
    fn decode(&self, data: &[u8]) -> Result<SourceImage, CodecError> {
        DecodeRequest::new(data).with_limits(&self.limits).decode()
    }

    fn encode(
        &self,
        image: &SourceImage,
        quality: Quality,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, CodecError> {
        EncodeRequest::new()
            .with_quality(quality)
            .with_settings(settings)
            .encode(image)
    }
}
