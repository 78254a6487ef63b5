//! Color profile and EXIF carried from the source into every re-encoding.

pub(crate) const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Metadata preserved across re-encoding.
///
/// The ICC profile decides how the pixels are colored and the EXIF
/// orientation tag decides which way up they are shown, so dropping either
/// changes the picture even when every pixel value survives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    /// ICC color profile.
    pub icc_profile: Option<Vec<u8>>,
    /// EXIF as a bare TIFF stream, without the JPEG `Exif\0\0` prefix.
    pub exif: Option<Vec<u8>>,
}

impl ImageMetadata {
    /// No metadata.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_icc_profile(mut self, icc: Vec<u8>) -> Self {
        self.icc_profile = Some(icc);
        self
    }

    /// Set EXIF. A leading `Exif\0\0` marker prefix is removed.
    pub fn with_exif(mut self, exif: Vec<u8>) -> Self {
        self.exif = Some(strip_exif_prefix(exif));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.icc_profile.is_none() && self.exif.is_none()
    }

    /// Whether the ICC profile describes an RGB color space. Such a profile
    /// cannot be attached to a grayscale encoding.
    pub fn has_rgb_profile(&self) -> bool {
        self.icc_color_space() == Some(b"RGB ".as_slice())
    }

    /// What an encode with `grayscale` channels may embed.
    pub(crate) fn embed_for(&self, grayscale: bool) -> EmbeddedMetadata<'_> {
        EmbeddedMetadata {
            icc_profile: self.icc_for(grayscale),
            exif: self.exif.as_deref(),
        }
    }

    /// The ICC profile, if its color space matches the encoded channels.
    fn icc_for(&self, grayscale: bool) -> Option<&[u8]> {
        let wanted: &[u8] = if grayscale { b"GRAY" } else { b"RGB " };
        match self.icc_color_space() {
            Some(space) if space == wanted => self.icc_profile.as_deref(),
            Some(space) => {
                tracing::debug!(
                    profile = %String::from_utf8_lossy(space),
                    grayscale,
                    "dropping ICC profile that does not match the output channels"
                );
                None
            }
            None => None,
        }
    }

    fn icc_color_space(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref().and_then(|icc| icc.get(16..20))
    }
}

/// Borrowed metadata handed to an encoder.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EmbeddedMetadata<'a> {
    pub icc_profile: Option<&'a [u8]>,
    /// Bare TIFF stream.
    pub exif: Option<&'a [u8]>,
}

fn strip_exif_prefix(exif: Vec<u8>) -> Vec<u8> {
    match exif.strip_prefix(EXIF_PREFIX) {
        Some(tiff) => tiff.to_vec(),
        None => exif,
    }
}
