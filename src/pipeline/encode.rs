//! Image encoding: rasterised page → JPEG bytes, and any
//! [`RenderedImage`] → base64 attachment for the model request.
//!
//! Rasterised drawings are JPEG-encoded at high quality rather than PNG:
//! a 2× render of an A1 sheet is several megapixels of mostly white paper,
//! and JPEG at quality 95 keeps fine dimension text legible at a fraction of
//! the PNG payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// A single encoded raster ready to be attached to a model request.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
    dimensions: Option<(u32, u32)>,
}

impl RenderedImage {
    pub fn new(bytes: Vec<u8>, mime_type: &'static str) -> Self {
        Self {
            bytes,
            mime_type,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Pixel size, known only for images this crate rasterised.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>` form for embedding in a request body.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Attachment for `edgequake_llm` chat messages.
    pub fn to_image_data(&self, detail: &str) -> ImageData {
        let b64 = self.to_base64();
        debug!("Encoded image → {} bytes base64", b64.len());
        ImageData::new(b64, self.mime_type).with_detail(detail)
    }
}

impl std::fmt::Debug for RenderedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// Flatten to RGB and JPEG-encode at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<RenderedImage, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    debug!(
        "JPEG-encoded {}x{} px at q{} → {} bytes",
        rgb.width(),
        rgb.height(),
        quality,
        buf.len()
    );
    Ok(RenderedImage::new(buf, "image/jpeg").with_dimensions(rgb.width(), rgb.height()))
}
