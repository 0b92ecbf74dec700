//! Image normalisation: turn a [`SourceDocument`] into one [`RenderedImage`].
//!
//! PDFs are rasterised (first page only) through pdfium; raster images pass
//! through untouched. pdfium is blocking and keeps thread-local state, so the
//! rasterisation runs inside `spawn_blocking`.
//!
//! The pdfium binding, document and page are plain RAII values scoped to
//! [`rasterise_first_page`]; every return path, including the zero-page and
//! error paths, drops them before the function returns.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::pipeline::encode::{encode_jpeg, RenderedImage};
use crate::pipeline::input::{extension_of, DocumentKind, SourceDocument};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Readers accept the `%PDF` header anywhere in the first 1024 bytes.
const PDF_HEADER_WINDOW: usize = 1024;

/// Produce the model-ready image for a document.
pub async fn normalize(
    document: &SourceDocument,
    config: &ExtractionConfig,
) -> Result<RenderedImage, DocumentError> {
    match document.kind() {
        DocumentKind::Unsupported => Err(DocumentError::UnsupportedFormat {
            extension: extension_of(document.filename()),
        }),
        DocumentKind::Image => {
            if document.bytes().is_empty() {
                return Err(DocumentError::render("image file is empty"));
            }
            debug!("{}: passing image through unchanged", document.filename());
            Ok(RenderedImage::new(
                document.bytes().to_vec(),
                document.image_mime_type(),
            ))
        }
        DocumentKind::Pdf => {
            let bytes = document.bytes().to_vec();
            let scale = config.render_scale;
            let max_pixels = config.max_rendered_pixels;
            let quality = config.jpeg_quality;

            tokio::task::spawn_blocking(move || {
                rasterise_first_page(&bytes, scale, max_pixels, quality)
            })
            .await
            .map_err(|e| DocumentError::render(format!("render task panicked: {e}")))?
        }
    }
}

/// Blocking rasterisation of page 1 → JPEG.
pub fn rasterise_first_page(
    pdf_bytes: &[u8],
    scale: f32,
    max_pixels: u32,
    quality: u8,
) -> Result<RenderedImage, DocumentError> {
    if pdf_bytes.is_empty() {
        return Err(DocumentError::render("PDF file is empty"));
    }
    if !has_pdf_header(pdf_bytes) {
        let head: Vec<u8> = pdf_bytes.iter().take(4).copied().collect();
        return Err(DocumentError::render(format!(
            "not a PDF (first bytes: {head:?})"
        )));
    }

    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| DocumentError::render(format!("cannot open PDF: {e:?}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(DocumentError::render("PDF has no pages"));
    }
    info!("PDF loaded: {} page(s), rendering page 1", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let page = pages
        .get(0)
        .map_err(|e| DocumentError::render(format!("cannot load page 1: {e:?}")))?;

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| DocumentError::render(format!("cannot render page 1: {e:?}")))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    encode_jpeg(&image, quality)
        .map_err(|e| DocumentError::render(format!("JPEG encoding failed: {e}")))
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(PDF_HEADER_WINDOW)]
        .windows(PDF_MAGIC.len())
        .any(|w| w == PDF_MAGIC)
}

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH` (path to the library file), the
/// platform library in the working directory, then the system library.
fn bind_pdfium() -> Result<Pdfium, DocumentError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        if !path.is_empty() {
            return Pdfium::bind_to_library(Path::new(&path))
                .map(Pdfium::new)
                .map_err(|e| {
                    DocumentError::render(format!(
                        "cannot bind pdfium from PDFIUM_LIB_PATH={path}: {e:?}"
                    ))
                });
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| {
            DocumentError::render(format!(
                "cannot bind pdfium library: {e:?} (set PDFIUM_LIB_PATH to an existing libpdfium)"
            ))
        })
}
