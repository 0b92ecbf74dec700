//! Input resolution: turn user-supplied paths, directories and URLs into
//! in-memory [`SourceDocument`]s.
//!
//! Documents are held as bytes rather than paths because pdfium can load
//! from a byte slice and images are forwarded untouched. An input that cannot
//! be read still yields exactly one entry ([`LoadedInput::Failed`]) so the
//! batch keeps one result per requested document.

use crate::error::DocumentError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Document kind inferred from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Unsupported,
}

impl DocumentKind {
    /// Classify by extension, case-insensitively: `pdf`, `png`, `jpg`, `jpeg`.
    pub fn from_filename(filename: &str) -> Self {
        match extension_of(filename).as_str() {
            "pdf" => DocumentKind::Pdf,
            "png" | "jpg" | "jpeg" => DocumentKind::Image,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// Lower-cased text after the last `.`, or an empty string.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// An uploaded drawing. Immutable once created.
#[derive(Clone)]
pub struct SourceDocument {
    filename: String,
    bytes: Vec<u8>,
    kind: DocumentKind,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let kind = DocumentKind::from_filename(&filename);
        Self {
            filename,
            bytes,
            kind,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// MIME type for passthrough images.
    pub fn image_mime_type(&self) -> &'static str {
        match extension_of(&self.filename).as_str() {
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("filename", &self.filename)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Outcome of loading one requested input.
#[derive(Debug)]
pub enum LoadedInput {
    Document(SourceDocument),
    Failed {
        filename: String,
        error: DocumentError,
    },
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, in order. Directories expand to the supported
/// drawings they contain, sorted by filename.
pub async fn resolve_inputs(inputs: &[String], timeout_secs: u64) -> Vec<LoadedInput> {
    let mut loaded = Vec::with_capacity(inputs.len());
    for input in inputs {
        if is_url(input) {
            loaded.push(download_url(input, timeout_secs).await);
            continue;
        }
        let path = PathBuf::from(input);
        if path.is_dir() {
            match list_directory(&path) {
                Ok(files) => {
                    info!("{}: {} drawing(s) found", path.display(), files.len());
                    for file in files {
                        loaded.push(load_local(&file).await);
                    }
                }
                Err(e) => loaded.push(LoadedInput::Failed {
                    filename: input.clone(),
                    error: DocumentError::render(format!("cannot list directory: {e}")),
                }),
            }
        } else {
            loaded.push(load_local(&path).await);
        }
    }
    loaded
}

/// Supported drawings directly inside `dir`, sorted by filename.
fn list_directory(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if DocumentKind::from_filename(&name) != DocumentKind::Unsupported {
            files.push(path);
        } else {
            debug!("Skipping non-drawing file {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// Read a local file. Unsupported extensions are not read at all; the
/// normaliser rejects them without touching the payload.
async fn load_local(path: &Path) -> LoadedInput {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    if DocumentKind::from_filename(&filename) == DocumentKind::Unsupported {
        return LoadedInput::Document(SourceDocument::new(filename, Vec::new()));
    }

    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
            LoadedInput::Document(SourceDocument::new(filename, bytes))
        }
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            LoadedInput::Failed {
                filename,
                error: DocumentError::render(format!("cannot read '{}': {e}", path.display())),
            }
        }
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> LoadedInput {
    info!("Downloading drawing from: {}", url);
    let filename = extract_filename(url);

    let fail = |reason: String| LoadedInput::Failed {
        filename: filename.clone(),
        error: DocumentError::render(format!("download of '{url}' failed: {reason}")),
    };

    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(e) => return fail(e.to_string()),
    };

    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return fail(format!("timed out after {timeout_secs}s")),
        Err(e) => return fail(e.to_string()),
    };

    if !response.status().is_success() {
        return fail(format!("HTTP {}", response.status()));
    }

    match response.bytes().await {
        Ok(bytes) => {
            info!("Downloaded {} ({} bytes)", filename, bytes.len());
            LoadedInput::Document(SourceDocument::new(filename.clone(), bytes.to_vec()))
        }
        Err(e) => fail(e.to_string()),
    }
}

/// Last path segment of the URL when it carries an extension.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
