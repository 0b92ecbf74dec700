//! Per-document pipeline stages.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the model backend can be swapped without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ encode ──▶ client ──▶ validate
//! (bytes)   (pdfium)      (JPEG/b64)  (VLM)     (JSON → record)
//! ```
//!
//! 1. [`input`]     — load paths, directories and URLs into in-memory documents
//! 2. [`normalize`] — rasterise page 1 of a PDF, or pass an image through;
//!    runs pdfium in `spawn_blocking`
//! 3. [`encode`]    — JPEG-encode rasters and base64-wrap them for the request
//! 4. [`client`]    — one vision-model call per document; the only stage with
//!    network I/O
//! 5. [`validate`]  — strict JSON parse and schema check of the reply

pub mod client;
pub mod encode;
pub mod input;
pub mod normalize;
pub mod validate;
