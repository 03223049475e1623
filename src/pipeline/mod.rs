//! Pipeline stages for document-to-study-artifact generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ paginate ──▶ select ──▶ llm ⇄ parse
//! (staging) (blocks)    (pages)      (text)     (retrying generator)
//! ```
//!
//! 1. [`input`]   : detect the format and stage the upload in a per-request
//!    temporary directory that is removed on drop
//! 2. [`extract`] : turn a PDF/DOCX/PPTX into ordered text blocks; runs in
//!    `spawn_blocking` because pdfium and zip parsing are blocking
//! 3. [`paginate`]: group blocks into line-bounded pages for selection
//! 4. [`select`]  : concatenate the text of the pages the user picked
//! 5. [`llm`]     : drive the model with bounded retry/backoff; the only
//!    stage with network I/O
//! 6. [`parse`]   : locate, parse, validate and clean the model's JSON

pub mod extract;
pub mod input;
pub mod llm;
pub mod paginate;
pub mod parse;
pub mod select;
