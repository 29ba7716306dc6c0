//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step and is generic
//! over the [`crate::engine`] traits, so every stage can be tested without a
//! pdfium library.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ split ──▶ page × N ──▶ (ordered join in convert)
//!                         ├─ tables     detect, render, validate
//!                         └─ normalize  clean prose blocks
//! ```
//!
//! 1. [`split`]: re-serialise each page as its own PDF so workers share
//!    nothing
//! 2. [`page`]: reopen one page, assemble its Markdown section; never
//!    fails
//! 3. [`tables`]: ruled-line detection with a text-alignment fallback,
//!    then a digit/length plausibility check
//! 4. [`normalize`]: hyphenation repair and whitespace cleanup for prose

pub mod normalize;
pub mod page;
pub mod split;
pub mod tables;
