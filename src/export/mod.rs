//! Export functionality: plain-text rendering and attachment extraction.

pub mod attachment;
pub mod text;
