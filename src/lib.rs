//! Taggrr - video collection organizer
//!
//! Extracts identifiers from loosely structured folder and file names, groups
//! multi-part files, scores candidate matches and plans a deterministic,
//! collision-free output layout.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod extraction;
pub mod grouping;
pub mod patterns;
pub mod pipeline;
pub mod planning;
pub mod scanner;
pub mod scoring;

pub use error::{Result, TaggrrError};
