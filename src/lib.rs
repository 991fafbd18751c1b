//! Pipegrab - Multi-Mirror Video Retrieval
//!
//! Resolves a video identifier against a pool of equivalent Piped API
//! mirrors, downloads the best-ranked stream pair, and assembles a single
//! browser-compatible mp4 file using ffmpeg when a separate audio stream
//! needs merging.

pub mod assembler;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod mirrors;
pub mod mux;
pub mod resolver;
pub mod retriever;

#[cfg(test)]
mod testutil;
