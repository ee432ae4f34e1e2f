//! Library half of the `recon` binary: ingestion, logging and rendering.

#![deny(unsafe_code)]

pub mod ingest;
pub mod logging;
pub mod render;
