#![deny(unsafe_code)]

pub mod engine;
pub mod normalize;
pub mod score;
pub mod similarity;

pub use engine::{CandidateGenerator, DEFAULT_THRESHOLD, GeneratorOptions};
pub use normalize::{normalize_field_name, normalize_text};
pub use score::ConfidenceScorer;
