#![deny(unsafe_code)]

pub mod candidate;
pub mod conflict;
pub mod error;
pub mod field;
pub mod ids;
pub mod mapping;

pub use candidate::{
    AiSuggestion, ConfidenceLevel, Factor, FactorBreakdown, MappingCandidate, SCORE_TOLERANCE,
    ScoreContext, score_at_least,
};
pub use conflict::{
    ConflictSeverity, ConflictType, FieldRef, MappingConflict, NewConflict, ResolutionAction,
    ResolutionStatus,
};
pub use error::{ReconError, Result};
pub use field::{FieldDescriptor, ObjectSchema, SchemaSnapshot};
pub use ids::{ConflictId, ConflictKey};
pub use mapping::{FieldMapping, MappingStatus, MappingType, ValidationGate};
