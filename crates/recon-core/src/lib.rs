#![deny(unsafe_code)]

pub mod detection;
pub mod ledger;
pub mod policy;

pub use detection::{ConflictScope, detect_conflicts};
pub use ledger::ConflictLedger;
pub use policy::{
    AutoResolution, AutoResolvePolicy, ObjectCandidates, PolicyContext, SingleHighConfidence,
    apply_policy,
};
