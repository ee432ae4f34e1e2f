#![deny(unsafe_code)]

pub mod error;
pub mod rules;

pub use crate::error::{Result, RulesError};
pub use crate::rules::{
    ContextAdjustment, FactorWeights, LevelThresholds, NamingRules, ReconcileRules,
    RequiredPenalties, TypeRules, ValidatorRules,
};
