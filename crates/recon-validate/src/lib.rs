#![deny(unsafe_code)]

mod report;
mod validator;

pub use report::{ValidationReport, ValidationWarning};
pub use validator::MappingValidator;
