//! Validation and submission pipeline for the applicant form.

pub mod assembler;
pub mod attachment;
pub mod collector;
pub mod gate;
pub mod profile;
pub mod sanitize;
pub mod validator;
