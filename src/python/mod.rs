//! Python bindings for medprep.

pub mod module;
pub mod preprocessing;
pub mod validation;
