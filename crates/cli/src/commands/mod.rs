//! CLI command implementations

pub mod airports;
pub mod predict;
pub mod status;
