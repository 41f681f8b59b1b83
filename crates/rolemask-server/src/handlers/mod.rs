//! Route handlers, one module per resource.

pub mod jobs;
pub mod preview;
pub mod rules;
pub mod settings;
pub mod subjects;
