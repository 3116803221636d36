// Domain layer - Core business logic

pub mod errors;
pub mod filters;
pub mod model;
pub mod rules;
