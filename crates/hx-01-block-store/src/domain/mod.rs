//! Domain layer: key layout, height index and errors.

pub mod errors;
pub mod index;
pub mod keys;
