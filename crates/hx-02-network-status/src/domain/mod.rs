//! Pure registry, selection and transition logic.

pub mod registry;
pub mod selection;
pub mod transitions;
