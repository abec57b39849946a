pub mod errors;
pub mod fees;
pub mod outcome;
pub mod shutdown;
