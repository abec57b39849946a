//! Ports: the API this crate offers and the SPI it requires.

pub mod inbound;
pub mod outbound;
