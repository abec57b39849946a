//! Inbound API and outbound SPI of the chain sync subsystem.

pub mod inbound;
pub mod outbound;
