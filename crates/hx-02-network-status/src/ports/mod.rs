//! Inbound API and outbound SPI of the network status subsystem.

pub mod inbound;
pub mod outbound;
