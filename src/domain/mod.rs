//! Domain types and pure rules of the exchange desk.

pub mod asset;
pub mod event;
pub mod order;
pub mod ports;
pub mod quote;
pub mod receipt;
pub mod reply;
pub mod session;
pub mod wallet;
