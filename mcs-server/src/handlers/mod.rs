//! HTTP and WebSocket handlers for the `/process` surface

pub mod catalogs;
pub mod health;
pub mod sequence_ws;
pub mod sequences;
