pub mod sink;

pub use sink::{SharedSocketSender, WebSocketStatusSink, close_socket};
