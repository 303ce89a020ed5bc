pub mod manager;
pub mod multiplexer;
pub mod session;
