pub mod method;
pub mod ports;
pub mod transaction;
