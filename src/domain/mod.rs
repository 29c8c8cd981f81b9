pub mod ports;
pub mod reference;
pub mod session;
