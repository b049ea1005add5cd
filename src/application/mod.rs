pub mod checkout;
pub mod countdown;
pub mod session;
pub mod simulator;
