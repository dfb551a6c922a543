pub mod device;
pub mod quick_check;
pub mod session;
