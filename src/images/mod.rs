pub mod naming;
pub mod services;
