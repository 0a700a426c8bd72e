pub mod capture_process;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod parsing;
pub mod session_management;
pub mod web_interface;
pub mod wireless;
