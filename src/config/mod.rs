// src/config/mod.rs
pub mod ai;
pub mod service;

pub use ai::AiConfig;
pub use service::ServiceConfig;
