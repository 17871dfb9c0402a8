// src/config/mod.rs
pub mod router;

pub use router::RouterConfig;
