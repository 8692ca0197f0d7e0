// src/internal/logger/mod.rs

pub mod logger;

// Export the init_logger function
pub use logger::init_logger;
