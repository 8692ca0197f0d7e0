pub mod config;
pub mod host;
pub mod logger;
pub mod registrar;
pub mod writer;
