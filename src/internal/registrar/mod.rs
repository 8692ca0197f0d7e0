pub mod source_registrar;

pub use source_registrar::{Registration, SourceRegistrar};
