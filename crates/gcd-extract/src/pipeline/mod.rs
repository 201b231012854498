//! Paged source reading and the resumable batch driver

pub mod driver;
pub mod source;

pub use driver::{BatchDriver, DriverError, ExtractionSummary};
pub use source::{MemoryRowSource, PgRowSource, RowSource, SourceQuery, SourceRow};
