//! Static resources read from the data directory

pub mod loader;
pub mod records;

pub use records::ReferenceTables;
