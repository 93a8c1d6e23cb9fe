pub mod cache;
pub mod ddox;
pub mod error;
pub mod index;
pub mod symbols;

// Re-export selected API for consumers
pub use error::SymbolError;
pub use index::DocsIndex;
pub use symbols::{SymbolEntry, SymbolKind, SymbolTable};
