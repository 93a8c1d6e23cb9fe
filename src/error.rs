use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("symbol `{0}` not found")]
    NotFound(String),

    #[error("line {line}: unknown symbol kind `{kind}`")]
    UnknownKind { kind: String, line: usize },

    #[error("line {line}: malformed symbol index line `{content}`")]
    Malformed { line: usize, content: String },

    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
