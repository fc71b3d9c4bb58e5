//! Document ingestion: extraction and chunking

pub mod chunker;
pub mod parser;
pub mod processor;

pub use chunker::{ChunkSpan, ChunkingStrategy, TextChunker};
pub use parser::{ExtractedText, FileParser};
pub use processor::{IngestOutcome, IngestPipeline};
