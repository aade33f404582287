pub mod chunker;
pub mod extractor;
pub mod loader;
pub mod page;

pub use chunker::{
    compute_chunks, get_chunk_text, ChunkBoundary, ChunkStrategy, ChunkingResult, DocumentChunker,
};
pub use extractor::{extractor_for, PageExtractor};
pub use loader::DocumentLoader;
pub use page::Page;
