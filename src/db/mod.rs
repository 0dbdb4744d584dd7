//! Vector stores.
//!
//! The indexer writes records through [`VectorStore`] and the retriever reads
//! them back. Two backends are provided:
//! - `in-memory` (always available) - exact cosine search, optional JSON snapshot
//! - `supabase` - PostgREST table plus the `match_documents` RPC
//!
//! Enable providers via Cargo features:
//! ```toml
//! docchat-server = { version = "*", features = ["supabase"] }
//! ```

#![allow(missing_docs)]

// Vector store abstraction layer
pub mod vectorstore;

#[cfg(feature = "supabase")]
pub mod supabase;

// Re-exports
pub use vectorstore::{InMemoryVectorStore, VectorStore, VectorStoreProvider};

#[cfg(feature = "supabase")]
pub use supabase::SupabaseVectorStore;
