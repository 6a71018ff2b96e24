//! SQLite schema and the batched record writer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Worker Threads (N)             │
//! │  - Send records via channel                 │
//! └─────────────────────┬───────────────────────┘
//!                       │ WriterMessage
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │            BatchedWriter Thread             │
//! │  - Buffers records in memory                │
//! │  - Hands full batches to the sink           │
//! └─────────────────────┬───────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │      ResultSet / CSV file / SQLite file     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod schema;
pub mod writer;

pub use schema::{create_database, create_indexes, keys, optimize_for_reads};
pub use writer::{BatchedWriter, WriterHandle, WriterMessage, WriterStats};
