//! Dharma MCP Library
//!
//! Wraps the `dharma` grammar-based fuzzer. Each `dharma_generate` call is a
//! tracked run: the generated test cases are the run's captured stdout, and
//! the run's scratch directory is its output path.
//!
//! Grammar paths may be absolute, relative to the working directory, or
//! relative to the configured grammar library (`DHARMA_GRAMMAR_DIR`).

pub mod handlers;
pub mod params;
pub mod server;

pub use server::DharmaMcpServer;

pub use params::*;
