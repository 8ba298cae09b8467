#![deny(missing_docs)]
//! Library half of the `voter` binary: settings resolution, batch file
//! handling and the error type shared by the subcommands.

/// Batch input parsing and the concurrent batch runner.
pub mod batch;
/// Error types for the binary.
pub mod errors;
/// Environment and flag resolution.
pub mod settings;
/// Driver teardown after output.
pub mod shutdown;
