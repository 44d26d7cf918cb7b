//! groundflow command provider
//!
//! Drives an arbitrary external executable as a resource provider, the
//! same way cloud CLIs are wrapped elsewhere: one process invocation
//! per operation, JSON in, JSON out. This keeps provider-specific
//! resource semantics entirely outside the engine — a shim script that
//! speaks the three operations is a full provider.

pub mod error;
pub mod provider;
pub mod runner;

pub use error::CmdError;
pub use provider::CmdProvider;
pub use runner::CommandRunner;
