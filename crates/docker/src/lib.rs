//! b2u-docker: Container runtime adapter for b2-uploader
//!
//! This crate provides the implementations of the ContainerRuntime and
//! StorageTool traits. It is the only crate that spawns the container
//! runtime, and the only one that knows the b2 tool's command line.

pub mod b2;
pub mod cleanup;
pub mod runtime;

pub use b2::B2Cli;
pub use cleanup::{Janitor, Scoped, SweepReport, shutdown_signal, with_cleanup};
pub use runtime::CliRuntime;
