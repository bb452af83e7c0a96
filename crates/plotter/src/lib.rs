//! Shared plumbing for the `mr-plotter` binaries.

pub mod store;
