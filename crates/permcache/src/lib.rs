//! Plotter Permcache - cached permission decisions
//!
//! Deciding whether a session may read a stream needs two lookups that are
//! slow relative to the hot path: the stream's collection path (a database
//! round trip) and, for unauthenticated sessions, the `public` tag's prefix
//! set (a config-store read). Both are cached here.
//!
//! # Cache design
//!
//! - **Collection cache**: `uuid → collection path`, unit cost per entry.
//! - **Tag-prefix cache**: `tag name → prefix set`, cost = set size; an
//!   absent tag caches as an empty set at zero cost.
//!
//! Both caches coalesce concurrent misses for the same key into a single
//! in-flight resolution, and a failed resolution is never cached. Stream
//! existence is checked on every decision and never cached, so stream
//! creation needs no invalidation protocol.
//!
//! A single daemon task watches the tag subtree of the config store; any
//! change empties both caches, because a tag redefinition can silently
//! change the result of any cached decision.

mod checker;
mod daemon;

pub use checker::PermissionChecker;
pub use daemon::spawn_invalidation_daemon;
