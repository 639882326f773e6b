//! masklab-classroom — the shared-directory side of the training workflow.
//!
//! No server: a classroom is a well-known subtree on any shared filesystem
//! (network drive, synced folder). Teachers provision classes and upload
//! cases; students sync cases down and push attempts up. This crate owns
//! the tree layout, the teacher PIN, case exchange, and the update feed.

pub mod layout;
pub mod pin;
pub mod sync;
pub mod update;
