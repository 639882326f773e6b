//! masklab-store — the local side of the training workflow.
//!
//! Case directories, the append-only attempt ledger, student-mask change
//! detection, the built-in volume codec, and the external editor launcher.

pub mod case;
pub mod codec;
pub mod context;
pub mod editor;
pub mod ledger;
pub mod settings;
pub mod watch;
