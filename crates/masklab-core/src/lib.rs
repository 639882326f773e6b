//! masklab-core — Data model, metrics engine, and capability traits.
//!
//! This crate defines the fundamental types, the pure voxel-mask evaluation
//! engine, and the narrow traits behind which external collaborators
//! (volume decoders, the annotation editor) live.

pub mod error;
pub mod metrics;
pub mod model;
pub mod traits;
pub mod volume;
