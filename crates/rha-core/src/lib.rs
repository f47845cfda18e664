//! Shared types for the remote Home Assistant integration
//!
//! This crate provides the pieces used by both the discovery client and the
//! configuration flows: option-key constants, the numeric threshold filter
//! type, and the entity/service grouping helpers that back the selectors.

mod filter;
mod grouping;

pub mod conf;

pub use filter::{selected_filter_index, NumericFilter};
pub use grouping::{
    domains_of, organize_entities_with_counts, organize_services, slugify,
};
