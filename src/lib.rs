// SPDX-License-Identifier: MIT OR Apache-2.0

//! cfind - live fuzzy search library
//!
//! Streams candidates from several sources, ranks them with an fzy-style
//! scorer and publishes bounded-rate snapshots to a search window.

pub mod address;
pub mod address_index;
pub mod config;
pub mod display;
pub mod errors;
pub mod fuzzy;
pub mod opener;
pub mod query;
pub mod ranking;
pub mod scheduler;
pub mod session;
pub mod source;
