//! # huehub-domain
//!
//! Pure domain model for the huehub Hue bridge emulator.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **Device records** (the accessories exposed to the voice assistant)
//! - Define **Raw commands** (the tagged shapes an inbound control payload may take)
//! - Normalize raw commands into one canonical **device command**
//! - Derive the **bridge identity** (MAC, bridge id, UUIDs) each hub presents
//! - Define **Device events** emitted toward the downstream runtime
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod command;
pub mod device;
pub mod event;
pub mod identity;
pub mod normalizer;
