//! Scatto: a small self-hosted photo-of-the-day server.
//!
//! A fixed photo library rotates on a deterministic calendar cycle. Each day
//! gets a fresh set of obfuscated links, minted once and validated on every
//! request.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
