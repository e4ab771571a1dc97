//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own workspace state and persistence concerns so route
//! handlers can stay focused on protocol translation and access gating.

pub mod persistence;
pub mod session;
pub mod workspace;
