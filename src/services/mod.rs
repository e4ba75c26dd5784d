//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the classroom rules so route handlers can stay
//! focused on protocol translation. Pure functions over `Session` do the
//! work; `classroom::apply` is the single door to the live state.

pub mod aggregate;
pub mod binding;
pub mod broadcast;
pub mod classroom;
pub mod snapshot;
