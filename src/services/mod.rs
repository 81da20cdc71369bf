//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own view sessions and their lifecycle so route handlers
//! can stay focused on protocol translation.

pub mod views;
