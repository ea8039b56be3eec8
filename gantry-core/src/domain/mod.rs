//! Core domain types
//!
//! This module contains the core domain structures used across the Gantry
//! backend. These types represent the fundamental business entities and are
//! shared between the API layer (which serves them) and the background
//! executors (which update them).

pub mod document;
pub mod job;
pub mod resource;
