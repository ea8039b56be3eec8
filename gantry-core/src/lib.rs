//! Gantry Core
//!
//! Core types and abstractions for the Gantry automation backend.
//!
//! This crate contains:
//! - Domain types: job lifecycle, manifest documents, resource readiness
//! - DTOs: data transfer objects exposed over the HTTP/WebSocket API

pub mod domain;
pub mod dto;
