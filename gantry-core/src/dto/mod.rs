//! Data transfer objects
//!
//! Wire-level request and response shapes shared between the server and
//! its clients (UI, CLI tooling). Domain types stay in `domain`.

pub mod job;
