//! Resilient access to the TaskNotes local HTTP API.
//!
//! `api` talks to the API with bounded-time requests; `cache` keeps the last
//! successful task list so callers can show something when the API is down.

pub mod api;
pub mod cache;
pub mod config;
