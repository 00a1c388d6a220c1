//! Integration tests against the in-memory store

mod api_tests;
mod circulation_tests;
mod common;
