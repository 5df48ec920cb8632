//! Integration tests for rent-watch
//!
//! These tests use wiremock to stand in for the listing site and the
//! publish endpoint, and run whole passes end-to-end.

mod common;
mod pass_tests;
mod publish_tests;
