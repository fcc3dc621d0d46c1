//! Shared fixtures for the functional and property test suites.

// Each test binary uses a different subset of the fixtures
#![allow(dead_code)]
