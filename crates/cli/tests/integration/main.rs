//! End-to-end tests that run real (harmless) commands through the pipeline.

mod common;
mod run_tests;
mod status_tests;
