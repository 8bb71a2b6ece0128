//! stagehand-lib: Core types and logic for stagehand
//!
//! This crate provides the provisioning pipeline used to prepare a headless CI host:
//! - `PipelineConfig`: typed pipeline settings with built-in defaults
//! - `Stage`: the five ordered provisioning stages
//! - `Runner`: the seam through which every external command is executed
//! - `RunRecord`: the persisted outcome of a pipeline run

pub mod config;
pub mod consts;
pub mod exec;
pub mod init;
pub mod journal;
pub mod pipeline;
pub mod platform;
pub mod stage;
pub mod state;
