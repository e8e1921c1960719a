#![deny(unsafe_code)]

//! Supervision of external programs for chromosplit.
//!
//! This crate provides the process layer that every pipeline stage runs through:
//! - [`invocation`] - An argument vector for one external program
//! - [`outcome`] - How a supervised program finished ([`ExitOutcome`])
//! - [`process`] - Run one program with file or null stdio and wait for it
//! - [`chain`] - Run several programs connected by pipes ([`PipelineChain`])
//!
//! Nothing here retries or interprets tool output; callers judge a stage only by
//! its [`ExitOutcome`].

pub mod chain;
pub mod invocation;
pub mod outcome;
pub mod process;

pub use chain::{ChainOutcome, PipelineChain};
pub use invocation::Invocation;
pub use outcome::ExitOutcome;
pub use process::{ExternalProcess, Input, Output, StderrMode};
