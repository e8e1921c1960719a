//! CLI command implementations for chromosplit.
//!
//! # Commands
//!
//! - [`call`] - Call variants per region over one or more BAMs and merge the results
//! - [`batch`] - Run [`call`] independently for each of many BAMs
//! - [`regions`] - Print the canonical region list of a set of BAMs

#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::cast_possible_truncation
)]

pub mod batch;
pub mod call;
pub mod command;
pub mod common;
pub mod regions;
