//! Integration tests for chromosplit.
//!
//! These tests run the CLI binary end to end with stand-in tools, checking the
//! files it leaves behind and its exit status.

mod helpers;
mod test_batch_command;
mod test_call_command;
mod test_regions_command;
