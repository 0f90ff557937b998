//! Shared pieces of the `snmp-*` command line tools.
//!
//! - [`args`] - clap argument groups
//! - [`output`] - result and error printing

pub mod args;
pub mod output;
