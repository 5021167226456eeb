//! CLI command implementations for memcached-gmond.
//!
//! - `test`: run a fixed number of polling cycles and print the results
//! - the default polling loop shares the cycle printer from `test`


// Re-export command functions
pub use test::{command_test, print_cycle};
