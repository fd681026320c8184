//! Batch inputs and outputs for the command-line driver.

pub mod csv;
