//! PT CLI library — shared helpers for the `pt` binary.

pub mod colors;
pub mod driver;
