//! Compiler tests.

#![allow(clippy::unwrap_used)]

mod compile_tests;
mod property_tests;
