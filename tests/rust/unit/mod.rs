//! Unit tests - Tests of single construction components through the public API
//!
//! These tests exercise one node kind or one construction path at a time.

mod cast_node_tests;
mod result_operator_ordering_tests;
