//! Integration tests - Whole chains folded into query models
//!
//! These tests verify that node application, resolution and the query model
//! work together, including nested sub-queries and JSON input.

mod end_to_end_tests;
mod json_input_tests;
mod multi_clause_chain_tests;
mod sub_query_tests;
