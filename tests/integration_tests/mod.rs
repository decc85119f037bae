//! End-to-end tests over a temporary niche directory

pub mod generation_test;
pub mod upload_test;
