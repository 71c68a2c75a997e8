#![allow(clippy::new_without_default)]

pub mod error;
pub mod heuristics;
pub mod nodes;
pub mod optimizer;
pub mod rules;
