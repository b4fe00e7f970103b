//! Operator commands for inspecting and migrating BookLove guest state.

pub mod commands;
pub mod config;
