// src/zen/mod.rs

pub mod error;
pub mod helper_funcs;
pub mod resources;
pub mod sample_model;
pub mod skeleton;
pub mod types;
