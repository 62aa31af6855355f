// src/npc/actions/mod.rs

pub mod go_to;
pub mod misc;
pub mod output;
pub mod rotate_actions;
pub mod use_mob;
pub mod wait;

#[cfg(test)]
pub(crate) mod test_support;
