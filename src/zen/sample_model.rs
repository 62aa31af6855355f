// src/zen/sample_model.rs

//! A tiny five-bone human with a handful of clips. Used by the demo binary and the
//! tests so they do not need real game data.

use std::f32::consts::TAU;

use bevy::math::{Quat, Vec3};

use super::resources::InMemoryResources;
use super::types::{
    AnimationAlias, AnimationFlags, AnimationSample, EventTag, HierarchyNode, ModelAnimation,
    ModelEvent, ModelEventKind, ModelHierarchy, ModelScript, ScriptAnimation,
};

pub const HUMANS: &str = "HUMANS";

pub const ROOT: &str = "BIP01";
pub const SPINE: &str = "BIP01 SPINE";
pub const HEAD: &str = "BIP01 HEAD";
pub const RIGHT_ARM: &str = "BIP01 R UPPERARM";
pub const LEFT_LEG: &str = "BIP01 L THIGH";
pub const RIGHT_HAND: &str = "ZS_RIGHTHAND";

const ALL_BONES: [u32; 6] = [0, 1, 2, 3, 4, 5];

pub fn human_hierarchy() -> ModelHierarchy {
    let node = |name: &str, parent: Option<usize>, y: f32| HierarchyNode {
        name: name.to_string(),
        parent,
        position: Vec3::new(0.0, y, 0.0),
        rotation: Quat::IDENTITY,
    };
    ModelHierarchy {
        name: HUMANS.to_string(),
        nodes: vec![
            node(ROOT, None, 1.0),
            node(SPINE, Some(0), 0.2),
            node(HEAD, Some(1), 0.5),
            node(RIGHT_ARM, Some(1), 0.4),
            node(LEFT_LEG, Some(0), -0.1),
            node(RIGHT_HAND, Some(3), -0.5),
        ],
    }
}

/// Key data with a sine sway on every non-root bone and a linear root travel.
pub fn clip(name: &str, frames: u32, fps: f32, nodes: &[u32], root_travel: Vec3) -> ModelAnimation {
    let hierarchy = human_hierarchy();
    let mut samples = Vec::with_capacity(frames as usize * nodes.len());
    for frame in 0..frames {
        let t = if frames > 1 {
            frame as f32 / (frames - 1) as f32
        } else {
            0.0
        };
        for &node in nodes {
            let bind = hierarchy.nodes[node as usize].position;
            samples.push(if node == 0 {
                AnimationSample::new(bind + root_travel * t, Quat::IDENTITY)
            } else {
                AnimationSample::new(bind, Quat::from_rotation_x(0.2 * (t * TAU).sin()))
            });
        }
    }
    ModelAnimation {
        name: name.to_string(),
        fps,
        frame_count: frames,
        node_indices: nodes.to_vec(),
        samples,
    }
}

fn ani(name: &str, layer: i32, next: &str, blend: f32, flags: AnimationFlags) -> ScriptAnimation {
    ScriptAnimation {
        name: name.to_string(),
        layer,
        next: next.to_string(),
        blend_in: blend,
        blend_out: blend,
        flags,
        model: format!("{}-{}.MAN", HUMANS, name),
        events: Vec::new(),
    }
}

/// Script and key data of the sample human.
pub fn human_resources() -> InMemoryResources {
    let mut script = ModelScript {
        name: HUMANS.to_string(),
        hierarchy: HUMANS.to_string(),
        animations: Vec::new(),
        aliases: Vec::new(),
    };
    let mut resources = InMemoryResources::new().with_hierarchy(human_hierarchy());
    let mut add = |ani: ScriptAnimation, data: ModelAnimation| {
        resources.add_animation(HUMANS, data);
        script.animations.push(ani);
    };

    let forward = Vec3::NEG_Z;
    for idle in ["S_RUN", "S_WALK", "S_FISTRUN", "S_1HRUN"] {
        add(
            ani(idle, 1, idle, 0.1, AnimationFlags::IDLE),
            clip(idle, 10, 10.0, &ALL_BONES, Vec3::ZERO),
        );
    }
    for (name, speed) in [("S_RUNL", 3.0), ("S_WALKL", 1.5), ("S_FISTRUNL", 3.0)] {
        let mut walk = ani(name, 1, name, 0.2, AnimationFlags::MOVE);
        walk.events.push(ModelEvent {
            frame: 5,
            kind: ModelEventKind::SoundEffect {
                name: "STEP".to_string(),
                range: 0.0,
                empty_slot: false,
            },
        });
        add(walk, clip(name, 10, 10.0, &ALL_BONES, forward * speed));
    }
    for turn in ["T_RUNTURNL", "T_RUNTURNR", "T_WALKTURNL", "T_WALKTURNR"] {
        add(
            ani(turn, 1, turn, 0.1, AnimationFlags::ROTATE),
            clip(turn, 10, 10.0, &ALL_BONES, Vec3::ZERO),
        );
    }

    for n in 1..=2 {
        let name = format!("T_DIALOGGESTURE_{:02}", n);
        add(
            ani(&name, 3, "", 0.2, AnimationFlags::NONE),
            clip(&name, 20, 10.0, &[2, 3], Vec3::ZERO),
        );
    }

    let mut drink = ani("T_POTION_RANDOM_1", 2, "", 0.1, AnimationFlags::NONE);
    drink.events = vec![
        ModelEvent {
            frame: 2,
            kind: ModelEventKind::Tag {
                tag: EventTag::CreateItem("ITPO_HEALTH_01".to_string()),
                slots: vec![RIGHT_HAND.to_string()],
            },
        },
        ModelEvent {
            frame: 6,
            kind: ModelEventKind::ParticleEffect {
                name: "PFX_DRINK".to_string(),
                bone: HEAD.to_string(),
            },
        },
        ModelEvent {
            frame: 8,
            kind: ModelEventKind::Tag {
                tag: EventTag::DestroyItem,
                slots: vec![RIGHT_HAND.to_string()],
            },
        },
    ];
    add(drink, clip("T_POTION_RANDOM_1", 10, 10.0, &[1, 3, 5], Vec3::ZERO));

    // Bench usage: STAND -> S0 -> S1 and back.
    let transitions = [
        ("T_BENCH_STAND_2_S0", "S_BENCH_S0"),
        ("T_BENCH_S0_2_S1", "S_BENCH_S1"),
        ("T_BENCH_S1_2_S0", "S_BENCH_S0"),
        ("T_BENCH_S0_2_STAND", "S_RUN"),
    ];
    for (name, next) in transitions {
        add(
            ani(name, 1, next, 0.1, AnimationFlags::NONE),
            clip(name, 5, 10.0, &ALL_BONES, Vec3::ZERO),
        );
    }
    for state in ["S_BENCH_S0", "S_BENCH_S1"] {
        add(
            ani(state, 1, state, 0.1, AnimationFlags::IDLE),
            clip(state, 10, 10.0, &ALL_BONES, Vec3::ZERO),
        );
    }

    script.aliases.push(AnimationAlias {
        name: "S_SNEAKL".to_string(),
        layer: 1,
        next: "S_SNEAKL".to_string(),
        blend_in: 0.3,
        blend_out: 0.3,
        flags: AnimationFlags::MOVE,
        alias: "S_WALKL".to_string(),
    });

    resources.add_script(script);
    resources
}
