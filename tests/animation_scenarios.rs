use std::sync::Arc;
use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_zen_anim::ZenAnimationPlugin;
use bevy_zen_anim::npc::actions::go_to::GoToWp;
use bevy_zen_anim::npc::{
    ActionContext, ActionSettings, AiCommand, AnimationAction, NpcActionQueue, NpcCommand,
    NpcCommandEvent, NpcRegistry, NpcState, WayNetGraph, ZenWorld,
};
use bevy_zen_anim::zen::sample_model::{
    HEAD, HUMANS, LEFT_LEG, RIGHT_ARM, human_hierarchy, human_resources,
};
use bevy_zen_anim::zen::skeleton::Skeleton;
use bevy_zen_anim::zen_animation::{
    AnimationManager, AnimationSettings, AnimationState, AnimationSystem, FiredEventKind,
    NpcAnimationEvent,
};

const DT: f32 = 0.05;

fn character() -> (AnimationManager, AnimationSystem) {
    let manager = AnimationManager::new(Arc::new(human_resources()), AnimationSettings::default());
    let skeleton = Skeleton::from_hierarchy(&human_hierarchy());
    (manager, AnimationSystem::new(skeleton, HUMANS, "S_RUN"))
}

fn advance(
    system: &mut AnimationSystem,
    manager: &mut AnimationManager,
    root: &mut Transform,
    ticks: usize,
) {
    for _ in 0..ticks {
        system.tick(manager, DT, root);
    }
}

#[test]
fn walk_blends_in_and_loops() {
    let (mut manager, mut system) = character();
    let mut root = Transform::default();
    assert!(system.play_animation(&mut manager, "S_WALKL"));
    assert_eq!(system.animation_duration("S_WALKL"), 1.0);

    advance(&mut system, &mut manager, &mut root, 4);
    let walk = system.instance("S_WALKL").unwrap();
    assert_eq!(walk.state(), AnimationState::Play);
    assert_eq!(walk.blend_weight(), 1.0);

    advance(&mut system, &mut manager, &mut root, 17);
    let walk = system.instance("S_WALKL").unwrap();
    assert_eq!(walk.state(), AnimationState::Play);
    assert!(walk.current_time() < 0.1, "time {}", walk.current_time());
    assert!(system.drain_events().iter().all(|e| !e.is_animation_end()));
}

#[test]
fn gesture_takes_over_upper_body_only() {
    let (mut manager, mut system) = character();
    let mut root = Transform::default();
    system.play_animation(&mut manager, "S_WALKL");
    advance(&mut system, &mut manager, &mut root, 5);

    assert!(system.play_animation(&mut manager, "T_DIALOGGESTURE_01"));
    advance(&mut system, &mut manager, &mut root, 1);
    let walk = system.instance("S_WALKL").unwrap();
    let head = walk.bone_weight_by_name(HEAD).unwrap();
    let arm = walk.bone_weight_by_name(RIGHT_ARM).unwrap();
    assert!(head < 1.0 && head > 0.0, "head {}", head);
    assert!(arm < 1.0 && arm > 0.0, "arm {}", arm);
    assert_eq!(walk.bone_weight_by_name(LEFT_LEG), Some(1.0));

    advance(&mut system, &mut manager, &mut root, 4);
    let walk = system.instance("S_WALKL").unwrap();
    assert_eq!(walk.bone_weight_by_name(HEAD), Some(0.0));
    assert_eq!(walk.bone_weight_by_name(LEFT_LEG), Some(1.0));
}

#[test]
fn stopped_gesture_hands_bones_back() {
    let (mut manager, mut system) = character();
    let mut root = Transform::default();
    system.play_animation(&mut manager, "S_WALKL");
    advance(&mut system, &mut manager, &mut root, 5);
    system.play_animation(&mut manager, "T_DIALOGGESTURE_01");
    advance(&mut system, &mut manager, &mut root, 8);

    system.stop_animation("T_DIALOGGESTURE_01");
    let gesture = system.instance("T_DIALOGGESTURE_01").unwrap();
    assert_eq!(gesture.state(), AnimationState::BlendOut);
    let walk = system.instance("S_WALKL").unwrap();
    assert_eq!(walk.bone_state_by_name(HEAD), Some(AnimationState::BlendIn));
    assert_eq!(walk.bone_state_by_name(RIGHT_ARM), Some(AnimationState::BlendIn));
    assert_eq!(walk.bone_state_by_name(LEFT_LEG), Some(AnimationState::Play));

    advance(&mut system, &mut manager, &mut root, 6);
    assert!(system.instance("T_DIALOGGESTURE_01").is_none());
    let walk = system.instance("S_WALKL").unwrap();
    assert_eq!(walk.bone_weight_by_name(HEAD), Some(1.0));
    let ended: Vec<_> = system
        .drain_events()
        .into_iter()
        .filter(|e| e.is_animation_end())
        .map(|e| e.animation)
        .collect();
    assert_eq!(ended, vec!["T_DIALOGGESTURE_01".to_string()]);
}

#[test]
fn every_bone_resolves_to_a_full_weight() {
    let (mut manager, mut system) = character();
    let mut root = Transform::default();
    system.play_animation(&mut manager, "S_WALKL");
    advance(&mut system, &mut manager, &mut root, 2);
    system.play_animation(&mut manager, "T_POTION_RANDOM_1");
    system.play_animation(&mut manager, "T_DIALOGGESTURE_02");
    for _ in 0..30 {
        advance(&mut system, &mut manager, &mut root, 1);
        for bone in 0..system.skeleton().len() {
            let resolved = system.resolve_bone(bone);
            let total = resolved.weight_sum + resolved.fallback_weight;
            assert!((total - 1.0).abs() < 1e-3, "bone {} weighs {}", bone, total);
        }
    }
}

#[test]
fn route_is_walked_hop_by_hop() {
    let mut net = WayNetGraph::new()
        .with_way_point("WP_START", Vec3::ZERO)
        .with_way_point("WP_BRIDGE", Vec3::new(0.0, 0.0, -5.0))
        .with_way_point("WP_FARM", Vec3::new(5.0, 0.0, -5.0));
    net.connect("WP_START", "WP_BRIDGE").unwrap();
    net.connect("WP_BRIDGE", "WP_FARM").unwrap();
    let mut world = ZenWorld::new(net);

    let mut registry = NpcRegistry::new();
    let npc = registry.register(Entity::from_raw(7));
    let (mut manager, mut animation) = character();
    let mut transform = Transform::default();
    let mut state = NpcState::default();
    let settings = ActionSettings::default();
    let mut commands = Vec::new();

    let mut action = GoToWp::new("WP_FARM".into());
    let mut hops = Vec::new();
    let mut dt = 0.0;
    for _ in 0..600 {
        let mut ctx = ActionContext {
            npc,
            dt,
            transform: &mut transform,
            animation: &mut animation,
            manager: &mut manager,
            state: &mut state,
            world: &mut world,
            settings: &settings,
            commands: &mut commands,
        };
        if dt == 0.0 {
            action.start(&mut ctx);
        } else {
            action.tick(&mut ctx);
        }
        if hops.last() != Some(&action.remaining_hops()) {
            hops.push(action.remaining_hops());
        }
        if action.is_finished() {
            break;
        }
        dt = DT;
        animation.tick(&mut manager, dt, &mut transform);
    }

    assert!(action.is_finished());
    assert_eq!(hops, vec![3, 2, 1, 0]);
    assert!(transform.translation.distance(Vec3::new(5.0, 0.0, -5.0)) < 0.5);
    assert!(animation.is_playing("S_RUN"));
    assert!(!animation.is_playing("S_RUNL"));
    assert_eq!(commands.last(), Some(&NpcCommand::SetPhysics(true)));
}

#[derive(Resource, Default)]
struct Seen {
    animation: Vec<FiredEventKind>,
    commands: Vec<NpcCommand>,
}

fn collect(
    mut seen: ResMut<Seen>,
    mut animation_events: EventReader<NpcAnimationEvent>,
    mut npc_commands: EventReader<NpcCommandEvent>,
) {
    seen.animation
        .extend(animation_events.read().map(|e| e.event.kind.clone()));
    seen.commands
        .extend(npc_commands.read().map(|e| e.command.clone()));
}

#[test]
fn plugin_drives_queued_actions() {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(50)))
        .add_plugins(ZenAnimationPlugin::new(Arc::new(human_resources())))
        .init_resource::<Seen>()
        .add_systems(PostUpdate, collect);

    let skeleton = Skeleton::from_hierarchy(&human_hierarchy());
    let npc = app
        .world_mut()
        .spawn((
            Transform::default(),
            AnimationSystem::new(skeleton, HUMANS, "S_RUN"),
            NpcState::default(),
            NpcActionQueue::with_commands([
                AiCommand::PlayAniBs {
                    animation: "T_POTION_RANDOM_1".into(),
                    body_state: 3,
                },
                AiCommand::StopProcessInfos,
            ]),
        ))
        .id();

    for _ in 0..60 {
        app.update();
    }

    let world = app.world();
    assert_eq!(world.resource::<NpcRegistry>().len(), 1);
    assert!(world.get::<NpcActionQueue>(npc).unwrap().is_empty());
    assert_eq!(world.get::<NpcState>(npc).unwrap().body_state, 3);
    assert!(world.get::<AnimationSystem>(npc).unwrap().is_playing("S_RUN"));

    let seen = world.resource::<Seen>();
    assert!(
        seen.animation
            .iter()
            .any(|k| matches!(k, FiredEventKind::CreateItem { item, .. } if item == "ITPO_HEALTH_01"))
    );
    assert!(seen.animation.contains(&FiredEventKind::AnimationEnded));
    assert_eq!(seen.commands, vec![NpcCommand::StopProcessInfos]);
}
