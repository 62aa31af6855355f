use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_zen_anim::ZenAnimationPlugin;
use bevy_zen_anim::npc::{
    AiCommand, Mob, MobSlot, NpcActionQueue, NpcCommandEvent, NpcState, WayNetGraph, ZenWorld,
};
use bevy_zen_anim::zen::sample_model::{HUMANS, human_hierarchy, human_resources};
use bevy_zen_anim::zen::skeleton::Skeleton;
use bevy_zen_anim::zen_animation::{AnimationSystem, FiredEventKind, NpcAnimationEvent};

const FRAME: Duration = Duration::from_millis(33);
const FRAMES: usize = 600;

#[derive(Component)]
struct Demo;

fn build_world() -> Result<ZenWorld> {
    let mut way_net = WayNetGraph::new()
        .with_way_point("WP_START", Vec3::ZERO)
        .with_way_point("WP_PATH_01", Vec3::new(0.0, 0.0, -4.0))
        .with_way_point("WP_PATH_02", Vec3::new(-4.0, 0.0, -4.0))
        .with_way_point("WP_TAVERN", Vec3::new(-4.0, 0.0, -8.0))
        .with_free_point("FP_STAND_TAVERN", Vec3::new(-5.0, 0.0, -9.0), Vec3::Z);
    way_net.connect("WP_START", "WP_PATH_01")?;
    way_net.connect("WP_PATH_01", "WP_PATH_02")?;
    way_net.connect("WP_PATH_02", "WP_TAVERN")?;

    Ok(ZenWorld::new(way_net)
        .with_mob(Mob {
            name: "BENCH_TAVERN".into(),
            scheme: "BENCH".into(),
            slots: vec![MobSlot {
                name: "ZS_POS0".into(),
                position: Vec3::new(-3.0, 0.0, -10.0),
                rotation: Quat::from_rotation_y(std::f32::consts::PI),
                occupant: None,
            }],
        })
        .with_sound("SVM_1_HELLO", 1.2)
        .with_sound("DIA_TAVERN_01", 2.0))
}

fn spawn_character(mut commands: Commands) {
    let mut skeleton = Skeleton::from_hierarchy(&human_hierarchy());
    let names: Vec<String> = skeleton.bones.iter().map(|b| b.name.clone()).collect();
    for name in names {
        let bone = commands.spawn((Name::new(name.clone()), Transform::default())).id();
        skeleton.bind_entity(&name, bone);
    }

    commands.spawn((
        Demo,
        Name::new("Diego"),
        Transform::default(),
        AnimationSystem::new(skeleton, HUMANS, "S_RUN"),
        NpcState {
            voice: 1,
            ..default()
        },
        NpcActionQueue::with_commands([
            AiCommand::GoToWp("WP_TAVERN".into()),
            AiCommand::OutputSvm("$HELLO".into()),
            AiCommand::UseMob {
                scheme: "BENCH".into(),
                target_state: 1,
            },
            AiCommand::Output("DIA_TAVERN_01".into()),
            AiCommand::UseMob {
                scheme: "BENCH".into(),
                target_state: -1,
            },
            AiCommand::GoToFp("STAND".into()),
            AiCommand::AlignToFp,
            AiCommand::ContinueRoutine,
        ]),
    ));
}

fn log_events(
    mut animation_events: EventReader<NpcAnimationEvent>,
    mut npc_commands: EventReader<NpcCommandEvent>,
) {
    for event in animation_events.read() {
        match &event.event.kind {
            FiredEventKind::Sound { .. } => {}
            kind => info!("{:?} {}: {:?}", event.entity, event.event.animation, kind),
        }
    }
    for event in npc_commands.read() {
        info!("{:?} requests {:?}", event.npc, event.command);
    }
}

fn main() -> Result<()> {
    let world = build_world()?;
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .insert_resource(world)
        .add_plugins(ZenAnimationPlugin::new(Arc::new(human_resources())))
        .add_systems(Startup, spawn_character)
        .add_systems(PostUpdate, log_events);

    for frame in 0..FRAMES {
        app.update();
        let world = app.world_mut();
        let mut query = world.query_filtered::<(&Transform, &NpcActionQueue), With<Demo>>();
        let Ok((transform, queue)) = query.single(world) else {
            continue;
        };
        if frame % 30 == 0 {
            info!(
                "frame {:>3}: at {:.2?}, running {:?}",
                frame,
                transform.translation,
                queue.current_action()
            );
        }
        if queue.is_empty() {
            info!("Queue drained after {} frames", frame + 1);
            break;
        }
    }
    Ok(())
}
