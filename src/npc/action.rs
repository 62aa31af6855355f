// src/npc/action.rs

use super::actions::go_to::{GoToFp, GoToNpc, GoToWp};
use super::actions::misc::{ContinueRoutine, PlayAni, StopProcessInfos};
use super::actions::output::Output;
use super::actions::rotate_actions::{TurnAction, TurnTarget};
use super::actions::use_mob::UseMob;
use super::actions::wait::Wait;
use super::context::ActionContext;
use super::registry::NpcHandle;

/// One step of a character's behavior. The queue calls `start` once, then `tick`
/// every frame and `on_animation_end` for every animation that ended, until
/// `is_finished` returns true.
pub trait AnimationAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn start(&mut self, ctx: &mut ActionContext);

    fn tick(&mut self, _ctx: &mut ActionContext) {}

    fn on_animation_end(&mut self, _ctx: &mut ActionContext, _animation: &str) {}

    fn is_finished(&self) -> bool;
}

/// Requests issued by the behavior scripts.
#[derive(Debug, Clone, PartialEq)]
pub enum AiCommand {
    Wait(f32),
    Output(String),
    OutputSvm(String),
    GoToWp(String),
    GoToFp(String),
    GoToNpc(NpcHandle),
    AlignToFp,
    LookAt(String),
    LookAtNpc(NpcHandle),
    TurnToNpc(NpcHandle),
    UseMob { scheme: String, target_state: i32 },
    ContinueRoutine,
    StopProcessInfos,
    PlayAni(String),
    PlayAniBs { animation: String, body_state: u32 },
}

impl AiCommand {
    pub fn into_action(self) -> Box<dyn AnimationAction> {
        match self {
            AiCommand::Wait(seconds) => Box::new(Wait::new(seconds)),
            AiCommand::Output(name) => Box::new(Output::new(name)),
            AiCommand::OutputSvm(name) => Box::new(Output::svm(name)),
            AiCommand::GoToWp(way_point) => Box::new(GoToWp::new(way_point)),
            AiCommand::GoToFp(prefix) => Box::new(GoToFp::new(prefix)),
            AiCommand::GoToNpc(target) => Box::new(GoToNpc::new(target)),
            AiCommand::AlignToFp => Box::new(TurnAction::new(TurnTarget::AlignToFp)),
            AiCommand::LookAt(way_point) => {
                Box::new(TurnAction::new(TurnTarget::LookAt(way_point)))
            }
            AiCommand::LookAtNpc(target) => Box::new(TurnAction::new(TurnTarget::LookAtNpc(target))),
            AiCommand::TurnToNpc(target) => Box::new(TurnAction::new(TurnTarget::TurnToNpc(target))),
            AiCommand::UseMob {
                scheme,
                target_state,
            } => Box::new(UseMob::new(scheme, target_state)),
            AiCommand::ContinueRoutine => Box::new(ContinueRoutine::default()),
            AiCommand::StopProcessInfos => Box::new(StopProcessInfos::default()),
            AiCommand::PlayAni(animation) => Box::new(PlayAni::new(animation, None)),
            AiCommand::PlayAniBs {
                animation,
                body_state,
            } => Box::new(PlayAni::new(animation, Some(body_state))),
        }
    }
}
