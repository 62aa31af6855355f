// src/npc/actions/misc.rs

use bevy::log::debug;

use crate::npc::action::AnimationAction;
use crate::npc::context::{ActionContext, NpcCommand};

/// Drops back into the daily routine's neutral pose.
#[derive(Debug, Clone, Default)]
pub struct ContinueRoutine {
    finished: bool,
}

impl AnimationAction for ContinueRoutine {
    fn name(&self) -> &'static str {
        "ContinueRoutine"
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        ctx.animation.set_head_look(None);
        ctx.play_idle();
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Ends the current dialog.
#[derive(Debug, Clone, Default)]
pub struct StopProcessInfos {
    finished: bool,
}

impl AnimationAction for StopProcessInfos {
    fn name(&self) -> &'static str {
        "StopProcessInfos"
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        ctx.emit(NpcCommand::StopProcessInfos);
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Plays one animation and waits for it to end, optionally switching the body state.
#[derive(Debug, Clone)]
pub struct PlayAni {
    animation: String,
    body_state: Option<u32>,
    finished: bool,
}

impl PlayAni {
    pub fn new(animation: String, body_state: Option<u32>) -> Self {
        Self {
            animation,
            body_state,
            finished: false,
        }
    }
}

impl AnimationAction for PlayAni {
    fn name(&self) -> &'static str {
        if self.body_state.is_some() {
            "PlayAniBS"
        } else {
            "PlayAni"
        }
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        if let Some(body_state) = self.body_state {
            ctx.state.body_state = body_state;
        }
        if !ctx.play(&self.animation) {
            debug!("{:?} cannot play '{}'", ctx.npc, self.animation);
            self.finished = true;
            return;
        }
        // A looping clip never ends on its own.
        let looping = ctx
            .animation
            .instance(&self.animation)
            .is_some_and(|i| i.track.is_looping());
        self.finished = looping;
    }

    fn on_animation_end(&mut self, _ctx: &mut ActionContext, animation: &str) {
        if animation.eq_ignore_ascii_case(&self.animation) {
            self.finished = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
