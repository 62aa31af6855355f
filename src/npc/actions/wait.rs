// src/npc/actions/wait.rs

use crate::npc::action::AnimationAction;
use crate::npc::context::ActionContext;

#[derive(Debug, Clone)]
pub struct Wait {
    duration: f32,
    elapsed: f32,
}

impl Wait {
    pub fn new(seconds: f32) -> Self {
        Self {
            duration: seconds.max(0.0),
            elapsed: 0.0,
        }
    }
}

impl AnimationAction for Wait {
    fn name(&self) -> &'static str {
        "Wait"
    }

    fn start(&mut self, _ctx: &mut ActionContext) {}

    fn tick(&mut self, ctx: &mut ActionContext) {
        self.elapsed += ctx.dt;
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}
