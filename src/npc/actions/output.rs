// src/npc/actions/output.rs

use bevy::log::{debug, warn};

use crate::npc::action::AnimationAction;
use crate::npc::context::{ActionContext, NpcCommand};

const GESTURE_PREFIX: &str = "T_DIALOGGESTURE_";
const VISEME: &str = "VISEME";

/// Speaks a dialog line (`Output`) or a voice-set line (`OutputSvm`) and waits for it
/// to finish. Non-player characters gesture and move their lips while talking.
#[derive(Debug, Clone)]
pub struct Output {
    name: String,
    svm: bool,
    remaining: f32,
    gesture: Option<String>,
    morphing: bool,
    finished: bool,
}

impl Output {
    pub fn new(name: String) -> Self {
        Self {
            name,
            svm: false,
            remaining: 0.0,
            gesture: None,
            morphing: false,
            finished: false,
        }
    }

    pub fn svm(name: String) -> Self {
        Self {
            svm: true,
            ..Self::new(name)
        }
    }

    fn sound_name(&self, voice: u32) -> String {
        if self.svm {
            format!("SVM_{}_{}", voice, self.name.trim_start_matches('$'))
        } else {
            self.name.clone()
        }
    }

    fn finish(&mut self, ctx: &mut ActionContext) {
        if let Some(gesture) = self.gesture.take() {
            ctx.stop(&gesture);
        }
        if self.morphing {
            ctx.emit(NpcCommand::StopMorph {
                animation: VISEME.to_string(),
            });
            self.morphing = false;
        }
        self.finished = true;
    }
}

fn stop_gestures(ctx: &mut ActionContext) {
    let playing: Vec<String> = ctx
        .animation
        .instances()
        .iter()
        .filter(|i| i.state().is_active())
        .map(|i| i.track.display_name().to_string())
        .filter(|name| name.starts_with(GESTURE_PREFIX))
        .collect();
    for gesture in playing {
        ctx.stop(&gesture);
    }
}

impl AnimationAction for Output {
    fn name(&self) -> &'static str {
        if self.svm { "OutputSvm" } else { "Output" }
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        let sound = self.sound_name(ctx.state.voice);

        if ctx.state.is_player {
            stop_gestures(ctx);
            ctx.emit(NpcCommand::PlayVoice {
                name: sound.clone(),
                range: None,
            });
        } else {
            let count = ctx.settings.dialog_gesture_count.max(1);
            let gesture = format!("{}{:02}", GESTURE_PREFIX, rand::random_range(1..=count));
            if ctx.play(&gesture) {
                self.gesture = Some(gesture);
            } else {
                debug!("Dialog gesture '{}' is unavailable", gesture);
            }
            ctx.emit(NpcCommand::StartMorph {
                animation: VISEME.to_string(),
            });
            self.morphing = true;
            ctx.emit(NpcCommand::PlayVoice {
                name: sound.clone(),
                range: Some(ctx.settings.voice_range),
            });
        }

        match ctx.world.sound_duration(&sound) {
            Some(seconds) if seconds > 0.0 => self.remaining = seconds,
            _ => {
                warn!("Sound '{}' has no known duration, skipping the wait", sound);
                self.finish(ctx);
            }
        }
    }

    fn tick(&mut self, ctx: &mut ActionContext) {
        self.remaining -= ctx.dt;
        if self.remaining <= 0.0 {
            self.finish(ctx);
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::actions::test_support::Harness;
    use crate::npc::context::ZenWorld;

    #[test]
    fn npc_gestures_and_moves_lips_until_the_line_ends() {
        let mut h = Harness::new(ZenWorld::default().with_sound("SVM_5_SMALLTALK01", 0.5));
        h.state.voice = 5;
        h.settings.dialog_gesture_count = 1;
        let mut action = Output::svm("$Smalltalk01".into());

        h.start(&mut action);
        assert!(h.animation.is_playing("T_DIALOGGESTURE_01"));
        assert!(h.commands.contains(&NpcCommand::PlayVoice {
            name: "SVM_5_Smalltalk01".into(),
            range: Some(15.0),
        }));

        let steps = h.run(&mut action, 100).unwrap();
        assert!((14..=16).contains(&steps), "took {} steps", steps);
        assert!(!h.animation.is_playing("T_DIALOGGESTURE_01"));
        assert_eq!(
            h.commands.last(),
            Some(&NpcCommand::StopMorph {
                animation: "VISEME".into()
            })
        );
    }

    #[test]
    fn player_speaks_without_gesture() {
        let mut h = Harness::new(ZenWorld::default().with_sound("DIA_HELLO", 1.0));
        h.state.is_player = true;
        h.settings.dialog_gesture_count = 1;
        h.animation.play_animation(&mut h.manager, "T_DIALOGGESTURE_01");
        let mut action = Output::new("DIA_HELLO".into());

        h.start(&mut action);
        assert!(!h.animation.is_playing("T_DIALOGGESTURE_01"));
        assert_eq!(
            h.commands,
            vec![NpcCommand::PlayVoice {
                name: "DIA_HELLO".into(),
                range: None,
            }]
        );
        assert!(!action.is_finished());
    }

    #[test]
    fn unknown_sound_finishes_immediately() {
        let mut h = Harness::new(ZenWorld::default());
        h.settings.dialog_gesture_count = 1;
        let mut action = Output::new("DIA_MISSING".into());
        h.start(&mut action);
        assert!(action.is_finished());
        assert!(!h.animation.is_playing("T_DIALOGGESTURE_01"));
    }
}
