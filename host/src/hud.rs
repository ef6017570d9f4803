use crate::rule_engine::RuleEngine;

pub const STATUS_IN_PROGRESS: &str = "IN PROGRESS";
pub const STATUS_PAUSED: &str = "PAUSED";
pub const STATUS_GAME_OVER: &str = "GAME OVER";
pub const STATUS_REJECTED: &str = "INIT FAILED - CHECK SETTINGS";
pub const STATUS_MODULE_MISSING: &str = "ENGINE MODULE NOT BUILT";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    pub text: String,
    /// Highlighted lines flag anomalies (rejections, terminal stops) rather than normal progress.
    pub highlight: bool,
}

/// Label of the pause/resume control, i.e. what pressing it would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseLabel {
    Pause,
    #[default]
    Resume,
}

impl PauseLabel {
    pub fn text(self) -> &'static str {
        match self {
            PauseLabel::Pause => "PAUSE",
            PauseLabel::Resume => "RESUME",
        }
    }
}

/// The on-screen text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hud {
    pub score: String,
    pub lines: String,
    pub drops_left: String,
    pub status: StatusLine,
    pub pause_label: PauseLabel,
}

impl Default for Hud {
    fn default() -> Self {
        Self {
            score: "0".to_string(),
            lines: "0".to_string(),
            drops_left: "0".to_string(),
            status: StatusLine::default(),
            pause_label: PauseLabel::default(),
        }
    }
}

/// Drops the player still has; never negative.
pub fn drops_remaining(drop_cap: i32, drops_used: i32) -> i32 {
    drop_cap.saturating_sub(drops_used).max(0)
}

impl Hud {
    /// Copies score, lines and drops remaining out of the engine.
    pub fn refresh<E: RuleEngine + ?Sized>(&mut self, engine: &mut E) {
        self.score = engine.score().to_string();
        self.lines = engine.lines().to_string();
        let cap = engine.drop_cap();
        let used = engine.drop_count();
        self.drops_left = drops_remaining(cap, used).to_string();
    }

    pub fn set_status(&mut self, text: impl Into<String>, highlight: bool) {
        self.status = StatusLine {
            text: text.into(),
            highlight,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;

    #[test]
    fn drops_remaining_never_goes_negative() {
        assert_eq!(drops_remaining(150, 0), 150);
        assert_eq!(drops_remaining(150, 149), 1);
        assert_eq!(drops_remaining(150, 151), 0);
        assert_eq!(drops_remaining(i32::MIN, i32::MAX), 0);
    }

    #[test]
    fn refresh_reads_engine_scalars() {
        let mut engine = ScriptedEngine::new();
        assert!(engine.init_game(20, 10, 150));
        engine.set_score(420);
        engine.set_lines(3);
        engine.set_drop_count(152);

        let mut hud = Hud::default();
        hud.refresh(&mut engine);

        assert_eq!(hud.score, "420");
        assert_eq!(hud.lines, "3");
        assert_eq!(hud.drops_left, "0");
    }
}
