//! Battle log interpreter - pure fold: (events, position) -> ReplayState

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::battle::{
    BattleAction, BattleEvent, BattleOutcome, BattleStart, BattleUnit, RoundEvent, StageComplete,
    StageStart,
};

pub const NO_DATA_MESSAGE: &str =
    "No battle data available. You can still complete this dungeon to free your characters.";

/// Styling hint for a narrative line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LineKind {
    Info,
    RoundStart,
    Attack,
    Critical,
    Heal,
    RoundSummary,
    StageBanner,
    System,
    Victory,
    Defeat,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NarrativeLine {
    pub kind: LineKind,
    pub text: String,
}

impl NarrativeLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Which event last wrote a stage counter. Later variants outrank earlier
/// ones; a write only lands when its rank is at least the current one.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
enum ProgressSource {
    #[default]
    Unset,
    BattleStart,
    StageComplete,
    BattleEnd,
    DungeonComplete,
}

/// Everything the viewer renders, derived from a prefix of the log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReplayState {
    pub allies: Vec<BattleUnit>,
    pub enemies: Vec<BattleUnit>,
    pub narrative: Vec<NarrativeLine>,
    pub current_round: u32,
    pub current_stage: u32,
    pub total_stages: u32,
    pub stages_completed: u32,
    pub victory: Option<bool>,
    completed_source: ProgressSource,
    total_source: ProgressSource,
}

/// Replay the whole log.
pub fn replay(events: &[BattleEvent]) -> ReplayState {
    replay_to(events, events.len())
}

/// Replay `events[..position]`. The position is clamped to the log length.
pub fn replay_to(events: &[BattleEvent], position: usize) -> ReplayState {
    let mut state = ReplayState::default();
    if events.is_empty() {
        state.push(LineKind::Info, NO_DATA_MESSAGE);
        return state;
    }

    let position = position.min(events.len());
    for event in &events[..position] {
        state.apply(event);
    }
    tracing::debug!(
        position,
        total = events.len(),
        lines = state.narrative.len(),
        "replayed battle log"
    );
    state
}

impl ReplayState {
    /// One fold step.
    pub fn apply(&mut self, event: &BattleEvent) {
        match event {
            BattleEvent::BattleStart(start) => self.battle_start(start),
            BattleEvent::Round(round) => self.round(round),
            BattleEvent::StageStart(stage) => self.stage_start(stage),
            BattleEvent::StageComplete(stage) => self.stage_complete(stage),
            BattleEvent::SystemMessage(system) => {
                self.push(LineKind::System, format!("System: {}", system.message));
            }
            BattleEvent::BattleEnd(outcome) => self.battle_end(outcome, ProgressSource::BattleEnd),
            BattleEvent::DungeonComplete(outcome) => {
                self.battle_end(outcome, ProgressSource::DungeonComplete)
            }
            BattleEvent::Unknown => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.victory.is_some()
    }

    fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        self.narrative.push(NarrativeLine::new(kind, text));
    }

    fn set_completed(&mut self, value: u32, source: ProgressSource) {
        if source >= self.completed_source {
            self.stages_completed = value;
            self.completed_source = source;
        }
    }

    fn set_total(&mut self, value: u32, source: ProgressSource) {
        if source >= self.total_source {
            self.total_stages = value;
            self.total_source = source;
        }
    }

    fn battle_start(&mut self, start: &BattleStart) {
        if let Some(allies) = &start.allies {
            // Replays always begin with the party at full health.
            self.allies = allies
                .iter()
                .cloned()
                .map(|mut unit| {
                    unit.hp = unit.max_hp;
                    unit
                })
                .collect();
        }
        if let Some(enemies) = &start.enemies {
            self.enemies = enemies.clone();
        }
        if let Some(total) = start.total_stages {
            self.set_total(total, ProgressSource::BattleStart);
        }

        self.push(
            LineKind::Info,
            format!(
                "Battle initialized: {} vs {}.",
                count_noun(self.allies.len(), "ally", "allies"),
                count_noun(self.enemies.len(), "enemy", "enemies"),
            ),
        );
        let stages = if self.total_stages > 0 {
            format!(
                "This dungeon has {}.",
                count_noun(self.total_stages as usize, "stage", "stages")
            )
        } else {
            "The number of stages is unknown.".to_string()
        };
        self.push(LineKind::Info, stages);
    }

    fn round(&mut self, round: &RoundEvent) {
        if let Some(number) = round.number {
            self.current_round = number;
        }
        if !round.actions.is_empty() {
            self.push(
                LineKind::RoundStart,
                format!("Round {} begins.", self.current_round),
            );
        }
        for action in &round.actions {
            self.apply_action(action);
            self.push(action_kind(action), format_action(action));
        }

        if let (Some(allies), Some(enemies)) = (round.remaining_allies, round.remaining_enemies) {
            let text = if enemies == 0 {
                "All enemies have been defeated this round!".to_string()
            } else if allies == 0 {
                "Your party has fallen this round...".to_string()
            } else {
                format!(
                    "{} and {} remain.",
                    count_noun(allies as usize, "ally", "allies"),
                    count_noun(enemies as usize, "enemy", "enemies"),
                )
            };
            self.push(LineKind::RoundSummary, text);
        }
    }

    fn apply_action(&mut self, action: &BattleAction) {
        let heal = action.is_heal();
        let Some(target) = self
            .allies
            .iter_mut()
            .chain(self.enemies.iter_mut())
            .find(|unit| unit.name == action.target)
        else {
            return;
        };

        if heal {
            let healed = target.hp.saturating_add(action.damage);
            target.hp = if target.max_hp > 0 {
                healed.min(target.max_hp)
            } else {
                healed
            };
        } else {
            target.hp = target.hp.saturating_sub(action.damage);
        }
    }

    fn stage_start(&mut self, stage: &StageStart) {
        if let Some(index) = stage.current_stage {
            self.current_stage = index;
        }
        if let Some(enemies) = &stage.enemies {
            self.enemies = enemies.clone();
            let text = match enemies.len() {
                1 => "1 enemy appears!".to_string(),
                n => format!("{n} enemies appear!"),
            };
            self.push(LineKind::Info, text);
        }
        let banner = stage
            .message
            .clone()
            .unwrap_or_else(|| format!("=== Stage {} begins ===", self.current_stage));
        self.push(LineKind::StageBanner, banner);
    }

    fn stage_complete(&mut self, stage: &StageComplete) {
        if let Some(index) = stage.current_stage {
            self.current_stage = index;
            self.set_completed(index, ProgressSource::StageComplete);
        }
        if let Some(survivors) = &stage.alive_allies {
            self.allies = survivors.clone();
        }
        let banner = stage
            .message
            .clone()
            .unwrap_or_else(|| format!("=== Stage {} complete ===", self.current_stage));
        self.push(LineKind::StageBanner, banner);
    }

    fn battle_end(&mut self, outcome: &BattleOutcome, source: ProgressSource) {
        if let Some(victory) = outcome.victory {
            self.victory = Some(victory);
        }
        if let Some(completed) = outcome.completed_stages {
            self.set_completed(completed, source);
        }
        if let Some(total) = outcome.total_stages {
            self.set_total(total, source);
        }

        let progress = format!("{}/{}", self.stages_completed, self.total_stages);
        let (kind, generated) = match self.victory {
            Some(true) => (
                LineKind::Victory,
                format!("Victory! Your party cleared {progress} stages."),
            ),
            Some(false) => (
                LineKind::Defeat,
                format!("Defeat. Your party cleared {progress} stages."),
            ),
            None => (
                LineKind::Info,
                format!("The battle is over. Your party cleared {progress} stages."),
            ),
        };
        let text = outcome.summary.clone().unwrap_or(generated);
        self.push(kind, text);
    }
}

fn action_kind(action: &BattleAction) -> LineKind {
    if action.is_heal() {
        LineKind::Heal
    } else if action.is_critical {
        LineKind::Critical
    } else {
        LineKind::Attack
    }
}

/// Narration for a single action; a literal message always wins.
pub fn format_action(action: &BattleAction) -> String {
    if let Some(message) = &action.message {
        return message.clone();
    }
    if action.is_heal() {
        return format!(
            "{} used {} to heal {} for {} HP",
            action.actor, action.skill, action.target, action.damage
        );
    }
    let mut line = format!(
        "{} used {} on {} for {} damage",
        action.actor, action.skill, action.target, action.damage
    );
    if action.is_critical {
        line.push_str(" (Critical hit!)");
    }
    line
}

fn count_noun(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {singular}")
    } else {
        format!("{count} {plural}")
    }
}
