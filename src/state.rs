//! Application state - single source of truth

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::battle::BattleEvent;
use crate::config::LogSource;
use crate::replay::ReplayState;

/// How long a notification stays up, in ticks.
pub const NOTIFICATION_TICKS: u32 = 24;
pub const TICK_MS: u64 = 250;

/// Viewer lifecycle: Closed → Replaying → Settled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ViewerPhase {
    #[default]
    Closed,
    /// Open with the cursor short of the end of the log
    Replaying,
    /// Open with every event applied
    Settled,
}

impl ViewerPhase {
    pub fn is_open(&self) -> bool {
        !matches!(self, ViewerPhase::Closed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
    pub ticks_remaining: u32,
}

/// What the task service handed back when the run was completed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompletionReceipt {
    pub run_id: String,
    pub message: Option<String>,
    /// Reward payload, passed through untouched
    pub rewards: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppState {
    pub run_id: Option<String>,
    pub source: LogSource,

    /// Raw event log lifecycle: Empty → Loading → Loaded/Failed
    pub log: DataResource<Vec<BattleEvent>>,

    pub viewer: ViewerPhase,
    /// Number of events applied to `replay`
    pub cursor: usize,
    pub replay: ReplayState,
    pub playing: bool,
    /// Narrative lines scrolled back from the newest line
    pub log_scroll: usize,

    pub completion: DataResource<CompletionReceipt>,
    pub notification: Option<Notification>,

    pub tick_count: u32,
}

impl AppState {
    pub fn new(source: LogSource, run_id: Option<String>) -> Self {
        Self {
            run_id,
            source,
            log: DataResource::Empty,
            viewer: ViewerPhase::Closed,
            cursor: 0,
            replay: ReplayState::default(),
            playing: false,
            log_scroll: 0,
            completion: DataResource::Empty,
            notification: None,
            tick_count: 0,
        }
    }

    /// The loaded events, or nothing while the log is missing.
    pub fn events(&self) -> &[BattleEvent] {
        self.log.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn at_end(&self) -> bool {
        self.cursor >= self.events().len()
    }

    pub fn notify(&mut self, level: NotificationLevel, text: impl Into<String>) {
        self.notification = Some(Notification {
            level,
            text: text.into(),
            ticks_remaining: NOTIFICATION_TICKS,
        });
    }

    /// Drop everything derived from the log.
    pub fn reset_viewer(&mut self) {
        self.viewer = ViewerPhase::Closed;
        self.cursor = 0;
        self.replay = ReplayState::default();
        self.playing = false;
        self.log_scroll = 0;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(LogSource::Remote, None)
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![
            DebugSection::new("Run")
                .entry("run_id", ron_string(&self.run_id))
                .entry("source", ron_string(&self.source))
                .entry("events", ron_string(&self.events().len()))
                .entry("log_loading", ron_string(&self.log.is_loading()))
                .entry("completion_loading", ron_string(&self.completion.is_loading())),
            DebugSection::new("Viewer")
                .entry("phase", ron_string(&self.viewer))
                .entry("cursor", ron_string(&self.cursor))
                .entry("playing", ron_string(&self.playing))
                .entry("scroll", ron_string(&self.log_scroll))
                .entry("lines", ron_string(&self.replay.narrative.len())),
            DebugSection::new("Battle")
                .entry("round", ron_string(&self.replay.current_round))
                .entry("stage", ron_string(&self.replay.current_stage))
                .entry(
                    "stages",
                    ron_string(&(self.replay.stages_completed, self.replay.total_stages)),
                )
                .entry("victory", ron_string(&self.replay.victory))
                .entry("allies", ron_string(&self.replay.allies.len()))
                .entry("enemies", ron_string(&self.replay.enemies.len())),
        ]
    }
}
