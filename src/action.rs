//! Actions - every intent and async result the store accepts

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::battle::BattleEvent;
use crate::state::CompletionReceipt;

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    /// Startup: fetch the log from the configured source
    Init,

    // ===== Log category =====
    LogDidLoad(Vec<BattleEvent>),
    LogDidError(String),
    /// Scroll the narrative; positive moves back in history
    LogScroll(i16),

    // ===== Viewer category =====
    /// Replay the whole log from the first event
    ViewerOpen,
    /// Discard all derived state
    ViewerClose,

    // ===== Playback category =====
    PlaybackRestart,
    PlaybackStepForward,
    PlaybackStepBack,
    PlaybackToggle,
    PlaybackSettle,
    /// Periodic advance while playing
    PlaybackTick,

    // ===== Dungeon category =====
    /// Intent: complete the run and claim rewards (triggers async task)
    DungeonComplete,
    /// Result: the service accepted the completion
    DungeonDidComplete {
        receipt: CompletionReceipt,
        events: Vec<BattleEvent>,
    },
    /// Result: the completion request failed
    DungeonDidError(String),

    // ===== UI category =====
    UiDismissNotification,
    UiTerminalResize(u16, u16),

    // ===== Uncategorized (global) =====
    Tick,
    Quit,
}
