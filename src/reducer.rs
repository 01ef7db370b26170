//! Reducer - pure function: (state, action) -> DispatchResult

use tui_dispatch::{DataResource, DispatchResult};

use crate::action::Action;
use crate::battle::BattleEvent;
use crate::config::LogSource;
use crate::effect::Effect;
use crate::replay::replay_to;
use crate::state::{AppState, CompletionReceipt, NotificationLevel, ViewerPhase};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => init(state),

        // ===== Log =====
        Action::LogDidLoad(events) => {
            tracing::info!(events = events.len(), "battle log loaded");
            state.log = DataResource::Loaded(events);
            open_viewer(state);
            DispatchResult::changed()
        }

        Action::LogDidError(error) => {
            tracing::warn!(%error, "battle log unavailable");
            state.notify(
                NotificationLevel::Error,
                format!("Could not load battle log: {error}"),
            );
            state.log = DataResource::Failed(error);
            open_viewer(state);
            DispatchResult::changed()
        }

        Action::LogScroll(delta) => {
            if !state.viewer.is_open() {
                return DispatchResult::unchanged();
            }
            let max = state.replay.narrative.len().saturating_sub(1);
            let next = if delta >= 0 {
                state.log_scroll.saturating_add(delta as usize).min(max)
            } else {
                state.log_scroll.saturating_sub(delta.unsigned_abs() as usize)
            };
            if next == state.log_scroll {
                return DispatchResult::unchanged();
            }
            state.log_scroll = next;
            DispatchResult::changed()
        }

        // ===== Viewer =====
        Action::ViewerOpen => {
            open_viewer(state);
            DispatchResult::changed()
        }

        Action::ViewerClose => {
            if !state.viewer.is_open() {
                return DispatchResult::unchanged();
            }
            state.reset_viewer();
            DispatchResult::changed()
        }

        // ===== Playback =====
        Action::PlaybackRestart => {
            if !state.viewer.is_open() {
                return DispatchResult::unchanged();
            }
            seek(state, 0);
            DispatchResult::changed()
        }

        Action::PlaybackStepForward => {
            if !state.viewer.is_open() || state.at_end() {
                return DispatchResult::unchanged();
            }
            state.playing = false;
            let next = state.cursor + 1;
            seek(state, next);
            DispatchResult::changed()
        }

        Action::PlaybackStepBack => {
            if !state.viewer.is_open() || state.cursor == 0 {
                return DispatchResult::unchanged();
            }
            state.playing = false;
            let previous = state.cursor - 1;
            seek(state, previous);
            DispatchResult::changed()
        }

        Action::PlaybackToggle => {
            if !state.viewer.is_open() || state.events().is_empty() {
                return DispatchResult::unchanged();
            }
            if state.playing {
                state.playing = false;
            } else {
                if state.at_end() {
                    seek(state, 0);
                }
                state.playing = true;
            }
            DispatchResult::changed()
        }

        Action::PlaybackSettle => {
            if !state.viewer.is_open() || state.viewer == ViewerPhase::Settled {
                return DispatchResult::unchanged();
            }
            let end = state.events().len();
            seek(state, end);
            DispatchResult::changed()
        }

        Action::PlaybackTick => {
            if !state.playing {
                return DispatchResult::unchanged();
            }
            let next = state.cursor + 1;
            seek(state, next);
            DispatchResult::changed()
        }

        // ===== Dungeon =====
        Action::DungeonComplete => {
            if state.completion.is_loading() {
                return DispatchResult::unchanged();
            }
            let Some(run_id) = state.run_id.clone() else {
                state.notify(
                    NotificationLevel::Error,
                    "No run id configured; cannot complete this dungeon.",
                );
                return DispatchResult::changed();
            };
            state.completion = DataResource::Loading;
            DispatchResult::changed_with(Effect::CompleteDungeon { run_id })
        }

        Action::DungeonDidComplete { receipt, events } => {
            dungeon_completed(state, receipt, events);
            DispatchResult::changed()
        }

        Action::DungeonDidError(error) => {
            tracing::warn!(%error, "dungeon completion failed");
            state.notify(
                NotificationLevel::Error,
                format!("Could not complete dungeon: {error}"),
            );
            state.completion = DataResource::Failed(error.clone());
            if state.log.is_loading() {
                state.log = DataResource::Failed(error);
                open_viewer(state);
            }
            DispatchResult::changed()
        }

        // ===== UI =====
        Action::UiDismissNotification => {
            if state.notification.take().is_some() {
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::UiTerminalResize(_, _) => DispatchResult::changed(),

        // ===== Global =====
        Action::Tick => {
            state.tick_count = state.tick_count.wrapping_add(1);
            let Some(notification) = state.notification.as_mut() else {
                return DispatchResult::unchanged();
            };
            notification.ticks_remaining = notification.ticks_remaining.saturating_sub(1);
            if notification.ticks_remaining == 0 {
                state.notification = None;
            }
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn init(state: &mut AppState) -> DispatchResult<Effect> {
    match state.source.clone() {
        LogSource::File(path) => {
            state.log = DataResource::Loading;
            DispatchResult::changed_with(Effect::LoadLogFile { path })
        }
        // The completion endpoint is also where the log comes from.
        LogSource::Remote => match state.run_id.clone() {
            Some(run_id) => {
                state.log = DataResource::Loading;
                state.completion = DataResource::Loading;
                DispatchResult::changed_with(Effect::CompleteDungeon { run_id })
            }
            None => {
                state.log = DataResource::Failed("no run id configured".into());
                open_viewer(state);
                DispatchResult::changed()
            }
        },
    }
}

fn dungeon_completed(state: &mut AppState, receipt: CompletionReceipt, events: Vec<BattleEvent>) {
    tracing::info!(run_id = %receipt.run_id, events = events.len(), "dungeon completed");
    let text = receipt
        .message
        .clone()
        .unwrap_or_else(|| "Dungeon complete! Your characters are free again.".to_string());
    state.notify(NotificationLevel::Success, text);
    state.completion = DataResource::Loaded(receipt);

    let adopt = state.log.is_loading() || (state.events().is_empty() && !events.is_empty());
    if adopt {
        state.log = DataResource::Loaded(events);
        open_viewer(state);
    }
}

/// Replay from the first event straight to the end.
fn open_viewer(state: &mut AppState) {
    state.reset_viewer();
    let end = state.events().len();
    seek(state, end);
}

/// Recompute derived state for a new cursor position.
fn seek(state: &mut AppState, position: usize) {
    let position = position.min(state.events().len());
    let replay = replay_to(state.events(), position);
    state.replay = replay;
    state.cursor = position;
    state.log_scroll = 0;
    if state.at_end() {
        state.viewer = ViewerPhase::Settled;
        state.playing = false;
    } else {
        state.viewer = ViewerPhase::Replaying;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::SystemMessage;
    use crate::replay::{replay, NO_DATA_MESSAGE};
    use std::path::PathBuf;

    fn system(text: &str) -> BattleEvent {
        BattleEvent::SystemMessage(SystemMessage {
            message: text.into(),
        })
    }

    fn loaded(events: Vec<BattleEvent>) -> AppState {
        let mut state = AppState::new(LogSource::Remote, Some("run-1".into()));
        reducer(&mut state, Action::LogDidLoad(events));
        state
    }

    #[test]
    fn test_init_from_file_declares_load() {
        let path = PathBuf::from("fixtures/run.json");
        let mut state = AppState::new(LogSource::File(path.clone()), None);

        let result = reducer(&mut state, Action::Init);

        assert!(result.changed);
        assert!(state.log.is_loading());
        assert_eq!(result.effects, vec![Effect::LoadLogFile { path }]);
    }

    #[test]
    fn test_init_remote_completes_run() {
        let mut state = AppState::new(LogSource::Remote, Some("run-9".into()));

        let result = reducer(&mut state, Action::Init);

        assert!(state.log.is_loading());
        assert!(state.completion.is_loading());
        assert_eq!(
            result.effects,
            vec![Effect::CompleteDungeon {
                run_id: "run-9".into()
            }]
        );
    }

    #[test]
    fn test_init_remote_without_run_id_opens_fallback() {
        let mut state = AppState::default();

        let result = reducer(&mut state, Action::Init);

        assert!(result.effects.is_empty());
        assert_eq!(state.viewer, ViewerPhase::Settled);
        assert_eq!(state.replay.narrative[0].text, NO_DATA_MESSAGE);
    }

    #[test]
    fn test_log_load_settles_viewer() {
        let events = vec![system("a"), system("b")];
        let state = loaded(events.clone());

        assert_eq!(state.viewer, ViewerPhase::Settled);
        assert_eq!(state.cursor, 2);
        assert_eq!(state.replay, replay(&events));
    }

    #[test]
    fn test_close_then_reopen_replays_fresh() {
        let mut state = loaded(vec![system("a"), system("b")]);
        let first = state.replay.clone();

        reducer(&mut state, Action::PlaybackStepBack);
        reducer(&mut state, Action::ViewerClose);
        assert_eq!(state.viewer, ViewerPhase::Closed);
        assert!(state.replay.narrative.is_empty());

        reducer(&mut state, Action::ViewerOpen);
        assert_eq!(state.replay, first);
    }

    #[test]
    fn test_playback_ignored_while_closed() {
        let mut state = loaded(vec![system("a")]);
        reducer(&mut state, Action::ViewerClose);

        for action in [
            Action::PlaybackRestart,
            Action::PlaybackStepForward,
            Action::PlaybackStepBack,
            Action::PlaybackToggle,
            Action::PlaybackSettle,
            Action::LogScroll(1),
        ] {
            assert!(!reducer(&mut state, action).changed);
        }
    }

    #[test]
    fn test_step_back_and_forward() {
        let events = vec![system("a"), system("b"), system("c")];
        let mut state = loaded(events.clone());

        reducer(&mut state, Action::PlaybackStepBack);
        assert_eq!(state.viewer, ViewerPhase::Replaying);
        assert_eq!(state.replay, replay_to(&events, 2));

        reducer(&mut state, Action::PlaybackStepForward);
        assert_eq!(state.viewer, ViewerPhase::Settled);
        assert!(!reducer(&mut state, Action::PlaybackStepForward).changed);
    }

    #[test]
    fn test_toggle_at_end_restarts_and_ticks_to_settle() {
        let mut state = loaded(vec![system("a"), system("b")]);

        reducer(&mut state, Action::PlaybackToggle);
        assert!(state.playing);
        assert_eq!(state.cursor, 0);

        reducer(&mut state, Action::PlaybackTick);
        assert_eq!(state.cursor, 1);
        reducer(&mut state, Action::PlaybackTick);
        assert_eq!(state.viewer, ViewerPhase::Settled);
        assert!(!state.playing);
        assert!(!reducer(&mut state, Action::PlaybackTick).changed);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut state = loaded(vec![system("a"), system("b"), system("c")]);

        reducer(&mut state, Action::LogScroll(10));
        assert_eq!(state.log_scroll, 2);
        reducer(&mut state, Action::LogScroll(-5));
        assert_eq!(state.log_scroll, 0);
        assert!(!reducer(&mut state, Action::LogScroll(-1)).changed);
    }

    #[test]
    fn test_complete_is_available_with_empty_log() {
        let mut state = loaded(Vec::new());

        let result = reducer(&mut state, Action::DungeonComplete);
        assert_eq!(
            result.effects,
            vec![Effect::CompleteDungeon {
                run_id: "run-1".into()
            }]
        );

        let again = reducer(&mut state, Action::DungeonComplete);
        assert!(!again.changed);
        assert!(again.effects.is_empty());
    }

    #[test]
    fn test_complete_without_run_id_notifies() {
        let mut state = AppState::new(LogSource::File("x.json".into()), None);

        let result = reducer(&mut state, Action::DungeonComplete);

        assert!(result.effects.is_empty());
        assert!(state.completion.is_empty());
        assert_eq!(
            state.notification.as_ref().map(|n| n.level),
            Some(NotificationLevel::Error)
        );
    }

    #[test]
    fn test_completion_adopts_log_when_loading() {
        let mut state = AppState::new(LogSource::Remote, Some("run-2".into()));
        reducer(&mut state, Action::Init);

        reducer(
            &mut state,
            Action::DungeonDidComplete {
                receipt: CompletionReceipt {
                    run_id: "run-2".into(),
                    ..Default::default()
                },
                events: vec![system("loot")],
            },
        );

        assert!(state.completion.is_loaded());
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.viewer, ViewerPhase::Settled);
        assert_eq!(state.replay.narrative[0].text, "System: loot");
    }

    #[test]
    fn test_completion_keeps_existing_log() {
        let mut state = loaded(vec![system("first")]);
        reducer(&mut state, Action::DungeonComplete);

        reducer(
            &mut state,
            Action::DungeonDidComplete {
                receipt: CompletionReceipt::default(),
                events: vec![system("second"), system("third")],
            },
        );

        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn test_completion_error_is_retryable() {
        let mut state = loaded(vec![system("a")]);
        reducer(&mut state, Action::DungeonComplete);
        reducer(&mut state, Action::DungeonDidError("timeout".into()));

        assert!(state.completion.is_failed());
        assert!(state.log.is_loaded());

        let retry = reducer(&mut state, Action::DungeonComplete);
        assert_eq!(retry.effects.len(), 1);
    }

    #[test]
    fn test_initial_error_opens_fallback() {
        let mut state = AppState::new(LogSource::Remote, Some("run-3".into()));
        reducer(&mut state, Action::Init);
        reducer(&mut state, Action::DungeonDidError("503".into()));

        assert!(state.log.is_failed());
        assert_eq!(state.replay.narrative[0].text, NO_DATA_MESSAGE);
    }

    #[test]
    fn test_notification_expires_on_tick() {
        let mut state = AppState::default();
        state.notify(NotificationLevel::Info, "hello");
        if let Some(n) = state.notification.as_mut() {
            n.ticks_remaining = 2;
        }

        assert!(reducer(&mut state, Action::Tick).changed);
        assert!(state.notification.is_some());
        reducer(&mut state, Action::Tick);
        assert!(state.notification.is_none());
        assert!(!reducer(&mut state, Action::Tick).changed);
    }
}
