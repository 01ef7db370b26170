//! Dungeon battle-log viewer

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventKind, EventOutcome,
    RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem};

use dungeon_log::action::Action;
use dungeon_log::api::{self, DungeonClient};
use dungeon_log::components::{BattleViewer, BattleViewerProps, Component};
use dungeon_log::config::{ConfigArgs, RuntimeConfig};
use dungeon_log::effect::Effect;
use dungeon_log::reducer::reducer;
use dungeon_log::state::{AppState, TICK_MS};

#[derive(Parser, Debug)]
#[command(name = "dungeon-log")]
#[command(about = "Replay a dungeon run's battle log and complete the run")]
struct Args {
    #[command(flatten)]
    debug: DebugCliArgs,
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let config = RuntimeConfig::from(args.config);
    let _log_guard = init_logging(&config.log_dir)?;

    let debug = DebugSession::new(args.debug);
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let mut state = debug
        .load_state_or_else_async(|| {
            let source = config.source.clone();
            let run_id = config.run_id.clone();
            async move { Ok::<AppState, io::Error>(AppState::new(source, run_id)) }
        })
        .await
        .map_err(debug_error)?;

    // A loaded snapshot still follows the command line.
    state.source = config.source.clone();
    state.run_id = config.run_id.clone();

    tracing::info!(
        source = ?state.source,
        run_id = ?state.run_id,
        api_url = %config.api_url,
        "starting viewer"
    );

    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, &config).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    tracing::info!("viewer closed");
    Ok(())
}

/// File-only logging; the terminal belongs to the UI.
fn init_logging(log_dir: &Path) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "dungeon-log.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    config: &RuntimeConfig,
) -> io::Result<DebugRunOutput<AppState>> {
    let client = Arc::new(DungeonClient::new(config.api_url.clone()));
    let playback_interval = config.playback_interval;

    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime.subscriptions().interval(
                    "tick",
                    std::time::Duration::from_millis(TICK_MS),
                    || Action::Tick,
                );
                runtime
                    .subscriptions()
                    .interval("playback", playback_interval, || Action::PlaybackTick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                let props = BattleViewerProps {
                    state,
                    is_focused: render_ctx.is_focused(),
                };
                let mut viewer = BattleViewer;
                viewer.render(frame, area, props);
            },
            |event, state| -> EventOutcome<Action> {
                match event {
                    EventKind::Resize(width, height) => {
                        EventOutcome::action(Action::UiTerminalResize(*width, *height))
                            .with_render()
                    }
                    _ => {
                        let props = BattleViewerProps {
                            state,
                            is_focused: true,
                        };
                        let mut viewer = BattleViewer;
                        EventOutcome::from_actions(viewer.handle_event(event, props))
                    }
                }
            },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, Arc::clone(&client)),
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, client: Arc<DungeonClient>) {
    match effect {
        Effect::LoadLogFile { path } => {
            ctx.tasks().spawn(TaskKey::new("load_log"), async move {
                match api::load_log_file(&path).await {
                    Ok(events) => Action::LogDidLoad(events),
                    Err(err) => {
                        tracing::error!(path = %path.display(), error = %err, "could not load battle log");
                        Action::LogDidError(err.to_string())
                    }
                }
            });
        }
        Effect::CompleteDungeon { run_id } => {
            ctx.tasks().spawn(TaskKey::new("complete_dungeon"), async move {
                match client.complete_dungeon(&run_id).await {
                    Ok(completion) => Action::DungeonDidComplete {
                        receipt: completion.receipt,
                        events: completion.events,
                    },
                    Err(err) => {
                        tracing::error!(%run_id, error = %err, "dungeon completion failed");
                        Action::DungeonDidError(err.to_string())
                    }
                }
            });
        }
    }
}
