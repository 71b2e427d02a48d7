//! bizdesk - terminal console for a business-management API
//!
//! Shows the signed-in employee's tasks grouped by project, lets them change
//! task statuses, delete tasks and export the board to CSV.

use std::io;
use std::rc::Rc;
use std::time::Duration;

use bizdesk::application::{Action, App, Session};
use bizdesk::infrastructure::{init_logging, Config, ReqwestTransport, TokenStore};
use bizdesk::presentation::{board_viewport_rows, render_ui, InputHandler};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::task::LocalSet;

const TICK: Duration = Duration::from_millis(250);

/// Entry point for the bizdesk console.
///
/// Reads configuration, sets up logging and the session, then runs the UI
/// loop on a single-threaded runtime until the user quits.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_logging(&config.log_file, config.log_filter.as_deref())?;
    tracing::info!(base_url = %config.base_url, "starting bizdesk");

    let tokens = TokenStore::open(&config.token_store)?;
    if let Some(token) = config.token.as_deref() {
        tokens.store_tokens(token, None)?;
    }
    let transport = ReqwestTransport::new(config.base_url.as_str(), config.timeout())?;
    let session = Session::with_dwell(Rc::new(transport), tokens, config.notification_dwell());
    let mut app = App::new(session.clone(), config.employee_id.as_deref());

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = LocalSet::new();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = local.block_on(&runtime, run_app(&mut terminal, &mut app));
    session.teardown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "terminal failure");
        println!("{err:?}");
    }

    tracing::info!("bizdesk stopped");
    Ok(())
}

/// Main application event loop.
///
/// Redraws on every key press, tick and notification expiry. Remote work
/// requested by a key runs as a local task so the loop never blocks on it.
async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);
    let notifications = app.session.notifications().clone();

    dispatch(app, Action::Reload);

    loop {
        terminal.draw(|f| {
            let body = f.area().height.saturating_sub(4);
            app.update_viewport_size(board_viewport_rows(ratatui::layout::Rect { height: body, ..f.area() }));
            render_ui(f, app);
        })?;

        tokio::select! {
            _ = ticker.tick() => app.clamp_selection(),
            _ = notifications.expired() => {}
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match InputHandler::handle_key_event(app, key.code, key.modifiers) {
                        Some(Action::Quit) => return Ok(()),
                        Some(action) => dispatch(app, action),
                        None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err),
                None => return Ok(()),
            },
        }
    }
}

fn dispatch(app: &App, action: Action) {
    match action {
        Action::Reload => {
            tokio::task::spawn_local(app.board.load());
        }
        Action::ChangeStatus { task_id, status } => {
            tokio::task::spawn_local(app.board.change_status(&task_id, status));
        }
        Action::DeleteTask { task_id } => {
            tokio::task::spawn_local(app.board.delete_task(&task_id));
        }
        Action::Quit => {}
    }
}
