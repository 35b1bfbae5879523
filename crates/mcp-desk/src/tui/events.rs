//! Event handling for the console.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use desk_core::DeskConfig;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use super::app::App;
use super::ui;

/// Result type for TUI operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const PAGE: usize = 10;

/// Initialize the terminal for TUI mode.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the console until the operator quits.
pub fn run(config: &DeskConfig) -> Result<()> {
    // Agent sessions run on this runtime; it must outlive the app.
    let runtime = tokio::runtime::Runtime::new()?;
    let mut app = App::new(config, runtime.handle().clone())?;
    info!(agent = %app.runner.command(), "console starting");

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut app);

    // Server must not outlive the console, even when the loop failed.
    if !app.should_quit {
        app.quit();
    }
    restore_terminal(&mut terminal)?;
    info!("console stopped");

    result
}

/// Main event loop.
fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                match key.code {
                    KeyCode::Char('c') if ctrl => app.quit(),
                    KeyCode::Char('l') if ctrl => app.clear_surfaces(),
                    KeyCode::F(1) => app.start_server(),
                    KeyCode::F(2) => app.stop_server(),
                    KeyCode::Tab => app.toggle_focus(),
                    KeyCode::Enter => app.submit(),
                    KeyCode::Char(c) if !ctrl => app.enter_char(c),
                    KeyCode::Backspace => app.delete_char(),
                    KeyCode::Left => app.move_cursor_left(),
                    KeyCode::Right => app.move_cursor_right(),
                    KeyCode::Home => app.move_cursor_home(),
                    KeyCode::End => app.move_cursor_end(),
                    KeyCode::Up => app.scroll_up(),
                    KeyCode::Down => app.scroll_down(),
                    KeyCode::PageUp => app.scroll_page_up(PAGE),
                    KeyCode::PageDown => app.scroll_page_down(PAGE),
                    KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        // Session output arrives on the runtime's tasks.
        app.drain_events();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
