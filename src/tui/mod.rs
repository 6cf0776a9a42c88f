pub mod app;
pub mod input;
pub mod ui;

use anyhow::Result;
use flume::Receiver;
use ratatui::{backend::CrosstermBackend, prelude::*};
use std::{io, time::Duration};

use crate::core::{Controller, Notice};

use app::App;

/// Run the interactive console until the operator quits.
///
/// Each tick drains engine events through the controller, collects queued
/// notices, redraws and then waits briefly for a key.
pub fn start(controller: &mut Controller, notices: Receiver<Notice>) -> Result<()> {
    let mut stdout = io::stdout();
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(&mut stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, controller, &notices);

    terminal.show_cursor()?;
    drop(terminal);
    crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    crossterm::terminal::disable_raw_mode()?;

    result
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut Controller,
    notices: &Receiver<Notice>,
) -> Result<()> {
    let mut app = App::new();

    while !app.should_quit {
        controller.pump_events();
        for notice in notices.try_iter() {
            app.push_notice(notice);
        }

        terminal.draw(|frame| ui::render_ui(frame, &app, controller))?;

        if let Some(key) = input::poll_key(Duration::from_millis(100))? {
            app.handle_key(key, controller);
        }
    }

    log::info!("Operator quit the console");
    Ok(())
}
