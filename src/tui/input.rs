use anyhow::Result;
use crossterm::event::{Event, KeyEvent, KeyEventKind};
use std::time::Duration;

/// Wait up to `timeout` for a key press. Releases, repeats and non-key
/// events are swallowed.
pub fn poll_key(timeout: Duration) -> Result<Option<KeyEvent>> {
    if !crossterm::event::poll(timeout)? {
        return Ok(None);
    }
    match crossterm::event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
        _ => Ok(None),
    }
}
