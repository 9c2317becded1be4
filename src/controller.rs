use std::time::Duration;
use tracing::trace;

use crate::domain::{CTVConfig, CTVError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &CTVConfig) -> Self {
        Self {
            event_poll_time: cfg.poll_ms,
        }
    }

    /// Waits up to the poll time for a terminal event and maps it to a message.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, CTVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    Self::map_key(key, model.raw_keyevents())
                }
                _ => None,
            });
        }
        Ok(None)
    }

    /// While the search prompt is open every key goes to it unmodified.
    pub fn map_key(key: KeyEvent, raw: bool) -> Option<Message> {
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) | (KeyCode::PageUp, _) => {
                Some(Message::PreviousPage)
            }
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) | (KeyCode::PageDown, _) => {
                Some(Message::NextPage)
            }
            (KeyCode::Home, _) | (KeyCode::Char('H'), _) => Some(Message::FirstPage),
            (KeyCode::End, _) | (KeyCode::Char('L'), _) => Some(Message::LastPage),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('g'), _) => Some(Message::CycleGroup),
            (KeyCode::Char('r'), _) => Some(Message::Refetch),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
