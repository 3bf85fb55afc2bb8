//! Input sources for the command-line harness
//!
//! Commands are plain text, one per line. Blank lines and lines starting
//! with `#` are skipped.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::viewer::{Command, Key, SwipeDirection, Viewer};

/// One harness command
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    GoTo(i64),
    Next,
    Previous,
    Redraw,
    ZoomIn,
    ZoomOut,
    Title,
    Swipe(SwipeDirection),
    Key(Key),
    Wheel(f64),
    Pinch(f64),
    PinchEnd,
    Tab(usize),
    Link(usize),
    Resize { width: f64, height: f64 },
    /// Print the viewer state
    State,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("{command}: expected {expected}")]
    BadArgument {
        command: String,
        expected: &'static str,
    },
}

impl InputEvent {
    /// Parse one line; `Ok(None)` for blank lines and comments
    pub fn parse(line: &str) -> Result<Option<Self>, InputError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let event = match command {
            "goto" => InputEvent::GoTo(number(command, &args, 0, "a page number")?),
            "next" => InputEvent::Next,
            "previous" | "prev" => InputEvent::Previous,
            "redraw" => InputEvent::Redraw,
            "zoom-in" => InputEvent::ZoomIn,
            "zoom-out" => InputEvent::ZoomOut,
            "title" => InputEvent::Title,
            "swipe" => match args.first().copied() {
                Some("left") => InputEvent::Swipe(SwipeDirection::Left),
                Some("right") => InputEvent::Swipe(SwipeDirection::Right),
                _ => return Err(bad(command, "left or right")),
            },
            "key" => match args.first().copied() {
                Some("left") => InputEvent::Key(Key::Left),
                Some("right") => InputEvent::Key(Key::Right),
                Some("plus" | "+") => InputEvent::Key(Key::Plus),
                Some("minus" | "-") => InputEvent::Key(Key::Minus),
                _ => return Err(bad(command, "left, right, plus or minus")),
            },
            "wheel" => InputEvent::Wheel(number(command, &args, 0, "a wheel delta")?),
            "pinch" => InputEvent::Pinch(number(command, &args, 0, "a zoom scale")?),
            "pinch-end" => InputEvent::PinchEnd,
            "tab" => InputEvent::Tab(number(command, &args, 0, "a tab index")?),
            "link" => InputEvent::Link(number(command, &args, 0, "a link index")?),
            "resize" => InputEvent::Resize {
                width: number(command, &args, 0, "width and height")?,
                height: number(command, &args, 1, "width and height")?,
            },
            "state" => InputEvent::State,
            "quit" | "exit" => InputEvent::Quit,
            other => return Err(InputError::UnknownCommand(other.to_string())),
        };
        Ok(Some(event))
    }

    /// Feed this event to `viewer`. `State` and `Quit` are left to the caller.
    pub fn apply_to(&self, viewer: &mut Viewer) {
        match *self {
            InputEvent::GoTo(page) => {
                viewer.navigate_to(page);
            }
            InputEvent::Next => {
                viewer.next();
            }
            InputEvent::Previous => {
                viewer.previous();
            }
            InputEvent::Redraw => {
                viewer.redraw();
            }
            InputEvent::ZoomIn => {
                viewer.zoom_in();
            }
            InputEvent::ZoomOut => {
                viewer.zoom_out();
            }
            InputEvent::Title => {
                viewer.dispatch(Command::TitleClicked);
            }
            InputEvent::Swipe(direction) => {
                viewer.dispatch(Command::Swipe(direction));
            }
            InputEvent::Key(key) => {
                viewer.dispatch(Command::Key(key));
            }
            InputEvent::Wheel(delta) => {
                viewer.dispatch(Command::Wheel { delta });
            }
            InputEvent::Pinch(scale) => {
                viewer.dispatch(Command::PinchChanged { scale });
            }
            InputEvent::PinchEnd => {
                viewer.dispatch(Command::PinchEnded);
            }
            InputEvent::Tab(index) => {
                viewer.dispatch(Command::TabClicked(index));
            }
            InputEvent::Link(index) => {
                viewer.dispatch(Command::LinkActivated(index));
            }
            InputEvent::Resize { width, height } => {
                viewer.resize(width, height);
            }
            InputEvent::State | InputEvent::Quit => {}
        }
    }
}

fn bad(command: &str, expected: &'static str) -> InputError {
    InputError::BadArgument {
        command: command.to_string(),
        expected,
    }
}

fn number<T: std::str::FromStr>(
    command: &str,
    args: &[&str],
    index: usize,
    expected: &'static str,
) -> Result<T, InputError> {
    args.get(index)
        .and_then(|arg| arg.parse().ok())
        .ok_or_else(|| bad(command, expected))
}

/// Trait for abstracting input sources to enable testing
#[async_trait]
pub trait InputSource {
    /// Next event, `None` once the source is exhausted
    async fn next_event(&mut self) -> Result<Option<InputEvent>>;
}

/// Line-oriented source (stdin or a script file)
pub struct LineInput<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> InputSource for LineInput<R> {
    async fn next_event(&mut self) -> Result<Option<InputEvent>> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(event) = InputEvent::parse(&line)? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

/// Simulated input source for testing
pub struct ScriptedInput {
    events: Vec<InputEvent>,
    current_index: usize,
}

impl ScriptedInput {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_event(&mut self) -> Result<Option<InputEvent>> {
        let event = self.events.get(self.current_index).cloned();
        if event.is_some() {
            self.current_index += 1;
        }
        Ok(event)
    }
}
