use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use colored::*;
use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::terminal::colors;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq, Eq)]
pub enum LineEdit {
    Continue,
    Submit,
    Abort,
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Applies one key press to the line being edited.
pub fn apply_key(buf: &mut String, key: &KeyEvent) -> LineEdit {
    if is_ctrl_c(key) {
        return LineEdit::Abort;
    }
    match key.code {
        KeyCode::Enter => LineEdit::Submit,
        KeyCode::Esc => LineEdit::Abort,
        KeyCode::Backspace => {
            buf.pop();
            LineEdit::Continue
        }
        KeyCode::Char(c) => {
            buf.push(c);
            LineEdit::Continue
        }
        _ => LineEdit::Continue,
    }
}

/// `Some(answer)` once the key settles a yes/no question.
pub fn confirm_key(key: &KeyEvent) -> Option<Option<bool>> {
    if is_ctrl_c(key) {
        return Some(None);
    }
    match key.code {
        KeyCode::Char('y' | 'Y') | KeyCode::Enter => Some(Some(true)),
        KeyCode::Char('n' | 'N') => Some(Some(false)),
        KeyCode::Esc => Some(None),
        _ => None,
    }
}

pub fn is_interrupt(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press && (key.code == KeyCode::Char('q') || is_ctrl_c(key))
}

/// Raw mode for as long as the guard lives.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn next_press() -> io::Result<KeyEvent> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key);
            }
        }
    }
}

fn redraw(label: &str, buf: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    queue!(
        stdout,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(format!("{} {}", label.color(colors::PRIMARY), buf))
    )?;
    stdout.flush()
}

fn finish_line() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(b"\r\n")?;
    stdout.flush()
}

/// Single line of input. `None` on Esc or Ctrl-C.
pub fn read_line(label: &str, initial: &str) -> Option<String> {
    let result = (|| -> io::Result<Option<String>> {
        let _raw = RawMode::enable()?;
        let mut buf = initial.to_string();
        redraw(label, &buf)?;
        loop {
            let key = next_press()?;
            match apply_key(&mut buf, &key) {
                LineEdit::Continue => redraw(label, &buf)?,
                LineEdit::Submit => {
                    finish_line()?;
                    return Ok(Some(buf));
                }
                LineEdit::Abort => {
                    finish_line()?;
                    return Ok(None);
                }
            }
        }
    })();

    result.unwrap_or_else(|e| {
        warn!("Terminal input unavailable: {e}");
        None
    })
}

/// Yes/No answer. Enter picks yes, Esc backs out.
pub fn read_confirm() -> Option<bool> {
    let result = (|| -> io::Result<Option<bool>> {
        let _raw = RawMode::enable()?;
        redraw(&format!("{}", "[Y/n]".color(colors::ACCENT)), "")?;
        loop {
            if let Some(answer) = confirm_key(&next_press()?) {
                finish_line()?;
                return Ok(answer);
            }
        }
    })();

    result.unwrap_or_else(|e| {
        warn!("Terminal input unavailable: {e}");
        None
    })
}

pub fn wait_for_dismiss() {
    let result = (|| -> io::Result<()> {
        let _raw = RawMode::enable()?;
        redraw(&format!("{}", "Press Enter to continue".bright_black()), "")?;
        loop {
            let key = next_press()?;
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) || is_ctrl_c(&key) {
                return finish_line();
            }
        }
    })();

    if let Err(e) = result {
        debug!("Could not wait for dismissal: {e}");
    }
}

/// Cancels `cancel` when 'q' or Ctrl-C is pressed while the output view is open.
pub struct KeyWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyWatcher {
    pub fn start(cancel: CancellationToken) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let _raw = match RawMode::enable() {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Key watcher disabled: {e}");
                    return;
                }
            };
            while !flag.load(Ordering::Relaxed) {
                match event::poll(POLL_INTERVAL) {
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) if is_interrupt(&key) => {
                            warn!("Cancelling scan...");
                            cancel.cancel();
                            break;
                        }
                        _ => {}
                    },
                    Ok(false) => {}
                    Err(e) => {
                        debug!("Key watcher stopped: {e}");
                        break;
                    }
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for KeyWatcher {
    fn drop(&mut self) {
        self.halt();
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
