use std::io::{self, BufRead, Write};
use std::thread;

use colored::{Color, Colorize};
use futures::{FutureExt, StreamExt};
use futures_channel::mpsc::{self, UnboundedReceiver};
use supports_color::Stream;
use tracing::debug;

use super::SyncUi;

const EXIT_WORDS: [&str; 3] = ["q", "quit", "exit"];

fn is_exit(line: &str) -> bool {
    EXIT_WORDS
        .iter()
        .any(|word| line.trim().eq_ignore_ascii_case(word))
}

/// Terminal prompts. Stdin is read on a background thread and forwarded
/// line by line, so the continue prompt can check for input without blocking.
pub struct ConsoleUi {
    lines: UnboundedReceiver<String>,
    colored: bool,
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUi {
    pub fn new() -> Self {
        let (sender, lines) = mpsc::unbounded();

        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if sender.unbounded_send(line).is_err() {
                    break;
                }
            }
            debug!("Stdin closed");
        });

        Self {
            lines,
            colored: supports_color::on(Stream::Stdout).is_some(),
        }
    }

    fn say(&self, text: &str, color: Color) {
        let mut stdout = io::stdout().lock();
        let _ = if self.colored {
            writeln!(stdout, "{}", text.color(color))
        } else {
            writeln!(stdout, "{text}")
        };
        let _ = stdout.flush();
    }
}

impl SyncUi for ConsoleUi {
    async fn directory_prompt(&mut self, valid: usize, minimum: usize) -> Option<String> {
        self.say(
            &format!(
                "{valid} of {minimum} directories set. Enter a directory to synchronize ('q' to quit):"
            ),
            Color::Cyan,
        );

        let line = self.lines.next().await?;
        if is_exit(&line) {
            return None;
        }
        Some(line.trim().to_string())
    }

    async fn continue_prompt(&mut self) -> bool {
        loop {
            match self.lines.next().now_or_never() {
                Some(Some(line)) if is_exit(&line) => {
                    self.say("Stopping after this cycle", Color::Yellow);
                    return false;
                }
                Some(Some(_)) => continue,
                Some(None) | None => return true,
            }
        }
    }
}
