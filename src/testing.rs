// src/testing.rs
//
// Scripted stand-ins for the shell seam, shared by unit and integration
// tests. Not compiled into release binaries beyond the type definitions.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use crate::shell::{CommandOutput, CommandRunner, ShellError};

/// Replays queued [`CommandOutput`]s in order and records every command
/// line it was asked to run. An exhausted script answers with exit 0 and
/// empty output. An optional delay before each answer lets tests exercise
/// elapsed-time logic (the suspend wake-cause inference).
#[derive(Default)]
pub struct MockRunner {
    responses: RefCell<VecDeque<CommandOutput>>,
    calls: RefCell<Vec<String>>,
    delay: Cell<Duration>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, output: &str) {
        self.push_exit(0, output);
    }

    pub fn push_exit(&self, code: i32, output: &str) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            output: output.to_string(),
        });
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &str) -> Result<CommandOutput, ShellError> {
        self.calls.borrow_mut().push(cmd.to_string());
        let delay = self.delay.get();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(CommandOutput {
                code: 0,
                output: String::new(),
            }))
    }
}
