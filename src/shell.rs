// src/shell.rs

use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{cmd}` was terminated by a signal")]
    Signal { cmd: String },
}

/// Exit code and combined stdout+stderr of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn lines(&self) -> Vec<String> {
        self.output.lines().map(str::to_string).collect()
    }
}

/// Seam for everything that shells out. Implementations must not block
/// indefinitely; callers pass commands that carry their own timeouts.
pub trait CommandRunner {
    fn run(&self, cmd: &str) -> Result<CommandOutput, ShellError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &str) -> Result<CommandOutput, ShellError> {
        (**self).run(cmd)
    }
}

/// Runs commands through `sh -c`, capturing stdout and stderr interleaved
/// into one string. A nonzero exit code is a normal `CommandOutput`, not an
/// error; only spawn failures and signal terminations are `ShellError`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str) -> Result<CommandOutput, ShellError> {
        let out = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .map_err(|e| ShellError::Spawn {
                cmd: cmd.to_string(),
                source: e,
            })?;

        let code = match out.status.code() {
            Some(code) => code,
            None => {
                return Err(ShellError::Signal {
                    cmd: cmd.to_string(),
                });
            }
        };

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));

        Ok(CommandOutput { code, output })
    }
}

/// Single-quote `s` for safe interpolation into an `sh -c` command line.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_wraps_plain_text() {
        assert_eq!(quote("hello"), "'hello'");
    }

    #[test]
    fn quote_escapes_embedded_quotes() {
        assert_eq!(quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn command_output_lines_split() {
        let out = CommandOutput {
            code: 0,
            output: "Up to date\nSyncing 3 files\n".to_string(),
        };
        assert_eq!(out.lines(), vec!["Up to date", "Syncing 3 files"]);
    }
}
