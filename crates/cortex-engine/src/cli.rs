use crate::agent::Agent;
use crate::dispatch::handle_json;
use crate::formatter::format_result;
use std::error::Error;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Clone, Copy)]
pub struct OutputHandlers {
    pub out: fn(&str),
    pub err: fn(&str),
}

/// How each input line is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// A natural-language command.
    Natural,
    /// A JSON request message; the JSON response is printed as one line.
    Json,
}

/// Per-line settings shared by file and REPL mode.
#[derive(Debug, Clone, Copy)]
pub struct LineOptions<'a> {
    pub mode: InputMode,
    pub persona: Option<&'a str>,
}

pub struct FileOptions {
    pub stop_on_error: bool,
}

pub struct ReplOptions<'a> {
    pub banner_lines: &'a [&'a str],
    pub prompt: &'a str,
    pub exit_commands: &'a [&'a str],
    pub ctrl_c_message: Option<&'a str>,
}

const CANCEL_COMMAND: &str = ":cancel";

/// One line of script or REPL input.
#[derive(Debug, PartialEq, Eq)]
enum ScriptLine<'a> {
    Blank,
    Cancel,
    Exit,
    Command(&'a str),
}

/// Comments (`#`) and blank lines are skipped; exit commands only apply in the REPL.
fn classify_line<'a>(line: &'a str, exit_commands: &[&str]) -> ScriptLine<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        ScriptLine::Blank
    } else if trimmed == CANCEL_COMMAND {
        ScriptLine::Cancel
    } else if exit_commands.contains(&trimmed) {
        ScriptLine::Exit
    } else {
        ScriptLine::Command(trimmed)
    }
}

async fn execute_command(
    agent: &Agent,
    command: &str,
    options: LineOptions<'_>,
) -> Result<String, String> {
    match options.mode {
        InputMode::Natural => {
            let result = agent.run(command, options.persona).await;
            let text = format_result(&result);
            if result.ok { Ok(text) } else { Err(text) }
        }
        InputMode::Json => {
            let response = handle_json(agent, command).await;
            let text = response.to_string();
            if response.get("error").is_some() {
                Err(text)
            } else {
                Ok(text)
            }
        }
    }
}

/// Run every command in `path`, reporting failures with their line number.
pub async fn run_file(
    agent: &Agent,
    output: OutputHandlers,
    path: &str,
    line_options: LineOptions<'_>,
    options: FileOptions,
) -> Result<(), Box<dyn Error>> {
    let content = tokio::fs::read_to_string(path).await?;
    for (index, line) in content.lines().enumerate() {
        let command = match classify_line(line, &[]) {
            ScriptLine::Blank | ScriptLine::Exit => continue,
            ScriptLine::Cancel => {
                agent.cancel_highlight().await;
                continue;
            }
            ScriptLine::Command(command) => command,
        };

        match execute_command(agent, command, line_options).await {
            Ok(result) => (output.out)(&result),
            Err(err) => {
                let message = format!("line {} ({}): {}", index + 1, command, err);
                (output.err)(&message);
                if options.stop_on_error {
                    return Err(io::Error::other(message).into());
                }
            }
        }
    }
    Ok(())
}

pub async fn run_repl(
    agent: &Agent,
    output: OutputHandlers,
    line_options: LineOptions<'_>,
    options: ReplOptions<'_>,
) -> Result<(), Box<dyn Error>> {
    for line in options.banner_lines {
        (output.out)(line);
    }

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("{}", options.prompt);
        stdout.flush()?;

        let line = tokio::select! {
            line = reader.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                if let Some(message) = options.ctrl_c_message {
                    (output.out)(message);
                }
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match classify_line(&line, options.exit_commands) {
            ScriptLine::Blank => continue,
            ScriptLine::Exit => break,
            ScriptLine::Cancel => {
                agent.cancel_highlight().await;
                (output.out)("Highlights cancelled.");
            }
            ScriptLine::Command(command) => {
                match execute_command(agent, command, line_options).await {
                    Ok(result) => (output.out)(&result),
                    Err(err) => (output.err)(&err),
                }
            }
        }
    }
    Ok(())
}
