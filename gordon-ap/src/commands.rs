//! Command grammar and dispatcher
//!
//! Each REPL line is split into words and parsed with clap into a
//! [`Command`]. Executing a command returns a one-line status (listings span
//! several lines) or a typed error, which [`handle_line`] renders as
//! `error: ...`. No error tears down the session.

use crate::error::{Error, Result};
use crate::playback::markers::Marker;
use crate::playback::mixer::TrackId;
use crate::session::Session;
use clap::{Parser, Subcommand};
use gordon_common::time::format_position;
use std::path::PathBuf;
use tracing::debug;

/// One parsed REPL line
#[derive(Parser, Debug, PartialEq)]
#[command(name = "gordon", no_binary_name = true, disable_version_flag = true)]
#[command(about = "Commands for the gordon player")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

/// Player commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start a new session playing the files together
    Load {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Add a file as a new track
    Add {
        file: PathBuf,

        /// Leading silence in seconds
        #[arg(long, default_value_t = 0.0)]
        offset: f64,
    },

    /// Remove a track by id
    Remove { id: TrackId },

    /// List tracks
    Tracks,

    /// Pause or resume
    Pause,

    /// Skip forward (default: configured seek step)
    Forward {
        #[arg(allow_negative_numbers = true)]
        secs: Option<f64>,
    },

    /// Skip back (default: configured seek step)
    Rewind {
        #[arg(allow_negative_numbers = true)]
        secs: Option<f64>,
    },

    /// Raise the volume one step
    Louder,

    /// Lower the volume one step
    Quieter,

    /// Set the volume in percent
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },

    /// Set the playback speed multiplier
    Speed { factor: f64 },

    /// Loop between two markers
    Loop {
        from: usize,
        to: usize,

        /// Number of passes, negative for forever
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        count: i64,
    },

    /// Stop looping
    Unloop,

    /// Save the current position in a marker slot
    Mark { index: usize },

    /// Jump to a marker
    Goto { index: usize },

    /// List markers
    Markers,

    /// Write the region between two markers to a WAV file
    Export {
        from: usize,
        to: usize,

        /// Output file (default: timestamped file in the export directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Toggle pink noise, or set its volume
    Pink {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },

    /// Show position, volume and speed
    Pos,

    /// Leave the player
    #[command(visible_aliases = ["quit", "q", "Q", "bye"])]
    Exit,
}

/// Result of one REPL line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to print (may be empty)
    Output(String),
    /// Leave the REPL
    Exit,
}

/// Split a line into words; double quotes group words containing spaces.
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}

/// Parse one REPL line.
///
/// Returns `Ok(None)` for a blank line. Clap's own output (help, usage
/// errors) comes back as `Err` with the rendered text.
pub fn parse_line(line: &str) -> std::result::Result<Option<Command>, String> {
    let words = split_words(line);
    if words.is_empty() {
        return Ok(None);
    }
    CommandLine::try_parse_from(words)
        .map(|parsed| Some(parsed.command))
        .map_err(|e| e.render().to_string().trim_end().to_string())
}

/// Parse and run one line, rendering errors as `error: ...`.
///
/// A blank line toggles pause.
pub async fn handle_line(session: &mut Session, line: &str) -> Outcome {
    let command = match parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => Command::Pause,
        Err(text) => return Outcome::Output(text),
    };
    debug!("Command: {:?}", command);

    match execute(session, command).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Output(render_error(&e)),
    }
}

fn fmt_marker(index: usize, marker: &Marker) -> String {
    format!("marker {} ({})", index, format_position(marker.seconds))
}

/// Run one parsed command against the session.
pub async fn execute(session: &mut Session, command: Command) -> Result<Outcome> {
    let rate = session.sample_rate();
    let text = match command {
        Command::Load { files } => {
            let count = session.load(&files).await?;
            format!("Loaded {} file(s): {}", count, session.status()?)
        }
        Command::Add { file, offset } => {
            let id = session.add(&file, offset).await?;
            format!("Added track {} ({}, offset {:.3}s)", id, file.display(), offset)
        }
        Command::Remove { id } => {
            let info = session.remove(id)?;
            format!("Removed track {} ({})", info.id, info.name)
        }
        Command::Tracks => {
            let tracks = session.tracks()?;
            if tracks.is_empty() {
                "No tracks".to_string()
            } else {
                tracks
                    .iter()
                    .map(|t| {
                        format!(
                            "{:>3}  {}  offset {}  length {}",
                            t.id,
                            t.name,
                            format_position(rate.secs_of(t.offset_frames)),
                            format_position(rate.secs_of(t.len_frames))
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Pause => {
            if session.toggle_pause()? {
                "Paused".to_string()
            } else {
                "Playing".to_string()
            }
        }
        Command::Forward { secs } => {
            let step = secs.unwrap_or(session.config().seek_step_seconds);
            session.seek_relative(step)?;
            session.status()?.to_string()
        }
        Command::Rewind { secs } => {
            let step = secs.unwrap_or(session.config().seek_step_seconds);
            session.seek_relative(-step)?;
            session.status()?.to_string()
        }
        Command::Louder => {
            let step = session.config().volume_step_percent as i32;
            format!("Volume: {}%", session.step_volume(step)?)
        }
        Command::Quieter => {
            let step = session.config().volume_step_percent as i32;
            format!("Volume: {}%", session.step_volume(-step)?)
        }
        Command::Volume { percent } => {
            session.set_volume(percent)?;
            format!("Volume: {}%", percent)
        }
        Command::Speed { factor } => {
            session.set_speed(factor)?;
            format!("Speed: {:.2}x", factor)
        }
        Command::Loop { from, to, count } => {
            let (start, end) = session.set_loop(from, to, count)?;
            let times = if count < 0 {
                "forever".to_string()
            } else {
                format!("{} time(s)", count)
            };
            format!(
                "Looping {} to {}, {}",
                fmt_marker(from, &start),
                fmt_marker(to, &end),
                times
            )
        }
        Command::Unloop => {
            session.clear_loop()?;
            "Loop cleared".to_string()
        }
        Command::Mark { index } => {
            let marker = session.mark(index)?;
            format!("Set {}", fmt_marker(index, &marker))
        }
        Command::Goto { index } => {
            let marker = session.goto(index)?;
            format!("At {}", fmt_marker(index, &marker))
        }
        Command::Markers => session
            .markers()?
            .iter()
            .map(|(i, m)| format!("{:>3}  {}", i, format_position(m.seconds)))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Export { from, to, out } => {
            let path = session.export(from, to, out).await?;
            format!("Exported {} to {} to {}", from, to, path.display())
        }
        Command::Pink { volume } => match session.pink_noise(volume) {
            Some(percent) => format!("Pink noise on ({}%)", percent),
            None => "Pink noise off".to_string(),
        },
        Command::Pos => session.status()?.to_string(),
        Command::Exit => return Ok(Outcome::Exit),
    };
    Ok(Outcome::Output(text))
}

/// User-facing text for a failed command
pub fn render_error(error: &Error) -> String {
    format!("error: {}", error)
}
