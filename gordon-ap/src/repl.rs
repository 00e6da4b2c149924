//! Line-oriented command loop
//!
//! Reads one command per line, runs it against the session and writes the
//! result. Generic over the reader and writer so tests can drive it with
//! in-memory buffers.

use crate::commands::{handle_line, Outcome};
use crate::session::Session;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const PROMPT: &str = "> ";

/// Run commands until `exit` or end of input.
pub async fn run<R, W>(session: &mut Session, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    writer.write_all(PROMPT.as_bytes()).await?;
    writer.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match handle_line(session, line.trim()).await {
            Outcome::Exit => {
                writer.write_all(b"Goodbye!\n").await?;
                writer.flush().await?;
                info!("Exit requested");
                return Ok(());
            }
            Outcome::Output(text) => {
                if !text.is_empty() {
                    writer.write_all(text.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
            }
        }
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("Input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::deck::Deck;
    use gordon_common::PlayerConfig;

    async fn run_script(script: &str) -> String {
        let mut session = Session::new(PlayerConfig::default(), Deck::shared());
        let mut out = Vec::new();
        run(&mut session, script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_exit_stops_reading() {
        let out = run_script("bye\npos\n").await;
        assert!(out.contains("Goodbye!"));
        assert!(!out.contains("No audio loaded"));
    }

    #[tokio::test]
    async fn test_errors_are_reported_and_loop_continues() {
        let out = run_script("pos\npink 20\nquit\n").await;
        assert!(out.contains("error: No audio loaded"));
        assert!(out.contains("Pink noise on (20%)"));
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn test_end_of_input_ends_loop() {
        let out = run_script("pink\n").await;
        assert!(out.starts_with(PROMPT));
        assert!(!out.contains("Goodbye!"));
    }
}
