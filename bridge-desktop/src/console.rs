//! Console prompt reading from standard input

use async_trait::async_trait;
use bridge_traits::{error::Result, interaction::ConsolePrompt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Console prompt over arbitrary async streams.
///
/// [`StdinConsole::new`] wires it to the process's stdin/stdout; tests can
/// substitute in-memory streams with [`StdinConsole::with_streams`].
pub struct StdinConsole<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    io: Mutex<(R, W)>,
}

impl StdinConsole {
    pub fn new() -> Self {
        Self::with_streams(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdinConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdinConsole<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_streams(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

#[async_trait]
impl<R, W> ConsolePrompt for StdinConsole<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn prompt_line(&self, message: &str) -> Result<String> {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        writer.write_all(message.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut line = String::new();
        reader.read_line(&mut line).await?;

        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_reads_one_line_and_echoes_message() {
        let input: &[u8] = b"http://cb?code=42\r\nignored\n";
        let console = StdinConsole::with_streams(input, Vec::new());

        let line = console.prompt_line("Paste the URL:").await.unwrap();
        assert_eq!(line, "http://cb?code=42");

        let guard = console.io.lock().await;
        assert_eq!(guard.1, b"Paste the URL:\n".to_vec());
    }

    #[tokio::test]
    async fn test_prompt_on_closed_input_returns_empty() {
        let input: &[u8] = b"";
        let console = StdinConsole::with_streams(input, Vec::new());

        assert_eq!(console.prompt_line("?").await.unwrap(), "");
    }
}
