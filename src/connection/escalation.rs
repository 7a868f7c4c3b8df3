//! sudo escalation: command wrapping and the password prompt handshake.
//!
//! The wrapped command forces sudo to prompt (`sudo -k`) with a prompt
//! string that embeds a random marker, so the prompt can be told apart from
//! anything else the remote side prints. The handshake reads output until it
//! ends with that prompt, then answers with the password exactly once.

use rand::Rng;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::{ConnectionError, ConnectionResult};

/// Length of the random prompt marker
pub const MARKER_LEN: usize = 32;

/// A command wrapped for escalation, with the prompt it will print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    /// Full prompt sudo prints, marker included
    pub prompt: String,
    /// Command line to run on the host
    pub command: String,
}

impl Escalation {
    /// Wrap `command` to run as `user` with a fresh random marker.
    pub fn new(command: &str, user: &str) -> Self {
        Self::with_marker(command, user, &generate_marker())
    }

    /// Wrap `command` using a caller-chosen marker.
    pub fn with_marker(command: &str, user: &str, marker: &str) -> Self {
        let prompt = prompt_for(marker);
        let command = format!(
            "sudo -k && sudo -p \"{}\" -u {} -- \"$SHELL\" -c {}",
            prompt,
            user,
            shell_words::quote(command)
        );
        Self { prompt, command }
    }
}

/// Random marker of [`MARKER_LEN`] lowercase ASCII letters.
pub fn generate_marker() -> String {
    let mut rng = rand::thread_rng();
    (0..MARKER_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

/// The sudo prompt embedding `marker`.
pub fn prompt_for(marker: &str) -> String {
    format!("[sudo via hostexec, key={}] password: ", marker)
}

/// Read from `reader` until the accumulated output ends with `prompt`.
///
/// Each read is bounded by `per_wait`; running out of time is
/// [`ConnectionError::PromptTimeout`] and end of stream is
/// [`ConnectionError::PromptClosed`]. Returns everything read.
pub async fn await_prompt<R>(
    reader: &mut R,
    prompt: &str,
    per_wait: Duration,
    host: &str,
) -> ConnectionResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let prompt = prompt.as_bytes();
    let mut output = Vec::new();
    let mut chunk = [0u8; 4096];

    while !output.ends_with(prompt) {
        let read = tokio::time::timeout(per_wait, reader.read(&mut chunk))
            .await
            .map_err(|_| ConnectionError::PromptTimeout {
                host: host.to_string(),
            })?
            .map_err(|e| ConnectionError::execution(host, e))?;

        if read == 0 {
            return Err(ConnectionError::PromptClosed {
                host: host.to_string(),
            });
        }
        trace!(host, bytes = read, "Read chunk while waiting for prompt");
        output.extend_from_slice(&chunk[..read]);
    }

    Ok(output)
}

/// Wait for the escalation prompt, then write `password` and a newline.
///
/// Nothing is written unless the prompt was seen.
pub async fn handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    prompt: &str,
    password: &str,
    per_wait: Duration,
    host: &str,
) -> ConnectionResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let output = await_prompt(reader, prompt, per_wait, host).await?;
    debug!(host, "Escalation prompt seen, sending password");

    writer
        .write_all(format!("{}\n", password).as_bytes())
        .await
        .map_err(|e| ConnectionError::execution(host, e))?;
    writer
        .flush()
        .await
        .map_err(|e| ConnectionError::execution(host, e))?;

    Ok(output)
}
