//! Operator console: input line sources, the port prompt, and printed events.

use std::future::Future;
use std::io::{BufRead, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;

use crate::relay::RelayEvents;

/// Operator lines buffered between the input thread and the sender loop.
const OPERATOR_QUEUE: usize = 64;

/// A source of operator input lines, without terminators.
pub trait LineSource {
    /// Returns the next line, or `None` once the source is exhausted.
    fn next_line(&mut self) -> impl Future<Output = std::io::Result<Option<String>>> + Send;
}

/// Lines read from any buffered async reader.
pub struct ReaderLines<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> ReaderLines<R> {
    /// Wraps `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineSource for ReaderLines<R> {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Lines pushed through a channel; exhausted when every sender is dropped.
pub struct ChannelLines {
    rx: mpsc::Receiver<String>,
}

impl ChannelLines {
    /// Creates the source and a sender feeding it.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }

    /// Feeds the source from a blocking reader on a dedicated thread.
    ///
    /// The thread is detached, so a read that never returns does not hold
    /// up runtime shutdown. The source ends at end of input, on a read
    /// error, or once it is dropped and the next line arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_reader<R>(reader: R, capacity: usize) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, source) = Self::channel(capacity);
        std::thread::Builder::new()
            .name("operator-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if tx.blocking_send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "operator input read failed");
                            break;
                        }
                    }
                }
            })?;
        Ok(source)
    }

    /// Lines typed on the process's standard input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input thread cannot be spawned.
    pub fn stdin() -> std::io::Result<Self> {
        Self::spawn_reader(std::io::BufReader::new(std::io::stdin()), OPERATOR_QUEUE)
    }
}

impl LineSource for ChannelLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Ok(self.rx.recv().await)
    }
}

/// Asks the operator whether to override the datagram port.
///
/// Returns `current` unless the operator answers `y` and then a valid port
/// number.
///
/// # Errors
///
/// Returns an error if reading the source or writing the prompt fails.
pub async fn prompt_port_override<S, W>(source: &mut S, out: &mut W, current: u16) -> std::io::Result<u16>
where
    S: LineSource,
    W: Write,
{
    writeln!(out, "Change the UDP port (currently {current})? (y/n)")?;
    out.flush()?;
    let Some(answer) = source.next_line().await? else {
        return Ok(current);
    };
    if !answer.trim().eq_ignore_ascii_case("y") {
        return Ok(current);
    }

    writeln!(out, "Enter the new UDP port:")?;
    out.flush()?;
    let port = source
        .next_line()
        .await?
        .and_then(|input| input.trim().parse::<u16>().ok());

    if let Some(port) = port {
        tracing::info!(port, "UDP port changed by operator");
        writeln!(out, "UDP port changed to {port}")?;
        Ok(port)
    } else {
        writeln!(out, "Invalid port; keeping {current}.")?;
        Ok(current)
    }
}

/// [`RelayEvents`] printed to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEvents;

impl RelayEvents for ConsoleEvents {
    fn connected(&self, timestamp: &str, name: &str) {
        println!("{timestamp} {name} connected.");
    }

    fn disconnected(&self, timestamp: &str, name: Option<&str>) {
        match name {
            Some(name) => println!("{timestamp} {name} disconnected."),
            None => println!("{timestamp} Unknown client disconnected."),
        }
    }

    fn public_message(&self, line: &str) {
        println!("{line}");
    }
}
