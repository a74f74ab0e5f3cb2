use log::{debug, error};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffered reader over the inbound half of the console socket.
///
/// The wire protocol is a pure line stream: newline-delimited text, no
/// framing or length prefix. Invalid UTF-8 is replaced rather than treated
/// as a stream failure.
pub struct LineReader {
    reader: BufReader<OwnedReadHalf>,
    buffer: Vec<u8>,
}

impl LineReader {
    pub fn new(half: OwnedReadHalf) -> Self {
        Self {
            reader: BufReader::new(half),
            buffer: Vec::with_capacity(512),
        }
    }

    /// Read the next line, without its terminator.
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buffer.clear();
        let read = self.reader.read_until(b'\n', &mut self.buffer).await?;
        if read == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buffer)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        Ok(Some(line))
    }
}

/// Spawn the single writer task for the outbound half.
///
/// All senders push complete, newline-terminated lines through the returned
/// channel; one task owning the socket half means commands never interleave
/// mid-line.
pub fn start_writer(mut half: OwnedWriteHalf, buffer: usize) -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(buffer);

    let handle = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = half.write_all(line.as_bytes()).await {
                error!("Error writing command: {}", e);
                break;
            }
            if let Err(e) = half.flush().await {
                error!("Error flushing command: {}", e);
                break;
            }
        }
        debug!("writer task finished");
    });

    (tx, handle)
}
