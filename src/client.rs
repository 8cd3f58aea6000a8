//! A client speaking the fixed-frame protocol.
//!
//! Used by the `numeri_client` load generator and by the end-to-end tests.
//!
//! ```rust,no_run
//! use numeri::client::Client;
//!
//! # async fn example() -> Result<(), numeri::client::ClientError> {
//! let mut client = Client::connect("127.0.0.1:4000".parse().unwrap()).await?;
//! client.submit(b"123456789").await?;
//! assert_eq!(client.read_ack().await?, "message received: 123456789");
//! client.terminate().await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{Frame, PAYLOAD_LEN, TERMINATE};

/// Errors returned by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The socket failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The payload is not nine bytes long.
    #[error("payload must be 9 bytes, got {0}")]
    InvalidPayload(usize),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,
}

impl ClientError {
    /// Returns `true` if the server dropped the connection, cleanly or not.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ClientError::Closed => true,
            ClientError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// One connection to the server.
#[derive(Debug)]
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects to the server.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr, source })?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Sends one frame carrying `payload`.
    pub async fn submit(&mut self, payload: &[u8; PAYLOAD_LEN]) -> Result<()> {
        self.send_raw(&Frame::encode(payload)).await
    }

    /// Sends one frame carrying `payload`, which must be nine bytes.
    ///
    /// The content is not validated, so invalid payloads reach the server.
    pub async fn submit_str(&mut self, payload: &str) -> Result<()> {
        let payload: &[u8; PAYLOAD_LEN] = payload
            .as_bytes()
            .try_into()
            .map_err(|_| ClientError::InvalidPayload(payload.len()))?;
        self.submit(payload).await
    }

    /// Sends the terminate command.
    pub async fn terminate(&mut self) -> Result<()> {
        self.submit(TERMINATE).await
    }

    /// Writes arbitrary bytes, bypassing framing.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await?;
        Ok(())
    }

    /// Reads one acknowledgement line, without its trailing newline.
    ///
    /// Returns [`ClientError::Closed`] once the server has closed the
    /// connection.
    pub async fn read_ack(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::Closed);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Sends every payload, then closes the write side, while reading
    /// acknowledgements until the server closes the connection.
    ///
    /// Reading and writing overlap, so long runs cannot stall on full socket
    /// buffers. Returns the number of acknowledgements received.
    pub async fn pipeline<I, F>(&mut self, payloads: I, mut on_ack: F) -> Result<usize>
    where
        I: IntoIterator<Item = [u8; PAYLOAD_LEN]>,
        F: FnMut(&str),
    {
        let writer = &mut self.writer;
        let reader = &mut self.reader;

        let send = async move {
            for payload in payloads {
                writer.write_all(&Frame::encode(&payload)).await?;
            }
            writer.shutdown().await?;
            Ok::<_, ClientError>(())
        };

        let receive = async move {
            let mut acked = 0;
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => return Ok(acked),
                    Ok(_) => {
                        on_ack(line.trim_end_matches('\n'));
                        acked += 1;
                    }
                    Err(e) => {
                        let e = ClientError::from(e);
                        if e.is_disconnect() {
                            return Ok(acked);
                        }
                        return Err(e);
                    }
                }
            }
        };

        let (sent, acked) = tokio::join!(send, receive);
        sent?;
        acked
    }

    /// Closes the write side; the server sees a clean end of stream.
    pub async fn finish(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
