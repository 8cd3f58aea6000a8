//! One accepted connection, driven frame by frame.
//!
//! ```text
//!            ┌──────────── loop ◄───────────┐
//!            ▼                              │
//!   signal fired? ── yes ──► Shutdown       │
//!            │ no                           │
//!   read 10 bytes ── EOF ──► PeerClosed     │
//!            │     ── short / error ──► Protocol
//!   decode ── invalid ──► Protocol          │
//!            ├── terminate ──► Terminated   │
//!            └── record ──► dedup, count, ack
//! ```
//!
//! Whatever the exit, the socket is closed and the join-barrier slot
//! released before [`Session::run`] returns. A session that read the
//! terminate command then calls [`ShutdownCoordinator::stop`] and returns
//! only once every other session has exited.
//!
//! [`ShutdownCoordinator::stop`]: crate::shutdown::ShutdownCoordinator::stop

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

use crate::protocol::{Frame, ProtocolError, RecordKey, FRAME_LEN, PAYLOAD_LEN, TERMINATOR};
use crate::server::ServerContext;
use crate::shutdown::SessionGuard;

/// How a session ended.
#[derive(Debug)]
pub enum SessionExit {
    /// The peer closed the stream on a frame boundary.
    PeerClosed,
    /// The peer sent something that is not a valid frame, or the socket
    /// failed. The connection was closed without a reply.
    Protocol(ProtocolError),
    /// The shutdown signal was already fired when the next frame was due.
    Shutdown,
    /// The peer sent the terminate command and the server has drained.
    Terminated,
}

impl SessionExit {
    /// Returns `true` for exits that are not the peer's fault.
    pub fn is_normal(&self) -> bool {
        !matches!(self, SessionExit::Protocol(_))
    }
}

/// A connection session over any byte stream.
pub struct Session<S> {
    stream: S,
    context: Arc<ServerContext>,
    guard: SessionGuard,
    permit: Option<OwnedSemaphorePermit>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session and takes its slot on the join barrier.
    pub fn new(stream: S, context: Arc<ServerContext>) -> Self {
        let guard = context.shutdown().enter();
        Self {
            stream,
            context,
            guard,
            permit: None,
        }
    }

    /// Attaches the connection-cap permit, released when the socket closes.
    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Serves frames until the session ends.
    pub async fn run(self) -> SessionExit {
        let Session {
            mut stream,
            context,
            guard,
            permit,
        } = self;

        let exit = serve(&mut stream, &context).await;

        drop(stream);
        drop(permit);
        guard.release();

        match &exit {
            SessionExit::Terminated => {
                debug!("terminate received");
                context.shutdown().stop().await;
            }
            SessionExit::Protocol(e) => debug!(error = %e, "closing connection"),
            other => debug!(exit = ?other, "session ended"),
        }
        exit
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("permit", &self.permit.is_some())
            .finish_non_exhaustive()
    }
}

async fn serve<S>(stream: &mut S, context: &ServerContext) -> SessionExit
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut frame = [0u8; FRAME_LEN];
    loop {
        if context.shutdown().is_fired() {
            return SessionExit::Shutdown;
        }

        match read_frame(stream, &mut frame).await {
            Ok(true) => {}
            Ok(false) => return SessionExit::PeerClosed,
            Err(e) => return SessionExit::Protocol(e),
        }

        match Frame::decode(&frame) {
            Ok(Frame::Record(key)) => {
                if let Err(e) = accept_record(stream, context, key).await {
                    return SessionExit::Protocol(e);
                }
            }
            Ok(Frame::Terminate) => return SessionExit::Terminated,
            Err(e) => return SessionExit::Protocol(e),
        }
    }
}

/// Fills `frame` completely. Returns `Ok(false)` on a clean end of stream.
///
/// A frame may arrive in several chunks, but a `\n` inside the payload ends
/// the frame early and is reported as soon as it is read.
async fn read_frame<S>(stream: &mut S, frame: &mut [u8; FRAME_LEN]) -> Result<bool, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    let mut read = 0;
    while read < FRAME_LEN {
        let n = match stream.read(&mut frame[read..]).await? {
            0 if read == 0 => return Ok(false),
            0 => return Err(ProtocolError::Truncated { read }),
            n => n,
        };
        let payload = &frame[read.min(PAYLOAD_LEN)..(read + n).min(PAYLOAD_LEN)];
        if let Some(at) = payload.iter().position(|&b| b == TERMINATOR) {
            return Err(ProtocolError::ShortFrame { len: read + at });
        }
        read += n;
    }
    Ok(true)
}

async fn accept_record<S>(
    stream: &mut S,
    context: &ServerContext,
    key: RecordKey,
) -> Result<(), ProtocolError>
where
    S: AsyncWrite + Unpin,
{
    if !context.dedup().insert(key) {
        context.counters().record_duplicate();
        return Ok(());
    }

    context.record_log().record(key.display());
    context.counters().record_new();
    stream.write_all(key.ack().as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_log::MemoryRecordLog;
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    fn context() -> (Arc<ServerContext>, Arc<MemoryRecordLog>) {
        let log = Arc::new(MemoryRecordLog::new());
        (Arc::new(ServerContext::new(log.clone())), log)
    }

    fn spawn_session(context: &Arc<ServerContext>) -> (DuplexStream, JoinHandle<SessionExit>) {
        let (client, server) = duplex(1024);
        let session = Session::new(server, Arc::clone(context));
        (client, tokio::spawn(session.run()))
    }

    async fn finish(session: JoinHandle<SessionExit>) -> SessionExit {
        timeout(Duration::from_secs(5), session)
            .await
            .unwrap()
            .unwrap()
    }

    async fn read_all(client: &mut DuplexStream) -> String {
        let mut out = String::new();
        timeout(Duration::from_secs(5), client.read_to_string(&mut out))
            .await
            .unwrap()
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_acks_only_new_records() {
        let (context, log) = context();
        let (mut client, session) = spawn_session(&context);

        client
            .write_all(b"123456789\n987654321\n123456789\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(
            read_all(&mut client).await,
            "message received: 123456789\nmessage received: 987654321\n"
        );
        assert!(matches!(finish(session).await, SessionExit::PeerClosed));

        let report = context.counters().snapshot();
        assert_eq!((report.new, report.duplicate, report.total), (2, 1, 2));
        assert_eq!(log.lines(), ["123456789", "987654321"]);
        assert_eq!(context.shutdown().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_leading_zeros_are_stripped_for_display_only() {
        let (context, log) = context();
        let (mut client, session) = spawn_session(&context);

        client
            .write_all(b"000000011\n000000001\n000000011\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(
            read_all(&mut client).await,
            "message received: 11\nmessage received: 1\n"
        );
        finish(session).await;
        assert_eq!(log.lines(), ["11", "1"]);
        assert_eq!(context.dedup().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_payload_closes_silently() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client
            .write_all(b"12345678a\n123456789\n")
            .await
            .unwrap();

        assert_eq!(read_all(&mut client).await, "");
        assert!(matches!(
            finish(session).await,
            SessionExit::Protocol(ProtocolError::InvalidPayload)
        ));
        assert!(context.dedup().is_empty());
        assert!(!context.shutdown().is_fired());
    }

    #[tokio::test]
    async fn test_wrong_case_terminate_is_invalid() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"Terminate\n").await.unwrap();

        let exit = finish(session).await;
        assert!(!exit.is_normal());
        assert!(!context.shutdown().is_fired());
        drop(client);
    }

    #[tokio::test]
    async fn test_missing_terminator() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"123456789 ").await.unwrap();

        assert!(matches!(
            finish(session).await,
            SessionExit::Protocol(ProtocolError::MissingTerminator { found: b' ' })
        ));
        assert!(context.dedup().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"12345").await.unwrap();
        client.shutdown().await.unwrap();

        assert!(matches!(
            finish(session).await,
            SessionExit::Protocol(ProtocolError::Truncated { read: 5 })
        ));
    }

    #[tokio::test]
    async fn test_short_line_closes_without_waiting() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"12345\n").await.unwrap();

        assert!(matches!(
            finish(session).await,
            SessionExit::Protocol(ProtocolError::ShortFrame { len: 5 })
        ));
        assert_eq!(context.shutdown().outstanding(), 0);
        assert_eq!(read_all(&mut client).await, "");
    }

    #[tokio::test]
    async fn test_short_line_split_across_writes() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"1234").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"56\n").await.unwrap();

        assert!(matches!(
            finish(session).await,
            SessionExit::Protocol(ProtocolError::ShortFrame { len: 6 })
        ));
        drop(client);
    }

    #[tokio::test]
    async fn test_frame_split_across_writes() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"1234").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"56789\n").await.unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(read_all(&mut client).await, "message received: 123456789\n");
        assert!(matches!(finish(session).await, SessionExit::PeerClosed));
    }

    #[tokio::test]
    async fn test_single_decimal_point_is_accepted() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"12345.789\n1.2.3.4.5\n").await.unwrap();

        assert_eq!(read_all(&mut client).await, "message received: 12345.789\n");
        assert!(matches!(
            finish(session).await,
            SessionExit::Protocol(ProtocolError::InvalidPayload)
        ));
    }

    #[tokio::test]
    async fn test_terminate_stops_server() {
        let (context, _log) = context();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"123456789\nterminate\n").await.unwrap();

        assert_eq!(read_all(&mut client).await, "message received: 123456789\n");
        assert!(matches!(finish(session).await, SessionExit::Terminated));
        assert!(context.shutdown().is_fired());
        assert!(context.shutdown().is_listener_closing());
        assert_eq!(context.shutdown().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_terminate_waits_for_other_sessions() {
        let (context, _log) = context();
        let (mut idle, idle_session) = spawn_session(&context);
        let (mut client, session) = spawn_session(&context);

        // Park the idle session in a read.
        let ack = b"message received: 111111111\n";
        let mut buf = [0u8; 28];
        idle.write_all(b"111111111\n").await.unwrap();
        idle.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, ack);

        client.write_all(b"terminate\n").await.unwrap();
        timeout(Duration::from_secs(5), context.shutdown().fired())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!session.is_finished());
        assert!(!context.shutdown().is_listener_closing());

        // The idle session finishes its pending frame, then sees the signal.
        idle.write_all(b"222222222\n333333333\n").await.unwrap();
        assert_eq!(read_all(&mut idle).await, "message received: 222222222\n");
        assert!(matches!(finish(idle_session).await, SessionExit::Shutdown));
        assert!(matches!(finish(session).await, SessionExit::Terminated));
        assert!(context.shutdown().is_listener_closing());
    }

    #[tokio::test]
    async fn test_session_after_shutdown_reads_nothing() {
        let (context, _log) = context();
        context.shutdown().fire();
        let (mut client, session) = spawn_session(&context);

        client.write_all(b"123456789\n").await.unwrap();

        assert!(matches!(finish(session).await, SessionExit::Shutdown));
        assert_eq!(read_all(&mut client).await, "");
        assert!(context.dedup().is_empty());
    }
}
