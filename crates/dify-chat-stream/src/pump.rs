use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cancel::AbortSignal;
use crate::decoder::{Decoded, decode};
use crate::errors::StreamFailure;
use crate::event::StreamResult;
use crate::reader::LineReader;

/// How a pump run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpExit {
    /// The server sent its end-of-stream frame.
    Drained,
    /// A failure was delivered as the last item.
    Failed,
    /// The abort signal fired; nothing further was sent.
    Cancelled,
    /// The consumer dropped the receiver.
    ConsumerGone,
}

enum Delivery {
    Sent,
    Cancelled,
    Closed,
}

/// Background loop that reads lines, decodes them and publishes results.
///
/// The pump is the only reader of the connection and the only writer to the
/// delivery channel. On every exit path the connection is dropped first and
/// the channel second, so a consumer that observes closure knows the
/// connection is already gone.
pub struct StreamPump {
    stream_id: uuid::Uuid,
    reader: LineReader,
    tx: mpsc::Sender<StreamResult>,
    signal: AbortSignal,
}

impl StreamPump {
    pub fn new(
        stream_id: uuid::Uuid,
        reader: LineReader,
        tx: mpsc::Sender<StreamResult>,
        signal: AbortSignal,
    ) -> Self {
        Self {
            stream_id,
            reader,
            tx,
            signal,
        }
    }

    /// Drives the stream to a terminal state, then releases the connection
    /// and closes the channel.
    pub async fn run(mut self) -> PumpExit {
        let exit = self.pump_lines().await;
        let Self {
            stream_id,
            reader,
            tx,
            ..
        } = self;
        drop(reader);
        drop(tx);
        debug!(stream_id = %stream_id, ?exit, "stream pump finished");
        exit
    }

    async fn pump_lines(&mut self) -> PumpExit {
        let mut seq = 0_u64;
        loop {
            if self.signal.is_aborted() {
                return PumpExit::Cancelled;
            }

            let read = tokio::select! {
                biased;
                _ = self.signal.aborted() => return PumpExit::Cancelled,
                read = self.reader.next_line() => read,
            };
            let line = match read {
                Ok(Some(line)) => line,
                Ok(None) => {
                    let failure = StreamFailure::Io {
                        message: "connection closed before end-of-stream frame".into(),
                    };
                    return self.fail(failure).await;
                }
                Err(err) => return self.fail(StreamFailure::io(&err)).await,
            };

            match decode(&line) {
                Ok(Decoded::Skip) => {}
                Ok(Decoded::EndOfStream) => {
                    debug!(stream_id = %self.stream_id, frames = seq, "end-of-stream frame received");
                    return PumpExit::Drained;
                }
                Ok(Decoded::Event(event)) => {
                    debug!(stream_id = %self.stream_id, seq, event = %event.event, "forwarding frame");
                    seq = seq.saturating_add(1);
                    match self.deliver(Ok(event)).await {
                        Delivery::Sent => {}
                        Delivery::Cancelled => return PumpExit::Cancelled,
                        Delivery::Closed => return PumpExit::ConsumerGone,
                    }
                }
                Err(failure) => return self.fail(failure).await,
            }
        }
    }

    async fn fail(&mut self, failure: StreamFailure) -> PumpExit {
        warn!(stream_id = %self.stream_id, error = %failure, "stream failed");
        match self.deliver(Err(failure)).await {
            Delivery::Sent => PumpExit::Failed,
            Delivery::Cancelled => PumpExit::Cancelled,
            Delivery::Closed => PumpExit::ConsumerGone,
        }
    }

    async fn deliver(&mut self, item: StreamResult) -> Delivery {
        tokio::select! {
            biased;
            _ = self.signal.aborted() => Delivery::Cancelled,
            sent = self.tx.send(item) => match sent {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Closed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::AbortHandle;
    use crate::transport::ByteStream;
    use bytes::Bytes;
    use futures::{StreamExt as _, stream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct CloseFlag(Arc<AtomicBool>);

    impl Drop for CloseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn body(chunks: Vec<std::io::Result<&'static str>>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes())))
                .collect::<Vec<_>>(),
        ))
    }

    fn spawn_pump(
        body: ByteStream,
        capacity: usize,
        signal: AbortSignal,
    ) -> (
        mpsc::Receiver<StreamResult>,
        tokio::task::JoinHandle<PumpExit>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let pump = StreamPump::new(uuid::Uuid::new_v4(), LineReader::new(body), tx, signal);
        (rx, tokio::spawn(pump.run()))
    }

    async fn drain(rx: &mut mpsc::Receiver<StreamResult>) -> Vec<StreamResult> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn normal_stream_forwards_then_closes_cleanly() {
        let (mut rx, task) = spawn_pump(
            body(vec![
                Ok("data: {\"event\":\"message\",\"answer\":\"Hi\"}\n"),
                Ok("data: {\"event\":\"message\",\"answer\":\"\"}\n"),
            ]),
            1,
            AbortSignal::never(),
        );
        let items = drain(&mut rx).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().expect("event").answer, "Hi");
        assert_eq!(task.await.expect("join"), PumpExit::Drained);
    }

    #[tokio::test]
    async fn keep_alive_lines_emit_nothing() {
        let (mut rx, task) = spawn_pump(
            body(vec![
                Ok(": ping\n\nevent: ping\n"),
                Ok("data: {\"answer\":\"\"}\n"),
            ]),
            1,
            AbortSignal::never(),
        );
        assert!(drain(&mut rx).await.is_empty());
        assert_eq!(task.await.expect("join"), PumpExit::Drained);
    }

    #[tokio::test]
    async fn frames_arrive_in_wire_order() {
        let (mut rx, _task) = spawn_pump(
            body(vec![
                Ok("data: {\"answer\":\"A\"}\n\ndata: {\"answer\":\"B\"}\n"),
                Ok("\ndata: {\"answer\":\"C\"}\n"),
                Ok("data: {\"answer\":\"\"}\n"),
            ]),
            1,
            AbortSignal::never(),
        );
        let answers: Vec<String> = drain(&mut rx)
            .await
            .into_iter()
            .map(|r| r.expect("event").answer)
            .collect();
        assert_eq!(answers, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn malformed_frame_is_single_terminal_failure() {
        let (mut rx, task) = spawn_pump(
            body(vec![
                Ok("data: {not json}\n"),
                Ok("data: {\"answer\":\"never\"}\n"),
            ]),
            4,
            AbortSignal::never(),
        );
        let items = drain(&mut rx).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(StreamFailure::Decode { .. })));
        assert_eq!(task.await.expect("join"), PumpExit::Failed);
    }

    #[tokio::test]
    async fn error_frame_stops_the_stream() {
        let (mut rx, task) = spawn_pump(
            body(vec![
                Ok("data: {\"event\":\"message\",\"answer\":\"a\"}\n"),
                Ok("data: {\"event\":\"error\",\"answer\":\"x\"}\n"),
                Ok("data: {\"event\":\"message\",\"answer\":\"b\"}\n"),
            ]),
            4,
            AbortSignal::never(),
        );
        let items = drain(&mut rx).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(StreamFailure::ErrorEvent { raw }) => {
                assert!(raw.contains(r#"{"event":"error","answer":"x"}"#))
            }
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(task.await.expect("join"), PumpExit::Failed);
    }

    #[tokio::test]
    async fn connection_drop_after_one_frame_reports_io_failure() {
        let (mut rx, task) = spawn_pump(
            body(vec![
                Ok("data: {\"answer\":\"partial\"}\n"),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )),
            ]),
            1,
            AbortSignal::never(),
        );
        let items = drain(&mut rx).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().expect("event").answer, "partial");
        assert!(
            matches!(&items[1], Err(StreamFailure::Io { message }) if message.contains("reset"))
        );
        assert_eq!(task.await.expect("join"), PumpExit::Failed);
    }

    #[tokio::test]
    async fn end_of_input_without_terminal_frame_is_io_failure() {
        let (mut rx, _task) = spawn_pump(
            body(vec![Ok("data: {\"answer\":\"a\"}\n")]),
            1,
            AbortSignal::never(),
        );
        let items = drain(&mut rx).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(StreamFailure::Io { .. })));
    }

    #[tokio::test]
    async fn cancelled_before_start_closes_with_nothing() {
        let (handle, signal) = AbortHandle::new();
        handle.abort();
        let (mut rx, task) = spawn_pump(
            body(vec![Ok("data: {\"answer\":\"a\"}\n")]),
            1,
            signal,
        );
        assert!(drain(&mut rx).await.is_empty());
        assert_eq!(task.await.expect("join"), PumpExit::Cancelled);
    }

    #[tokio::test]
    async fn cancel_interrupts_a_pending_read() {
        let (handle, signal) = AbortHandle::new();
        let (mut rx, task) = spawn_pump(
            Box::pin(stream::pending::<std::io::Result<Bytes>>()),
            1,
            signal,
        );
        handle.abort();
        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("pump should stop")
            .expect("join");
        assert_eq!(exit, PumpExit::Cancelled);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_interrupts_a_blocked_send() {
        let (handle, signal) = AbortHandle::new();
        let (mut rx, task) = spawn_pump(
            body(vec![
                Ok("data: {\"answer\":\"1\"}\n"),
                Ok("data: {\"answer\":\"2\"}\n"),
                Ok("data: {\"answer\":\"3\"}\n"),
            ]),
            1,
            signal,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("pump should stop")
            .expect("join");
        assert_eq!(exit, PumpExit::Cancelled);

        let items = drain(&mut rx).await;
        assert_eq!(items.len(), 1, "only the buffered item remains");
        assert!(items[0].is_ok());
    }

    #[tokio::test]
    async fn dropped_receiver_stops_the_pump() {
        let (rx, task) = spawn_pump(
            body(vec![
                Ok("data: {\"answer\":\"1\"}\n"),
                Ok("data: {\"answer\":\"2\"}\n"),
            ]),
            1,
            AbortSignal::never(),
        );
        drop(rx);
        assert_eq!(task.await.expect("join"), PumpExit::ConsumerGone);
    }

    #[tokio::test]
    async fn connection_is_closed_before_channel_closes() {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = CloseFlag(closed.clone());
        let chunks = body(vec![
            Ok("data: {\"answer\":\"a\"}\n"),
            Ok("data: {\"answer\":\"\"}\n"),
        ]);
        let tracked: ByteStream = Box::pin(chunks.map(move |chunk| {
            let _flag = &flag;
            chunk
        }));

        let (mut rx, _task) = spawn_pump(tracked, 1, AbortSignal::never());
        assert!(rx.recv().await.expect("first").is_ok());
        assert!(rx.recv().await.is_none());
        assert!(closed.load(Ordering::SeqCst));
        assert!(rx.recv().await.is_none(), "closed channel stays closed");
    }
}
