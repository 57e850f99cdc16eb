use crate::core::kernel::codec::WsCodec;
use crate::core::kernel::retry::{RetryBudget, RetryPolicy};
use crate::core::kernel::ws::WsSession;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Why a pump loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// Too many consecutive transport failures
    Exhausted,
    /// The caller's cancellation token fired
    Cancelled,
    /// The consumer dropped its receiver
    ConsumerClosed,
    /// The keepalive period was zero; no ping was sent
    InvalidPeriod,
}

/// Inbound pump: receive frames, decode them and forward them to `tx`.
///
/// Transport errors count against `policy`; frames the codec rejects or
/// ignores are dropped without touching the budget. Forwarding awaits
/// channel capacity, so a slow consumer stalls the pump. `tx` is dropped on
/// return, closing the channel.
pub async fn run_inbound<S, C>(
    session: &S,
    codec: &C,
    tx: mpsc::Sender<C::Message>,
    policy: RetryPolicy,
    exchange: &str,
) -> PumpExit
where
    S: WsSession + ?Sized,
    C: WsCodec,
{
    let mut budget = RetryBudget::new(policy);

    loop {
        let frame = match session.next_raw().await {
            Ok(frame) => frame,
            Err(e) => {
                let delay = budget.record_failure();
                error!(
                    exchange,
                    failures = budget.failures(),
                    "Failed to read message: {}",
                    e
                );
                match delay {
                    Some(delay) => {
                        sleep(delay).await;
                        continue;
                    }
                    None => {
                        error!(exchange, "Reading messages failed, leaving");
                        return PumpExit::Exhausted;
                    }
                }
            }
        };

        budget.record_success();

        match codec.decode_message(frame) {
            Ok(Some(message)) => {
                if tx.send(message).await.is_err() {
                    info!(exchange, "Quote receiver dropped, stopping inbound pump");
                    return PumpExit::ConsumerClosed;
                }
            }
            Ok(None) => {}
            Err(e) => debug!(exchange, "Dropping undecodable frame: {}", e),
        }
    }
}

/// Outbound keepalive pump: send a timestamped ping every `period`.
///
/// The first ping goes out one full period after start. Cancellation is
/// raced against the ticker and wins ties, so a cancelled pump never sends
/// another ping. A zero `period` returns [`PumpExit::InvalidPeriod`] at once.
pub async fn run_keepalive<S>(
    session: &S,
    period: Duration,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    exchange: &str,
) -> PumpExit
where
    S: WsSession + ?Sized,
{
    if period.is_zero() {
        error!(exchange, "Keepalive period must be greater than zero");
        return PumpExit::InvalidPeriod;
    }

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut budget = RetryBudget::new(policy);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(exchange, "Keepalive pump cancelled");
                return PumpExit::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        let payload = Utc::now().timestamp_millis().to_string().into_bytes();
        match session.send_ping(payload).await {
            Ok(()) => budget.record_success(),
            Err(e) => {
                let exhausted = budget.record_failure().is_none();
                error!(
                    exchange,
                    failures = budget.failures(),
                    "Error sending ping message: {}",
                    e
                );
                if exhausted {
                    error!(exchange, "Sending ping message failed, leaving");
                    return PumpExit::Exhausted;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ExchangeError;
    use crate::core::types::Quote;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;

    const QUOTE_FRAME: &str =
        r#"{"ask":{"amount":1.5,"price":42000.0},"bid":{"amount":2.0,"price":41950.0}}"#;

    /// Replays scripted reads, then blocks forever
    #[derive(Default)]
    struct ScriptedSession {
        reads: Mutex<VecDeque<Result<Message, ExchangeError>>>,
        read_calls: AtomicUsize,
        pings: AtomicUsize,
        fail_sends: AtomicBool,
    }

    impl ScriptedSession {
        fn with_reads(reads: Vec<Result<Message, ExchangeError>>) -> Self {
            Self {
                reads: Mutex::new(reads.into()),
                ..Self::default()
            }
        }

        fn failing_sends() -> Self {
            let session = Self::default();
            session.fail_sends.store(true, Ordering::SeqCst);
            session
        }
    }

    #[async_trait]
    impl WsSession for ScriptedSession {
        async fn send_raw(&self, msg: Message) -> Result<(), ExchangeError> {
            if matches!(msg, Message::Ping(_)) {
                self.pings.fetch_add(1, Ordering::SeqCst);
            }
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(ExchangeError::WriteError("broken pipe".to_string()));
            }
            Ok(())
        }

        async fn next_raw(&self) -> Result<Message, ExchangeError> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.reads.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }

        async fn close(&self) -> Result<(), ExchangeError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    struct QuoteCodec;

    impl WsCodec for QuoteCodec {
        type Message = Quote;

        fn encode_subscription(
            &self,
            _streams: &[impl AsRef<str> + Send + Sync],
        ) -> Result<Message, ExchangeError> {
            Ok(Message::Text(String::new()))
        }

        fn decode_message(&self, message: Message) -> Result<Option<Quote>, ExchangeError> {
            match message {
                Message::Text(text) => Ok(Some(serde_json::from_str(&text)?)),
                _ => Ok(None),
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::ZERO, Duration::ZERO)
    }

    fn read_error() -> Result<Message, ExchangeError> {
        Err(ExchangeError::ReadError("connection reset".to_string()))
    }

    #[tokio::test]
    async fn test_malformed_frame_dropped() {
        let session = ScriptedSession::with_reads(vec![
            Ok(Message::Text("{\"ask\":".to_string())),
            Ok(Message::Text(QUOTE_FRAME.to_string())),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        let pump = run_inbound(&session, &QuoteCodec, tx, fast_policy(), "test");
        tokio::pin!(pump);

        let quote = tokio::select! {
            _ = &mut pump => panic!("pump exited early"),
            quote = rx.recv() => quote.expect("one quote"),
        };
        assert_eq!(quote.ask.price, 42000.0);

        let second = tokio::select! {
            _ = &mut pump => panic!("pump exited early"),
            quote = timeout(Duration::from_millis(100), rx.recv()) => quote,
        };
        assert!(second.is_err(), "malformed frame must not be forwarded");
    }

    #[tokio::test]
    async fn test_sixth_read_failure_closes_channel() {
        let mut reads: Vec<_> = (0..6).map(|_| read_error()).collect();
        reads.push(Ok(Message::Text(QUOTE_FRAME.to_string())));
        let session = ScriptedSession::with_reads(reads);
        let (tx, mut rx) = mpsc::channel(8);

        let exit = run_inbound(&session, &QuoteCodec, tx, fast_policy(), "test").await;

        assert_eq!(exit, PumpExit::Exhausted);
        assert_eq!(session.read_calls.load(Ordering::SeqCst), 6);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_success_resets_read_budget() {
        let mut reads = Vec::new();
        for _ in 0..2 {
            reads.extend((0..5).map(|_| read_error()));
            reads.push(Ok(Message::Text(QUOTE_FRAME.to_string())));
        }
        reads.extend((0..6).map(|_| read_error()));
        let session = ScriptedSession::with_reads(reads);
        let (tx, mut rx) = mpsc::channel(8);

        let exit = run_inbound(&session, &QuoteCodec, tx, fast_policy(), "test").await;

        assert_eq!(exit, PumpExit::Exhausted);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_control_frames_do_not_count() {
        let mut reads: Vec<_> = (0..5).map(|_| read_error()).collect();
        reads.push(Ok(Message::Pong(b"1700000000000".to_vec())));
        reads.extend((0..5).map(|_| read_error()));
        reads.push(Ok(Message::Text(QUOTE_FRAME.to_string())));
        let session = ScriptedSession::with_reads(reads);
        let (tx, mut rx) = mpsc::channel(8);

        let handle = tokio::spawn(async move {
            run_inbound(&session, &QuoteCodec, tx, fast_policy(), "test").await
        });

        let quote = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(quote.is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn test_receiver_dropped_stops_pump() {
        let session = ScriptedSession::with_reads(vec![Ok(Message::Text(QUOTE_FRAME.to_string()))]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let exit = run_inbound(&session, &QuoteCodec, tx, fast_policy(), "test").await;
        assert_eq!(exit, PumpExit::ConsumerClosed);
    }

    #[tokio::test]
    async fn test_keepalive_cancel_before_tick() {
        let session = ScriptedSession::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = timeout(
            Duration::from_secs(5),
            run_keepalive(&session, Duration::from_secs(5), fast_policy(), &cancel, "test"),
        )
        .await
        .expect("cancelled pump returns within one tick");

        assert_eq!(exit, PumpExit::Cancelled);
        assert_eq!(session.pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keepalive_sends_pings_until_cancelled() {
        let session = ScriptedSession::default();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(130)).await;
            canceller.cancel();
        });

        let exit = run_keepalive(&session, Duration::from_millis(50), fast_policy(), &cancel, "test").await;
        let pings = session.pings.load(Ordering::SeqCst);

        assert_eq!(exit, PumpExit::Cancelled);
        assert!((1..=3).contains(&pings), "unexpected ping count {}", pings);

        sleep(Duration::from_millis(120)).await;
        assert_eq!(session.pings.load(Ordering::SeqCst), pings);
    }

    #[tokio::test]
    async fn test_keepalive_sixth_failure_exits() {
        let session = ScriptedSession::failing_sends();
        let cancel = CancellationToken::new();

        let exit = timeout(
            Duration::from_secs(2),
            run_keepalive(&session, Duration::from_millis(5), fast_policy(), &cancel, "test"),
        )
        .await
        .expect("pump gives up");

        assert_eq!(exit, PumpExit::Exhausted);
        assert_eq!(session.pings.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_keepalive_zero_period_returns() {
        let session = ScriptedSession::default();
        let cancel = CancellationToken::new();

        let exit = run_keepalive(&session, Duration::ZERO, fast_policy(), &cancel, "test").await;

        assert_eq!(exit, PumpExit::InvalidPeriod);
        assert_eq!(session.pings.load(Ordering::SeqCst), 0);
    }
}
