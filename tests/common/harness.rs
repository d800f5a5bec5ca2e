//! tests/common/harness.rs
use async_trait::async_trait;
use kestrel_failover::{
    Cause, Config, Connection, ConnectionEvent, ConnectionListener, ConnectionState, DispatchBus,
    Error, RemoteUri, Result, Transport, TransportMonitor,
};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Once,
    },
    time::Duration,
};
use tokio::sync::mpsc;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "kestrel_failover=debug".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// How the mock transport answers one connect call.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Succeed,
    Fail(Cause),
    /// Never completes; only the connect timeout or a cancellation ends it.
    Hang,
}

/// A connect call observed by the mock transport, with the monitor the
/// lifecycle handed to it.
#[derive(Debug)]
pub struct Attempt {
    pub remote_uri: RemoteUri,
    pub monitor: TransportMonitor,
}

/// A scripted transport. Each connect call pops the next outcome, succeeding
/// once the script is empty, and publishes the attempt to the test.
#[derive(Debug)]
pub struct MockTransport {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    attempts_tx: mpsc::UnboundedSender<Attempt>,
    closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Attempt>) {
        let (attempts_tx, attempts_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            attempts_tx,
            closes: AtomicUsize::new(0),
        });
        (transport, attempts_rx)
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.outcomes.lock().unwrap().extend(outcomes);
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, remote_uri: &RemoteUri, monitor: TransportMonitor) -> Result<()> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectOutcome::Succeed);
        let _ = self.attempts_tx.send(Attempt {
            remote_uri: remote_uri.clone(),
            monitor,
        });
        match outcome {
            ConnectOutcome::Succeed => Ok(()),
            ConnectOutcome::Fail(cause) => Err(Error::Transport(cause)),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A listener that records every event it is handed, in delivery order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.kind_name()).collect()
    }
}

impl ConnectionListener for RecordingListener {
    fn on_event(&self, event: &ConnectionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A connection wired to a mock transport and a recording listener.
pub struct TestHarness {
    pub connection: Connection,
    pub transport: Arc<MockTransport>,
    pub attempts: mpsc::UnboundedReceiver<Attempt>,
    pub listener: Arc<RecordingListener>,
    pub bus: DispatchBus,
}

impl TestHarness {
    pub fn new(endpoints: &[&str], config: Config) -> Self {
        init_tracing();
        let (transport, attempts) = MockTransport::new();
        let bus = DispatchBus::new();
        let listener = Arc::new(RecordingListener::default());
        let connection = Connection::new(
            endpoints.iter().map(|e| RemoteUri::from(*e)).collect(),
            transport.clone(),
            bus.clone(),
            config,
        )
        .unwrap();
        connection.register_listener(listener.clone());
        Self {
            connection,
            transport,
            attempts,
            listener,
            bus,
        }
    }

    /// Waits for the next connect call the lifecycle makes.
    pub async fn next_attempt(&mut self) -> Attempt {
        tokio::time::timeout(Duration::from_secs(5), self.attempts.recv())
            .await
            .expect("no connect attempt within 5s")
            .expect("transport dropped")
    }

    /// Polls until the connection reaches `state`.
    pub async fn wait_for_state(&self, state: ConnectionState) {
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.connection.state().await.unwrap() == state {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "connection never reached {state}");
    }

    /// Waits until the actor has processed everything queued so far and every
    /// resulting notification has been delivered.
    pub async fn settle(&self) {
        self.connection.flush().await.unwrap();
    }
}
