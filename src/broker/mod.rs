//! Connection to a single Kafka broker.
//!
//! A [`Broker`] owns at most one TCP stream. Every request goes through
//! [`Broker::send_and_receive`], which holds the connection lock for one full
//! round trip: correlation id assignment, write, and (unless the request is
//! fire-and-forget) the read of the matching response. Responses therefore
//! always belong to the write that preceded them; there is no pipelining.

mod config;

pub use config::{BrokerConfig, DEFAULT_TIMEOUT};

use crate::error::{BrokerError, Result};
use crate::observability::observability;
use crate::protocol::{
    decode_from_bytes, encode_request_frame, read_frame, take_correlation_id, write_frame,
    FetchRequest, FetchResponse, MetadataRequest, MetadataResponse, OffsetCommitRequest,
    OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse, OffsetRequest,
    OffsetResponse, ProduceRequest, ProduceResponse, ProtocolBody, LENGTH_PREFIX_BYTES,
};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, debug_span, info, warn, Instrument};

/// Identity of a broker whose node id has not been learned from metadata.
pub const UNASSIGNED_ID: i32 = -1;

struct Connection {
    stream: TcpStream,
    /// Set after any failure that may have left the stream out of sync.
    poisoned: bool,
    /// Value of `Broker::closes` when this connection was opened. A larger
    /// current value means a close aimed at this connection is pending.
    epoch: u64,
}

#[derive(Default)]
struct ConnState {
    conn: Option<Connection>,
    /// Next correlation id; survives close/reopen so ids are never reused.
    correlation_id: i32,
}

/// Client side of one broker connection.
pub struct Broker {
    id: AtomicI32,
    addr: String,
    config: BrokerConfig,
    connected: AtomicBool,
    max_open_requests: AtomicUsize,
    state: Mutex<ConnState>,
    /// Bumped by every `close` before it signals `closing`.
    closes: AtomicU64,
    closing: Notify,
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("id", &self.id())
            .field("addr", &self.addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Broker {
    /// Create a detached broker for `addr` (host:port) with default settings.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_config(addr, BrokerConfig::default())
    }

    pub fn with_config(addr: impl Into<String>, config: BrokerConfig) -> Self {
        Self {
            id: AtomicI32::new(UNASSIGNED_ID),
            addr: addr.into(),
            config,
            connected: AtomicBool::new(false),
            max_open_requests: AtomicUsize::new(0),
            state: Mutex::new(ConnState::default()),
            closes: AtomicU64::new(0),
            closing: Notify::new(),
        }
    }

    /// Node id, or -1 until the metadata layer assigns one.
    pub fn id(&self) -> i32 {
        self.id.load(Ordering::SeqCst)
    }

    /// Record the node id learned from cluster metadata.
    pub fn set_id(&self, id: i32) {
        self.id.store(id, Ordering::SeqCst);
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The concurrency hint given to the last successful `open`.
    pub fn max_open_requests(&self) -> usize {
        self.max_open_requests.load(Ordering::SeqCst)
    }

    /// Connect to the broker.
    ///
    /// Opening an already open broker succeeds without dialing again; the
    /// existing connection, poisoned or not, is kept.
    pub async fn open(&self, max_open_requests: usize) -> Result<()> {
        if max_open_requests == 0 {
            return Err(BrokerError::Config(
                "max_open_requests must be at least 1".into(),
            ));
        }
        self.config.validate()?;

        let epoch = self.closes.load(Ordering::SeqCst);
        let mut state = self.state.lock().await;
        if state.conn.is_some() {
            debug!(addr = %self.addr, "broker already open");
            return Ok(());
        }

        let addr = self.addr.as_str();
        let stream = with_deadline(self.config.dial_timeout, "dial", async {
            TcpStream::connect(addr)
                .await
                .map_err(|e| BrokerError::Connection(format!("dial {} failed: {}", addr, e)))
        })
        .await?;
        stream
            .set_nodelay(self.config.tcp_nodelay)
            .map_err(|e| BrokerError::Connection(format!("configure {} failed: {}", addr, e)))?;

        state.conn = Some(Connection {
            stream,
            poisoned: false,
            epoch,
        });
        self.max_open_requests
            .store(max_open_requests, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        observability().record_open();
        info!(addr, max_open_requests, "connected to broker");
        Ok(())
    }

    /// Tear down the connection. Fails with `NotConnected` if the broker is
    /// not open, including on a second close.
    ///
    /// A request blocked on the connection is woken and fails.
    pub async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closing.notify_waiters();
        let mut state = self.state.lock().await;
        let mut conn = state.conn.take().ok_or(BrokerError::NotConnected)?;
        self.connected.store(false, Ordering::SeqCst);
        if let Err(e) = conn.stream.shutdown().await {
            debug!(addr = %self.addr, error = %e, "shutdown failed");
        }
        observability().record_close();
        info!(addr = %self.addr, poisoned = conn.poisoned, "broker connection closed");
        Ok(())
    }

    /// Fetch cluster metadata for the requested topics.
    pub async fn get_metadata(
        &self,
        client_id: &str,
        req: &MetadataRequest,
    ) -> Result<MetadataResponse> {
        self.request(client_id, req).await
    }

    /// Produce messages. Returns `None` when the request uses
    /// `RequiredAcks::NoResponse`; the broker sends nothing back in that mode.
    pub async fn produce(
        &self,
        client_id: &str,
        req: &ProduceRequest,
    ) -> Result<Option<ProduceResponse>> {
        self.send_and_receive(client_id, req, req.expects_response())
            .await
    }

    pub async fn fetch(&self, client_id: &str, req: &FetchRequest) -> Result<FetchResponse> {
        self.request(client_id, req).await
    }

    /// Fetch committed consumer group offsets.
    pub async fn fetch_offset(
        &self,
        client_id: &str,
        req: &OffsetFetchRequest,
    ) -> Result<OffsetFetchResponse> {
        self.request(client_id, req).await
    }

    /// Commit consumer group offsets.
    pub async fn commit_offset(
        &self,
        client_id: &str,
        req: &OffsetCommitRequest,
    ) -> Result<OffsetCommitResponse> {
        self.request(client_id, req).await
    }

    /// List the offsets available before a point in time.
    pub async fn get_available_offsets(
        &self,
        client_id: &str,
        req: &OffsetRequest,
    ) -> Result<OffsetResponse> {
        self.request(client_id, req).await
    }

    async fn request<R: ProtocolBody>(&self, client_id: &str, req: &R) -> Result<R::Response> {
        // send_and_receive only yields None when no response is expected
        self.send_and_receive(client_id, req, true)
            .await?
            .ok_or_else(|| BrokerError::Decode(format!("no response to {} request", R::API_KEY)))
    }

    /// One complete round trip. With `expects_response == false` the frame is
    /// written and `Ok(None)` returned without touching the read side.
    ///
    /// Any failure after encoding poisons the connection; it then rejects
    /// requests until closed and reopened.
    pub async fn send_and_receive<R: ProtocolBody>(
        &self,
        client_id: &str,
        req: &R,
        expects_response: bool,
    ) -> Result<Option<R::Response>> {
        let mut state = self.state.lock().await;
        let ConnState {
            conn,
            correlation_id: next_id,
        } = &mut *state;
        let conn = conn.as_mut().ok_or(BrokerError::NotConnected)?;
        if conn.poisoned {
            return Err(BrokerError::Connection(format!(
                "connection to {} failed earlier; close and reopen it",
                self.addr
            )));
        }

        let correlation_id = *next_id;
        *next_id = correlation_id.wrapping_add(1);

        let frame = encode_request_frame(client_id, correlation_id, req)?;

        // Enable first, then check the counter: a close that bumped it before
        // the check is seen here, any later one wakes `closing`.
        let closing = self.closing.notified();
        tokio::pin!(closing);
        closing.as_mut().enable();
        if self.closes.load(Ordering::SeqCst) > conn.epoch {
            debug!(addr = %self.addr, correlation_id, "close pending; request not sent");
            return Err(BrokerError::Connection(
                "connection closed before request was sent".into(),
            ));
        }

        let started = Instant::now();
        let span = debug_span!(
            "brokerlink.request",
            addr = %self.addr,
            api_key = %R::API_KEY,
            correlation_id
        );
        let result = tokio::select! {
            biased;
            _ = &mut closing => Err(BrokerError::Connection(
                "connection closed while request was in flight".into(),
            )),
            res = self
                .exchange::<R>(&mut conn.stream, correlation_id, &frame, expects_response)
                .instrument(span) => res,
        };

        observability().record_request(started.elapsed(), result.is_ok(), expects_response);
        if let Err(e) = &result {
            if e.requires_reconnect() {
                conn.poisoned = true;
                warn!(addr = %self.addr, correlation_id, error = %e, "broker connection poisoned");
            }
        }
        result
    }

    async fn exchange<R: ProtocolBody>(
        &self,
        stream: &mut TcpStream,
        correlation_id: i32,
        frame: &[u8],
        expects_response: bool,
    ) -> Result<Option<R::Response>> {
        with_deadline(self.config.write_timeout, "write", write_frame(stream, frame)).await?;
        observability().record_sent(frame.len());
        debug!(len = frame.len(), expects_response, "request written");
        if !expects_response {
            return Ok(None);
        }

        let response = with_deadline(
            self.config.read_timeout,
            "read",
            read_frame(stream, self.config.max_response_size),
        )
        .await?;
        observability().record_received(LENGTH_PREFIX_BYTES + response.len());
        debug!(len = response.len(), "response read");

        let body = take_correlation_id(response, correlation_id)?;
        decode_from_bytes::<R::Response>(&body).map(Some)
    }
}

async fn with_deadline<T, F>(limit: Option<Duration>, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            BrokerError::Connection(format!("{} timed out after {:?}", what, limit))
        })?,
        None => fut.await,
    }
}
