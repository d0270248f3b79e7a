//! Mock broker: answers each inbound request with the next queued response,
//! whatever the request asked for. Connections are served one at a time, so a
//! client can close and reconnect.

use crate::error::Result;
use crate::protocol::{
    encode_to_bytes, frame_response, read_frame, write_frame, Decodable, Encodable,
    PacketDecoder, RequestHeader, DEFAULT_MAX_FRAME_LEN,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// What the mock does with the next request it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Reply with `[length][request correlation id][payload]`.
    Payload(Bytes),
    /// Read the request and send nothing back.
    Silence,
    /// Write these bytes verbatim, framing included.
    Raw(Bytes),
    /// Read the request, then drop the connection.
    Hangup,
}

pub struct MockBroker {
    addr: SocketAddr,
    responses: mpsc::UnboundedSender<MockResponse>,
    requests: Arc<Mutex<Vec<RequestHeader>>>,
    received: Arc<Notify>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockBroker {
    /// Bind to an ephemeral localhost port and start serving.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let received = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(serve(
            listener,
            rx,
            Arc::clone(&requests),
            Arc::clone(&received),
            Arc::clone(&connections),
        ));
        Ok(Self {
            addr,
            responses: tx,
            requests,
            received,
            connections,
            task,
        })
    }

    /// host:port to hand to `Broker::new`.
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Queue a response body. An empty body queues [`MockResponse::Silence`].
    pub fn returns(&self, payload: impl Into<Bytes>) {
        let payload = payload.into();
        if payload.is_empty() {
            self.enqueue(MockResponse::Silence);
        } else {
            self.enqueue(MockResponse::Payload(payload));
        }
    }

    /// Queue an encoded response value.
    pub fn returns_encoded<T: Encodable>(&self, body: &T) -> Result<()> {
        self.enqueue(MockResponse::Payload(encode_to_bytes(body)?));
        Ok(())
    }

    pub fn returns_raw(&self, bytes: impl Into<Bytes>) {
        self.enqueue(MockResponse::Raw(bytes.into()));
    }

    pub fn enqueue(&self, response: MockResponse) {
        if self.responses.send(response).is_err() {
            debug!("mock broker stopped; response dropped");
        }
    }

    /// Headers of every request read so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestHeader> {
        self.requests.lock().clone()
    }

    /// Number of client connections accepted so far.
    pub fn connections_accepted(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` requests have been read.
    pub async fn wait_for_requests(&self, n: usize) {
        loop {
            let notified = self.received.notified();
            if self.requests.lock().len() >= n {
                return;
            }
            notified.await;
        }
    }

    /// Stop serving and drop the current connection.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for MockBroker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    mut responses: mpsc::UnboundedReceiver<MockResponse>,
    requests: Arc<Mutex<Vec<RequestHeader>>>,
    received: Arc<Notify>,
    connections: Arc<AtomicUsize>,
) {
    // a response taken off the queue whose request never arrived
    let mut pending: Option<MockResponse> = None;
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                error!("mock broker accept error: {}", e);
                return;
            }
        };
        connections.fetch_add(1, Ordering::SeqCst);
        debug!(%peer, "mock broker accepted connection");
        loop {
            let response = match pending.take() {
                Some(r) => r,
                None => match responses.recv().await {
                    Some(r) => r,
                    None => return,
                },
            };
            let frame = match read_frame(&mut stream, DEFAULT_MAX_FRAME_LEN).await {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(%peer, error = %e, "mock broker connection ended");
                    pending = Some(response);
                    break;
                }
            };
            match answer(&mut stream, &frame, response, &requests, &received).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    debug!(%peer, error = %e, "mock broker write failed");
                    break;
                }
            }
        }
    }
}

/// Record the request in `frame` and apply `response`. Returns false to hang up.
async fn answer(
    stream: &mut TcpStream,
    frame: &[u8],
    response: MockResponse,
    requests: &Mutex<Vec<RequestHeader>>,
    received: &Notify,
) -> Result<bool> {
    let header = RequestHeader::decode(&mut PacketDecoder::new(frame))?;
    debug!(
        api_key = header.api_key,
        correlation_id = header.correlation_id,
        "mock broker request"
    );
    let correlation_id = header.correlation_id;
    requests.lock().push(header);
    received.notify_waiters();

    match response {
        MockResponse::Payload(body) => {
            write_frame(stream, &frame_response(correlation_id, &body)?).await?;
        }
        MockResponse::Silence => {}
        MockResponse::Raw(bytes) => write_frame(stream, &bytes).await?,
        MockResponse::Hangup => return Ok(false),
    }
    Ok(true)
}
