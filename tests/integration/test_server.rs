use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// A canned response for one route
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        MockResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn status(status: u16) -> Self {
        MockResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Mock GitHub API server for integration tests. Routes are keyed by
/// path + query; anything unregistered answers 404, which matches the
/// API's behavior for absent resources.
pub struct TestServer {
    addr: SocketAddr,
    routes: Arc<RwLock<HashMap<String, MockResponse>>>,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn new() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let routes = Arc::new(RwLock::new(HashMap::new()));
        let hits = Arc::new(AtomicUsize::new(0));
        let routes_clone = routes.clone();
        let hits_clone = hits.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let io = TokioIo::new(stream);
                let routes = routes_clone.clone();
                let hits = hits_clone.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let routes = routes.clone();
                        let hits = hits.clone();
                        async move { handle_request(req, routes, hits).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        eprintln!("Error serving connection: {:?}", err);
                    }
                });
            }
        });

        Ok(TestServer { addr, routes, hits })
    }

    /// Base URL of the server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Registers a canned response for a path (including query string)
    pub async fn add(&self, path: &str, response: MockResponse) {
        let mut routes = self.routes.write().await;
        routes.insert(path.to_string(), response);
    }

    /// Registers a 200 JSON response
    pub async fn add_json(&self, path: &str, body: &str) {
        self.add(path, MockResponse::json(body)).await;
    }

    /// Registers a bare status response
    pub async fn add_status(&self, path: &str, status: u16) {
        self.add(path, MockResponse::status(status)).await;
    }

    /// Number of requests the server has answered
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn handle_request(
    req: Request<Incoming>,
    routes: Arc<RwLock<HashMap<String, MockResponse>>>,
    hits: Arc<AtomicUsize>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    hits.fetch_add(1, Ordering::SeqCst);

    let key = req
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if req.method() != &Method::GET {
        return Ok(Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Full::new(Bytes::from("Method Not Allowed")))
            .unwrap());
    }

    let routes = routes.read().await;
    if let Some(mock) = routes.get(&key) {
        let mut builder = Response::builder().status(mock.status);
        for (name, value) in &mock.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder.body(Full::new(Bytes::from(mock.body.clone()))).unwrap())
    } else {
        Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("{\"message\": \"Not Found\"}")))
            .unwrap())
    }
}
