// Shared primitives for one-time server bootstrapping across integration tests.
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
// Without DATABASE_URL the server falls back to in-memory storage, so the
// test world is hermetic to this process.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        // Local one-time slot where the server thread publishes its selected URL.
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                world_server::run(listener).await.expect("server failed");
            });
        });
        // Block until URL is published and the bound port starts accepting connections.
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Base address without the scheme, for websocket URLs.
#[allow(dead_code)]
pub fn server_host() -> &'static str {
    ensure_server()
        .strip_prefix("http://")
        .expect("base url should use http://")
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
