//! HTTP key ring source tests against an in-process responder.
#![allow(clippy::expect_used, clippy::panic)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cloudfiles_authn::{
    HttpKeyRingSource, KeyRingCache, KeyRingConfig, KeyRingSource, TokenVerifier, VerifierConfig,
    assert_auth_error,
    testutil::{published_key_a, token_for},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// A canned response served to every request.
#[derive(Clone)]
struct Canned {
    status: &'static str,
    body: String,
    delay: Duration,
}

/// Serves `canned` on an ephemeral port; returns the address and a hit counter.
async fn serve(canned: Canned) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { return };
            counter.fetch_add(1, Ordering::SeqCst);
            let canned = canned.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                tokio::time::sleep(canned.delay).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    canned.status,
                    canned.body.len(),
                    canned.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

fn key_set_body() -> String {
    serde_json::json!({ "keys": [published_key_a("http-key")] }).to_string()
}

fn source_for(addr: SocketAddr, fetch_timeout: Duration) -> HttpKeyRingSource {
    let config = KeyRingConfig::builder()
        .jwks_url(format!("http://{addr}/.well-known/jwks.json"))
        .fetch_timeout(fetch_timeout)
        .build()
        .expect("config");
    HttpKeyRingSource::new(config).expect("source")
}

#[tokio::test]
async fn fetches_and_parses_published_keys() {
    let (addr, hits) =
        serve(Canned { status: "200 OK", body: key_set_body(), delay: Duration::ZERO }).await;
    let source = source_for(addr, Duration::from_secs(5));

    let ring = source.fetch().await.expect("fetch");

    assert!(ring.contains("http-key"));
    assert_eq!(ring.source(), format!("http://{addr}/.well-known/jwks.json"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verifier_over_http_source() {
    let (addr, hits) =
        serve(Canned { status: "200 OK", body: key_set_body(), delay: Duration::ZERO }).await;
    let cache = Arc::new(KeyRingCache::new(Arc::new(source_for(addr, Duration::from_secs(5)))));
    let verifier = TokenVerifier::new(cache, VerifierConfig::default());

    for _ in 0..3 {
        let owner = verifier.verify(&token_for("http-key", "user-7")).await.expect("verify");
        assert_eq!(owner, "user-7");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1, "the key ring is cached after the first fetch");
}

#[tokio::test]
async fn error_status_is_unavailable() {
    let (addr, _) = serve(Canned {
        status: "503 Service Unavailable",
        body: "{}".into(),
        delay: Duration::ZERO,
    })
    .await;

    let result = source_for(addr, Duration::from_secs(5)).fetch().await;
    assert_auth_error!(result, KeyRingUnavailable);
}

#[tokio::test]
async fn non_key_set_body_is_unavailable() {
    let (addr, _) = serve(Canned {
        status: "200 OK",
        body: "<html>sign in</html>".into(),
        delay: Duration::ZERO,
    })
    .await;

    let result = source_for(addr, Duration::from_secs(5)).fetch().await;
    assert_auth_error!(result, KeyRingUnavailable);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let (addr, _) =
        serve(Canned { status: "200 OK", body: key_set_body(), delay: Duration::from_secs(2) })
            .await;

    let result = source_for(addr, Duration::from_millis(200)).fetch().await;
    assert!(
        matches!(&result, Err(cloudfiles_authn::AuthError::KeyRingUnavailable { message, .. }) if message.contains("timed out")),
        "got: {result:?}"
    );
}
