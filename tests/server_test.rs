use std::{
    fs,
    io::Write,
    net::{Ipv4Addr, SocketAddr, TcpStream},
    path::Path,
    time::Duration,
};

use hyper::{body, header, Body, Client, Method, Request, Response, StatusCode};
use lanserve::{config::ServerConfig, LanServer, ServerError, NO_CACHE};
use tempfile::TempDir;
use tokio::{sync::oneshot, task::JoinHandle};

struct TestServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    fn start(config: ServerConfig) -> Self {
        let server = LanServer::bind(&config).unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(async move {
            let _ = rx.await;
        }));
        Self { addr, shutdown, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.addr.port(), path)
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

fn loopback_config(root: &Path) -> ServerConfig {
    ServerConfig {
        port: 0,
        bind: Ipv4Addr::LOCALHOST.into(),
        root: root.to_path_buf(),
    }
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.js"), b"export const version = 3;\n").unwrap();
    fs::write(dir.path().join("digits.txt"), b"0123456789").unwrap();
    fs::create_dir(dir.path().join("assets")).unwrap();
    fs::write(dir.path().join("assets").join("style.css"), b"body { margin: 0 }").unwrap();
    fs::create_dir(dir.path().join("site")).unwrap();
    fs::write(dir.path().join("site").join("index.html"), b"<h1>tester</h1>").unwrap();
    dir
}

async fn send(
    method: Method,
    url: &str,
    headers: &[(header::HeaderName, &str)],
) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(url);
    for (name, value) in headers {
        req = req.header(name, *value);
    }
    Client::new().request(req.body(Body::empty()).unwrap()).await.unwrap()
}

async fn get(url: &str) -> Response<Body> {
    send(Method::GET, url, &[]).await
}

fn assert_no_cache_once<B>(resp: &Response<B>) {
    let values: Vec<_> = resp.headers().get_all(header::CACHE_CONTROL).iter().collect();
    assert_eq!(values, vec![NO_CACHE], "status {}", resp.status());
}

#[tokio::test]
async fn test_existing_file_is_served_verbatim() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    let resp = get(&server.url("/app.js")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_no_cache_once(&resp);
    assert!(resp.headers().contains_key(header::LAST_MODIFIED));
    let bytes = body::to_bytes(resp.into_body()).await.unwrap();
    assert_eq!(&bytes[..], &fs::read(dir.path().join("app.js")).unwrap()[..]);

    server.stop().await;
}

#[tokio::test]
async fn test_missing_file_is_404_with_header() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    let resp = get(&server.url("/does/not/exist.js")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_no_cache_once(&resp);

    server.stop().await;
}

#[tokio::test]
async fn test_every_response_carries_header_once() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    const PARTIAL: StatusCode = StatusCode::PARTIAL_CONTENT;
    const UNSATISFIABLE: StatusCode = StatusCode::RANGE_NOT_SATISFIABLE;
    let cases: Vec<(Method, &str, Vec<(header::HeaderName, &str)>, StatusCode)> = vec![
        (Method::GET, "/", vec![], StatusCode::OK),
        (Method::GET, "/site/", vec![], StatusCode::OK),
        (Method::GET, "/site", vec![], StatusCode::MOVED_PERMANENTLY),
        (Method::HEAD, "/app.js", vec![], StatusCode::OK),
        (Method::POST, "/app.js", vec![], StatusCode::NOT_IMPLEMENTED),
        (Method::GET, "/digits.txt", vec![(header::RANGE, "bytes=1-2")], PARTIAL),
        (Method::GET, "/digits.txt", vec![(header::RANGE, "bytes=99-")], UNSATISFIABLE),
        (Method::GET, "/digits.txt", vec![(header::RANGE, "lines=1-2")], StatusCode::OK),
        (Method::GET, "/missing", vec![], StatusCode::NOT_FOUND),
    ];
    for (method, path, headers, status) in cases {
        let resp = send(method.clone(), &server.url(path), &headers).await;
        assert_eq!(resp.status(), status, "{} {}", method, path);
        assert_no_cache_once(&resp);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_directory_handling() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    let resp = get(&server.url("/assets")).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.headers()[header::LOCATION], "/assets/");

    let resp = get(&server.url("/assets/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body::to_bytes(resp.into_body()).await.unwrap();
    let page = String::from_utf8(page.to_vec()).unwrap();
    assert!(page.contains("Directory listing for /assets/"));
    assert!(page.contains("<a href=\"style.css\">style.css</a>"));

    let resp = get(&server.url("/site/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body::to_bytes(resp.into_body()).await.unwrap()[..], b"<h1>tester</h1>");

    server.stop().await;
}

#[tokio::test]
async fn test_head_and_conditional_get() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    let resp = send(Method::HEAD, &server.url("/digits.txt"), &[]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "10");
    let last_modified = resp.headers()[header::LAST_MODIFIED].to_str().unwrap().to_string();
    assert!(body::to_bytes(resp.into_body()).await.unwrap().is_empty());

    let resp = send(
        Method::GET,
        &server.url("/digits.txt"),
        &[(header::IF_MODIFIED_SINCE, last_modified.as_str())],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert_no_cache_once(&resp);

    server.stop().await;
}

#[tokio::test]
async fn test_range_request() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    let url = server.url("/digits.txt");
    let resp = send(Method::GET, &url, &[(header::RANGE, "bytes=-3")]).await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes 7-9/10");
    assert_eq!(&body::to_bytes(resp.into_body()).await.unwrap()[..], b"789");

    server.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_is_403() {
    use std::os::unix::fs::PermissionsExt;

    let dir = fixture();
    let locked = dir.path().join("locked.txt");
    fs::write(&locked, b"nobody reads this").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        // permission bits do not bind this user, e.g. root
        return;
    }
    let server = TestServer::start(loopback_config(dir.path()));

    let resp = get(&server.url("/locked.txt")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_no_cache_once(&resp);

    server.stop().await;
}

#[tokio::test]
async fn test_traversal_stays_in_root() {
    let outer = tempfile::tempdir().unwrap();
    fs::write(outer.path().join("secret.txt"), b"top secret").unwrap();
    let root = outer.path().join("public");
    fs::create_dir(&root).unwrap();
    let server = TestServer::start(loopback_config(&root));

    for path in ["/../secret.txt", "/%2e%2e/secret.txt", "/..%2fsecret.txt"] {
        let resp = get(&server.url(path)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", path);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_all_interfaces_reachable_over_loopback() {
    let dir = fixture();
    let config = ServerConfig {
        port: 0,
        root: dir.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let server = TestServer::start(config);
    assert!(server.addr.ip().is_unspecified());

    let resp = get(&server.url("/app.js")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_second_instance_fails_to_bind() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));

    let config = ServerConfig {
        port: server.addr.port(),
        ..loopback_config(dir.path())
    };
    match LanServer::bind(&config) {
        Err(ServerError::Bind { addr, source }) => {
            assert_eq!(addr, server.addr);
            assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
        }
        other => panic!("expected a bind failure, got {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_port_released_after_shutdown() {
    let dir = fixture();
    let server = TestServer::start(loopback_config(dir.path()));
    let port = server.addr.port();
    assert_eq!(get(&server.url("/app.js")).await.status(), StatusCode::OK);
    server.stop().await;

    let config = ServerConfig {
        port,
        ..loopback_config(dir.path())
    };
    let server = TestServer::start(config);
    assert_eq!(server.addr.port(), port);
    assert_eq!(get(&server.url("/app.js")).await.status(), StatusCode::OK);
    server.stop().await;
}

#[tokio::test]
async fn test_banner_uses_bound_port() {
    let dir = fixture();
    let server = LanServer::bind(&loopback_config(dir.path())).unwrap();
    let port = server.local_addr().unwrap().port();
    let banner = server.banner("10.0.0.7").unwrap().to_string();
    assert!(banner.contains(&format!("http://localhost:{}", port)));
    assert!(banner.contains(&format!("http://10.0.0.7:{}", port)));
    assert!(banner.contains(&format!("http://127.0.0.1:{}", port)));
}

#[tokio::test]
async fn test_shutdown_abandons_stalled_client() {
    let dir = fixture();
    fs::write(dir.path().join("large.bin"), vec![b'x'; 32 << 20]).unwrap();
    let server = TestServer::start(loopback_config(dir.path()));

    // ask for a large file and never read it, so the response write blocks
    let mut client = TcpStream::connect(("127.0.0.1", server.addr.port())).unwrap();
    client
        .write_all(b"GET /large.bin HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();
    // and one that never finishes its request head
    let mut partial = TcpStream::connect(("127.0.0.1", server.addr.port())).unwrap();
    partial.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let _ = server.shutdown.send(());
    let finished = tokio::time::timeout(Duration::from_secs(5), server.handle).await;
    finished
        .expect("shutdown waited on the stalled client")
        .unwrap()
        .unwrap();
    drop((client, partial));
}
