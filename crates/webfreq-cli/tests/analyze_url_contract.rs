use std::net::SocketAddr;

async fn fixture_server() -> SocketAddr {
    use axum::{
        http::header, http::HeaderMap, http::StatusCode, response::Html, routing::get, Router,
    };

    let app = Router::new()
        .route(
            "/gbk",
            get(|| async {
                let body = encoding_rs::GBK
                    .encode("<html><body><p>经济，科技，经济。</p></body></html>")
                    .0
                    .into_owned();
                ([(header::CONTENT_TYPE, "text/html; charset=gbk")], body)
            }),
        )
        .route(
            "/headers",
            get(|headers: HeaderMap| async move {
                // Fail closed if a secret header is forwarded.
                if headers.contains_key(header::COOKIE) {
                    return (StatusCode::BAD_REQUEST, Html("cookie forwarded".to_string()));
                }
                let lang = headers
                    .get(header::ACCEPT_LANGUAGE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                (StatusCode::OK, Html(format!("<p>语言，{lang}，语言。</p>")))
            }),
        )
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "<p>页面不存在</p>") }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn run(args: &[String]) -> (bool, serde_json::Value) {
    let out = std::process::Command::new(assert_cmd::cargo::cargo_bin!("webfreq"))
        .args(args)
        .env_remove("WEBFREQ_ENV_FILE")
        .env_remove("WEBFREQ_ALLOW_UNSAFE_HEADERS")
        .output()
        .expect("run webfreq");
    let s = String::from_utf8_lossy(&out.stdout);
    let v = serde_json::from_str(s.trim()).unwrap_or_else(|e| panic!("bad json ({e}): {s}"));
    (out.status.success(), v)
}

#[test]
fn analyze_url_against_local_fixture() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let addr = rt.block_on(fixture_server());

    // The blocking child process runs while the server keeps serving on the runtime's workers.
    let (ok, v) = run(&["analyze".to_string(), format!("http://{addr}/gbk")]);
    assert!(ok, "{v}");
    assert_eq!(v["encoding"], "GBK");
    assert_eq!(v["top"][0], serde_json::json!({"term": "经济", "count": 2}));
    assert!(v["timings_ms"]["fetch"].is_u64());

    let (ok, v) = run(&[
        "analyze".to_string(),
        format!("http://{addr}/headers"),
        "--header".to_string(),
        "Accept-Language: zh-CN".to_string(),
        "--header".to_string(),
        "Cookie: session=secret".to_string(),
    ]);
    assert!(ok, "{v}");
    assert_eq!(v["top"][0], serde_json::json!({"term": "语言", "count": 2}));
    assert!(v["preview"].as_str().unwrap().contains("zh-CN"));

    let (ok, v) = run(&["analyze".to_string(), format!("http://{addr}/missing")]);
    assert!(!ok);
    assert_eq!(v["error"]["code"], "fetch_failed");
    assert_eq!(v["error"]["retryable"], true);
}
