use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use qrcheckin::config::CheckinOptions;
use qrcheckin::{
    CheckinClient, CheckinOutcome, CheckinRun, Error, LogSource, Placeholders, RetryPolicy,
    RunOutcome, UrlTemplate,
};

/// Serve exactly one canned HTTP response and hand back the raw request text.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.expect("read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        let _ = stream.shutdown().await;
    });

    (addr, rx)
}

fn client() -> CheckinClient {
    CheckinClient::new(&CheckinOptions::default()).expect("client")
}

#[tokio::test]
async fn json_response_reports_status() {
    let (addr, request) = serve_once("200 OK", r#"{"status":"OK","points":10}"#).await;

    let outcome = client()
        .send(&format!("http://{addr}/checkin/Meeral/23.40/56.78"))
        .await
        .expect("check-in");

    match outcome {
        CheckinOutcome::Structured { status, body } => {
            assert_eq!(status, "OK");
            assert_eq!(body["points"], 10);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let request = request.await.expect("request captured");
    assert!(
        request.starts_with("GET /checkin/Meeral/23.40/56.78 HTTP/1.1"),
        "unexpected request line: {request}"
    );
    assert!(
        request.to_ascii_lowercase().contains("user-agent: mozilla/5.0"),
        "missing user agent: {request}"
    );
}

#[tokio::test]
async fn json_without_status_is_unknown() {
    let (addr, _request) = serve_once("200 OK", r#"{"message":"recorded"}"#).await;

    let outcome = client().send(&format!("http://{addr}/")).await.expect("check-in");

    assert!(matches!(
        outcome,
        CheckinOutcome::Structured { ref status, .. } if status == "UNKNOWN"
    ));
}

#[tokio::test]
async fn non_json_response_is_excerpted() {
    let (addr, _request) =
        serve_once("200 OK", "<html><body>Thanks for checking in</body></html>").await;

    let outcome = client().send(&format!("http://{addr}/")).await.expect("check-in");

    assert_eq!(
        outcome,
        CheckinOutcome::Unstructured {
            excerpt: "<html><body>Thanks for checking in</body></html>".to_string()
        }
    );
}

#[tokio::test]
async fn error_status_is_a_transport_error() {
    let (addr, _request) = serve_once("503 Service Unavailable", r#"{"status":"DOWN"}"#).await;

    let result = client().send(&format!("http://{addr}/")).await;

    match result {
        Err(Error::Transport(message)) => assert!(message.contains("503"), "{message}"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        listener.local_addr().expect("local addr")
    };

    let result = client().send(&format!("http://{addr}/")).await;
    assert!(matches!(result, Err(Error::Transport(_))));
}

#[tokio::test]
async fn slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let options = CheckinOptions {
        timeout_secs: 1,
        ..Default::default()
    };
    let result = CheckinClient::new(&options)
        .expect("client")
        .send(&format!("http://{addr}/"))
        .await;

    assert!(matches!(result, Err(Error::Transport(_))));
}

struct StaticLog(&'static str);

#[async_trait]
impl LogSource for StaticLog {
    async fn fetch(&self) -> qrcheckin::Result<String> {
        Ok(self.0.to_string())
    }

    fn describe(&self) -> String {
        "static log".to_string()
    }
}

#[tokio::test]
async fn full_run_fills_template_and_reports() {
    let (addr, request) = serve_once("200 OK", r#"{"status":"OK"}"#).await;
    let template = UrlTemplate::new(format!("http://{addr}/c/YOUR_TEAM/FILL_HERE/FILL_THERE"));
    let run = CheckinRun {
        team: "Meeral".to_string(),
        placeholders: Placeholders::default(),
        retry: RetryPolicy::default(),
        client: client(),
    };
    let log = StaticLog("10-16 09:12:01.123 I SENSOR  : temperature=23.4 humidity=56.78\n");

    let mut sent_to = None;
    let outcome = run
        .run(Some(template), &log, |progress| {
            if let qrcheckin::Progress::Sending(url) = progress {
                sent_to = Some(url.to_string());
            }
        })
        .await;

    let expected = format!("http://{addr}/c/Meeral/23.40/56.78");
    assert_eq!(sent_to.as_deref(), Some(expected.as_str()));
    match outcome {
        RunOutcome::CheckedIn { url, outcome, .. } => {
            assert_eq!(url, expected);
            assert!(matches!(
                outcome,
                CheckinOutcome::Structured { ref status, .. } if status == "OK"
            ));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let request = request.await.expect("request captured");
    assert!(request.starts_with("GET /c/Meeral/23.40/56.78 "), "{request}");
}

#[tokio::test]
async fn failed_checkin_keeps_the_reading() {
    let (addr, _request) = serve_once("404 Not Found", "no such team").await;
    let run = CheckinRun {
        team: "Meeral".to_string(),
        placeholders: Placeholders::default(),
        retry: RetryPolicy::default(),
        client: client(),
    };
    let log = StaticLog("temperature=20.00 humidity=40.00");

    let outcome = run
        .run(
            Some(UrlTemplate::new(format!("http://{addr}/YOUR_TEAM/FILL_HERE/FILL_THERE"))),
            &log,
            |_| {},
        )
        .await;

    match outcome {
        RunOutcome::CheckinFailed { reading, error, .. } => {
            assert_eq!(reading.temperature, 20.0);
            assert!(matches!(error, Error::Transport(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
