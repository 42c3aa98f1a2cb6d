use std::io::Write;

use clap::Parser;
use jfr_exporter::app;
use jfr_exporter::config::Cli;
use similar_asserts::assert_eq;
use test_log::test;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

const EVENTS: &str = r#"{"type":"jdk.JavaThreadStatistics","startTime":"2023-11-14T22:13:20Z","values":{"activeCount":12,"daemonCount":4}}
{"type":"jdk.SafepointBegin","startTime":"2023-11-14T22:13:21Z","values":{"safepointId":7}}
{"type":"jdk.ExecutionSample","startTime":"2023-11-14T22:13:21Z","values":{}}
{"type":"jdk.SafepointEnd","startTime":"2023-11-14T22:13:21.250Z","values":{"safepointId":7}}
{"type":"jdk.ObjectAllocationOutsideTLAB","startTime":"2023-11-14T22:13:22Z","values":{"allocationSize":300000,"objectClass":"[B","eventThread":"worker-1"},"stackTrace":[{"declaringType":"java.util.Arrays","method":"copyOf","line":3512},{"declaringType":"com.shop.Cart","method":"checkout","line":88},{"declaringType":"com.shop.Api","method":"handle","line":21},{"declaringType":"java.lang.Thread","method":"run"}]}
"#;

#[test(tokio::test)]
async fn events_are_exported_as_line_protocol() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .and(query_param("db", "metrics"))
        .and(query_param("precision", "n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let mut input = tempfile::NamedTempFile::new().expect("should create event file");
    input
        .write_all(EVENTS.as_bytes())
        .expect("should write events");
    let input_path = input.path().to_string_lossy().to_string();
    let url = mock_server.uri();

    let summary = tokio::task::spawn_blocking(move || {
        let cli = Cli::try_parse_from([
            "jfr-exporter",
            "--input",
            input_path.as_str(),
            "--influx-url",
            url.as_str(),
            "--influx-database",
            "metrics",
            "--tag",
            "env/prod",
            "--application",
            "shop",
            "--disable-stack-traces",
        ])
        .expect("should parse arguments");
        app::run(&cli)
    })
    .await
    .expect("join")
    .expect("should export events");

    assert_eq!(summary.dispatched, 4);
    assert_eq!(summary.skipped, 1);

    let requests = mock_server
        .received_requests()
        .await
        .expect("should record requests");
    let writes: Vec<String> = requests
        .iter()
        .filter(|request| request.url.path() == "/write")
        .map(|request| String::from_utf8_lossy(&request.body).to_string())
        .collect();
    assert_eq!(writes.len(), 1);

    let lines: Vec<&str> = writes[0].lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "threads,application=shop,env=prod activeCount=12,daemonCount=4 1700000000000000000"
    );
    assert!(lines[1].starts_with("safepoint,application=shop,env=prod duration=250"));
    assert!(lines[1].ends_with(" 1700000001250000000"));
    assert_eq!(
        lines[2],
        r#"big-allocations,application=shop,env=prod bytes=300000,stacktrace="java.util.Arrays.copyOf (line: 3512) --- com.shop.Cart.checkout (line: 88) --- com.shop.Api.handle (line: 21)",objectClass="byte[]",thread="worker-1" 1700000002000000000"#
    );
}

#[test(tokio::test)]
async fn failed_writes_do_not_fail_the_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut input = tempfile::NamedTempFile::new().expect("should create event file");
    input
        .write_all(EVENTS.as_bytes())
        .expect("should write events");
    let input_path = input.path().to_string_lossy().to_string();
    let url = mock_server.uri();

    let summary = tokio::task::spawn_blocking(move || {
        let cli = Cli::try_parse_from([
            "jfr-exporter",
            "--input",
            input_path.as_str(),
            "--influx-url",
            url.as_str(),
        ])
        .expect("should parse arguments");
        app::run(&cli)
    })
    .await
    .expect("join")
    .expect("send failures are only logged");

    assert_eq!(summary.dispatched, 4);
}
