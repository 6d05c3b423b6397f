//! End-to-end pipeline tests against a scripted in-memory transport.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use querybatch_core::{
    results_path, Aggregator, BatchError, BatchRunner, HttpQuery, Mode, QueryRequest,
    QueryTransport, RawResponse, RunConfig, RunState, TransportError,
};

/// Replays scripted responses in order and records every request it sees.
struct FakeTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    seen: Mutex<Vec<HttpQuery>>,
}

impl FakeTransport {
    fn new(script: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<QueryRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|q| serde_json::from_slice(&q.body).unwrap())
            .collect()
    }

    fn urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|q| q.url.clone()).collect()
    }
}

#[async_trait]
impl QueryTransport for FakeTransport {
    async fn send(&self, req: HttpQuery) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(req);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
    }

    fn base_url(&self) -> &str {
        "http://localhost:8080/"
    }
}

fn ok(body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse::new(200, "OK", body))
}

fn config(mode: Mode) -> RunConfig {
    RunConfig {
        dataset: "./data/wiki40b.test".into(),
        mode,
    }
}

#[tokio::test]
async fn count_mode_prints_occurrences() {
    let transport = FakeTransport::new(vec![ok(r#"{"Occurrences": 42}"#)]);
    let mut runner = BatchRunner::new(config(Mode::Count), transport);
    let mut console = Vec::new();

    let summary = runner
        .run(Cursor::new("the\n"), &mut console, Aggregator::<Vec<u8>>::count())
        .await
        .unwrap();

    let out = String::from_utf8(console).unwrap();
    assert!(out.starts_with("the: 42\nTime Taken: "), "{out}");
    assert_eq!(summary.queries, 1);
    assert_eq!(summary.rows, 0);
    assert_eq!(runner.state(), RunState::Completed);

    let reqs = runner.transport().requests();
    assert_eq!(
        reqs,
        vec![QueryRequest {
            dataset: "./data/wiki40b.test".into(),
            length: 3,
            query: "the".into(),
        }]
    );
    assert_eq!(runner.transport().urls(), vec!["http://localhost:8080/count"]);
}

#[tokio::test]
async fn non_utf8_line_is_sent_with_raw_length() {
    let transport = FakeTransport::new(vec![
        ok(r#"{"Occurrences": 1}"#),
        ok(r#"{"Occurrences": 2}"#),
        ok(r#"{"Occurrences": 3}"#),
    ]);
    let mut runner = BatchRunner::new(config(Mode::Count), transport);
    let mut console = Vec::new();

    let summary = runner
        .run(
            Cursor::new(b"ok\ncaf\xe9\nlast\n".to_vec()),
            &mut console,
            Aggregator::<Vec<u8>>::count(),
        )
        .await
        .unwrap();
    assert_eq!(summary.queries, 3);

    let out = String::from_utf8(console).unwrap();
    assert!(out.starts_with("ok: 1\ncaf\u{fffd}: 2\nlast: 3\nTime Taken: "), "{out}");

    let reqs = runner.transport().requests();
    assert_eq!(reqs[1].query, "caf\u{fffd}");
    assert_eq!(reqs[1].length, 4);
    assert_eq!(reqs[2].length, 4);
}

#[tokio::test]
async fn csv_mode_merges_rows_with_query_provenance() {
    let transport = FakeTransport::new(vec![ok("doc1,\"a cat sat\"\ndoc5,\"cats and dogs\"\n")]);
    let mut runner = BatchRunner::new(config(Mode::Csv), transport);
    let mut console = Vec::new();

    let summary = runner
        .run(Cursor::new("cat\n"), &mut console, Aggregator::csv(Vec::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(runner.transport().urls(), vec!["http://localhost:8080/csv"]);

    let out = String::from_utf8(console).unwrap();
    assert!(out.starts_with("cat: Successfully downloaded CSV\nTime Taken: "), "{out}");
}

#[tokio::test]
async fn csv_output_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("animals.txt");
    std::fs::write(&input, "cat\nbird\ndog\n").unwrap();
    let output = results_path(&input);

    let transport = FakeTransport::new(vec![
        ok("doc1,\"a cat sat\"\ndoc5,\"cats and dogs\"\n"),
        ok(""),
        ok("doc5,\"cats and dogs\"\n"),
    ]);
    let mut runner = BatchRunner::new(config(Mode::Csv), transport);
    let queries = std::io::BufReader::new(File::open(&input).unwrap());
    let aggregator = Aggregator::csv(File::create(&output).unwrap()).unwrap();

    let summary = runner.run(queries, &mut std::io::sink(), aggregator).await.unwrap();
    assert_eq!(summary.queries, 3);
    assert_eq!(summary.rows, 3);

    // Zero-row query still consumes index 1.
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "queryID,query,docID,document\n\
         0,cat,doc1,a cat sat\n\
         0,cat,doc5,cats and dogs\n\
         2,dog,doc5,cats and dogs\n"
    );
}

#[tokio::test]
async fn http_error_aborts_and_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("q-results.csv");

    let transport = FakeTransport::new(vec![
        ok("doc1,first\n"),
        Ok(RawResponse::new(500, "Internal Server Error", "index unavailable")),
        ok("doc2,never requested\n"),
    ]);
    let mut runner = BatchRunner::new(config(Mode::Csv), transport);
    let mut console = Vec::new();
    let aggregator = Aggregator::csv(File::create(&output).unwrap()).unwrap();

    let err = runner
        .run(Cursor::new("one\ntwo\nthree\n"), &mut console, aggregator)
        .await
        .unwrap_err();

    match &err {
        BatchError::Status { status, message, .. } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "index unavailable");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(runner.state(), RunState::Failed);
    assert_eq!(runner.queries_completed(), 1);
    assert_eq!(runner.transport().requests().len(), 2);

    // The failing query is echoed before the error.
    assert_eq!(
        String::from_utf8(console).unwrap(),
        "one: Successfully downloaded CSV\ntwo: \n"
    );
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "queryID,query,docID,document\n0,one,doc1,first\n"
    );
}

#[tokio::test]
async fn transport_error_aborts_run() {
    let transport = FakeTransport::new(vec![
        ok(r#"{"Occurrences": 3}"#),
        Err(TransportError::Http("connection refused".into())),
    ]);
    let mut runner = BatchRunner::new(config(Mode::Count), transport);
    let mut console = Vec::new();

    let err = runner
        .run(Cursor::new("a\nb\nc\n"), &mut console, Aggregator::<Vec<u8>>::count())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert_eq!(err.to_string(), "HTTP error: connection refused");
    assert_eq!(runner.transport().requests().len(), 2);
    assert_eq!(String::from_utf8(console).unwrap(), "a: 3\nb: \n");
}

#[tokio::test]
async fn malformed_csv_body_aborts_run() {
    let transport = FakeTransport::new(vec![ok("doc1,first\ndoc2\n")]);
    let mut runner = BatchRunner::new(config(Mode::Csv), transport);

    let err = runner
        .run(Cursor::new("x\n"), &mut std::io::sink(), Aggregator::csv(Vec::new()).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "decode");
    assert_eq!(runner.state(), RunState::Failed);
}

#[tokio::test]
async fn empty_input_writes_only_header() {
    let transport = FakeTransport::new(vec![]);
    let mut runner = BatchRunner::new(config(Mode::Csv), transport);
    let mut console = Vec::new();
    let mut out = Vec::new();

    let summary = runner
        .run(Cursor::new(""), &mut console, Aggregator::csv(&mut out).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.queries, 0);
    assert_eq!(summary.rows, 0);
    assert!(runner.transport().requests().is_empty());
    assert_eq!(String::from_utf8(out).unwrap(), "queryID,query,docID,document\n");
    assert!(String::from_utf8(console).unwrap().starts_with("Time Taken: "));
}

#[tokio::test]
async fn query_index_is_contiguous() {
    let queries = ["q0", "q1", "q2", "q3"];
    let script = queries.iter().map(|q| ok(&format!("d-{q},text\n"))).collect();
    let mut runner = BatchRunner::new(config(Mode::Csv), FakeTransport::new(script));
    let mut out = Vec::new();

    runner
        .run(
            Cursor::new(queries.join("\n")),
            &mut std::io::sink(),
            Aggregator::csv(&mut out).unwrap(),
        )
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    let indices: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(indices, vec!["0", "1", "2", "3"]);
}

#[tokio::test]
async fn identical_runs_produce_identical_csv() {
    async fn once() -> Vec<u8> {
        let transport = FakeTransport::new(vec![
            ok("doc1,\"a, b\"\n"),
            ok("doc2,\"say \"\"hi\"\"\"\n"),
        ]);
        let mut runner = BatchRunner::new(config(Mode::Csv), transport);
        let mut out = Vec::new();
        runner
            .run(
                Cursor::new("first\nsecond\n"),
                &mut std::io::sink(),
                Aggregator::csv(&mut out).unwrap(),
            )
            .await
            .unwrap();
        out
    }

    assert_eq!(once().await, once().await);
}
