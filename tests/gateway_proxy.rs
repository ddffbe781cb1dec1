//! End-to-end tests: client → gateway → mock origin, with request recording.

use std::time::Duration;

use relay_gateway::store::RequestRecord;

mod common;

use common::{client, start_mock_backend, TestGateway};

fn route(id: &str, endpoint: &str, origin: &str, extra: &str) -> String {
    format!(
        "[[routes]]\nid = \"{id}\"\nendpoint = \"{endpoint}\"\norigin_url = \"{origin}\"\n{extra}\n"
    )
}

#[tokio::test]
async fn test_forwards_request_and_records_both_halves() {
    let (backend, mut seen) = start_mock_backend("200 OK", "item one").await;
    let routes = route(
        "svc",
        "/svc",
        &format!("http://{backend}"),
        "store_req_headers = true\nstore_req_body = true\nstore_res_headers = true\nstore_res_body = true",
    );
    let gateway = TestGateway::start(&routes, 5).await;

    let res = client()
        .post(gateway.url("/svc/items/1?x=1"))
        .header("x-custom", "abc")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-backend"], "mock");
    assert_eq!(res.text().await.unwrap(), "item one");

    let raw = seen.recv().await.unwrap();
    let raw_lower = raw.to_lowercase();
    assert!(raw.starts_with("POST /items/1?x=1 HTTP/1.1\r\n"), "{raw}");
    assert!(raw_lower.contains(&format!("host: {backend}")), "{raw}");
    assert!(raw_lower.contains("x-forwarded-for: 127.0.0.1"), "{raw}");
    assert!(raw_lower.contains("x-custom: abc"), "{raw}");
    assert!(raw.ends_with("hello"), "{raw}");

    let records = gateway.wait_for_records(2).await;
    let (RequestRecord::Request(req), RequestRecord::Response(res)) = (&records[0], &records[1])
    else {
        panic!("unexpected record order: {records:?}");
    };
    assert_eq!(req.request_id, res.request_id);
    assert_eq!(req.route_id, "svc");
    assert_eq!(req.ip, "127.0.0.1");
    assert_eq!(req.method, "POST");
    assert_eq!(req.gateway_url, gateway.url("/svc/items/1?x=1"));
    assert_eq!(req.origin_url, format!("http://{backend}/items/1?x=1"));
    assert_eq!(req.body.as_deref(), Some("hello"));
    assert_eq!(req.headers.as_ref().unwrap()["x-custom"], ["abc"]);

    assert_eq!(res.status, 200);
    assert_eq!(res.body.as_deref(), Some("item one"));
    assert_eq!(res.headers.as_ref().unwrap()["x-backend"], ["mock"]);
    assert!(res.timestamp >= req.timestamp);
}

#[tokio::test]
async fn test_default_toggles_record_summary_only() {
    let (backend, _seen) = start_mock_backend("201 Created", "created").await;
    let routes = route("r", "/api", &format!("http://{backend}"), "");
    let gateway = TestGateway::start(&routes, 5).await;

    let res = client().put(gateway.url("/api/x")).body("data").send().await.unwrap();
    assert_eq!(res.status(), 201);
    let _ = res.text().await.unwrap();

    let records = gateway.wait_for_records(2).await;
    let RequestRecord::Request(req) = &records[0] else { panic!("{records:?}") };
    assert!(req.headers.is_none());
    assert!(req.body.is_none());
    let RequestRecord::Response(res) = &records[1] else { panic!("{records:?}") };
    assert_eq!(res.status, 201);
    assert!(res.body.is_none());
}

#[tokio::test]
async fn test_forwarded_for_header_sets_recorded_ip() {
    let (backend, mut seen) = start_mock_backend("200 OK", "ok").await;
    let gateway = TestGateway::start(&route("r", "", &format!("http://{backend}"), ""), 5).await;

    let res = client()
        .get(gateway.url("/anything"))
        .header("x-forwarded-for", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let raw = seen.recv().await.unwrap().to_lowercase();
    assert!(raw.contains("x-forwarded-for: 203.0.113.9, 127.0.0.1"), "{raw}");

    let records = gateway.wait_for_records(1).await;
    let RequestRecord::Request(req) = &records[0] else { panic!("{records:?}") };
    assert_eq!(req.ip, "203.0.113.9");
}

#[tokio::test]
async fn test_unmatched_path_is_404_and_not_recorded() {
    let gateway = TestGateway::start(&route("r", "/api", "http://127.0.0.1:9", ""), 5).await;

    let res = client().get(gateway.url("/other")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "Not Found");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.records().is_empty());
}

#[tokio::test]
async fn test_route_without_store_hits_is_not_recorded() {
    let (backend, _seen) = start_mock_backend("200 OK", "ok").await;
    let gateway = TestGateway::start(
        &route("quiet", "/q", &format!("http://{backend}"), "store_hits = false"),
        5,
    )
    .await;

    let res = client().get(gateway.url("/q/1")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.records().is_empty());
}

#[tokio::test]
async fn test_response_body_over_cap_is_not_stored() {
    let (backend, _seen) = start_mock_backend("200 OK", "0123456789").await;
    let gateway = TestGateway::start(
        &route(
            "r",
            "",
            &format!("http://{backend}"),
            "store_req_body = true\nstore_req_body_max_bytes = 100\nstore_res_body = true\nstore_res_body_max_bytes = 4",
        ),
        5,
    )
    .await;

    let res = client().post(gateway.url("/x")).body("small").send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "0123456789");

    let records = gateway.wait_for_records(2).await;
    let RequestRecord::Request(req) = &records[0] else { panic!("{records:?}") };
    assert_eq!(req.body.as_deref(), Some("small"));
    let RequestRecord::Response(res) = &records[1] else { panic!("{records:?}") };
    assert!(res.body.is_none());
}

#[tokio::test]
async fn test_unreachable_origin_is_502_and_recorded() {
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let gateway = TestGateway::start(
        &route("r", "", &format!("http://{dead}"), "store_res_body = true"),
        5,
    )
    .await;

    let res = client().get(gateway.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert_eq!(res.text().await.unwrap(), "Bad Gateway");

    let records = gateway.wait_for_records(2).await;
    let RequestRecord::Response(res) = &records[1] else { panic!("{records:?}") };
    assert_eq!(res.status, 502);
    assert_eq!(res.body.as_deref(), Some("Bad Gateway"));
}

#[tokio::test]
async fn test_routes_file_changes_apply_after_ttl() {
    let (backend, _seen) = start_mock_backend("200 OK", "new route").await;
    let gateway = TestGateway::start(&route("a", "/a", "http://127.0.0.1:9", ""), 1).await;

    let res = client().get(gateway.url("/b/1")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    gateway.write_routes(&format!(
        "{}{}",
        route("a", "/a", "http://127.0.0.1:9", ""),
        route("b", "/b", &format!("http://{backend}"), "")
    ));
    tokio::time::sleep(Duration::from_millis(1200)).await;

    let res = client().get(gateway.url("/b/1")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "new route");
}

#[tokio::test]
async fn test_missing_routes_file_is_500() {
    let gateway = TestGateway::start("", 5).await;
    std::fs::remove_file(gateway.dir.join("routes.toml")).unwrap();

    let res = client().get(gateway.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Gateway Error: failed to get routes");
}
