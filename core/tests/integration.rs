//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `BangumiClient` with
//! the production `UreqTransport` over real HTTP. Validates URL building,
//! query encoding, headers and envelope handling against an actual server.

use std::net::SocketAddr;

use bangumi_core::{
    ApiError, BangumiClient, CancellationToken, ClientConfig, JsonMap, ResponseGroup,
    SearchRequest, SubjectType,
};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> BangumiClient {
    BangumiClient::new("integration", &format!("http://{addr}"), "").unwrap()
}

#[test]
fn get_subject_over_http() {
    let addr = start_server();
    let client = client(addr);
    let cancel = CancellationToken::new();

    let subject = client.get_subject(&cancel, Some("token"), "2388").unwrap();
    assert_eq!(subject["id"], 2388);
    assert_eq!(subject["name"], "CLANNAD");
    assert_eq!(subject["type"], 2);
}

#[test]
fn unknown_subject_is_status_error() {
    let addr = start_server();
    let err = client(addr)
        .get_subject(&CancellationToken::new(), None, "1")
        .unwrap_err();

    assert!(err.to_string().contains("Not Found"), "{err}");
    assert_eq!(err.status(), Some(404));
}

#[test]
fn search_over_http() {
    let addr = start_server();
    let client = client(addr);
    let cancel = CancellationToken::new();

    let search = SearchRequest::new("CLANNAD").subject_type(SubjectType::Anime);
    let found = client
        .search_subjects_by_keywords(&cancel, None, &search)
        .unwrap();
    assert_eq!(found["results"], 2);
    let list = found["list"].as_array().unwrap();
    assert_eq!(list[0]["id"], 2388);
    assert!(list[0].get("summary").is_none());
}

#[test]
fn search_paging_and_response_group_over_http() {
    let addr = start_server();
    let search = SearchRequest::new("CLANNAD")
        .start(1)
        .max_results(2)
        .response_group(ResponseGroup::Large);
    let found = client(addr)
        .search_subjects_by_keywords(&CancellationToken::new(), None, &search)
        .unwrap();

    assert_eq!(found["results"], 6);
    let list = found["list"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], 876);
    assert!(list[0].get("summary").is_some());
}

#[test]
fn non_ascii_keywords_over_http() {
    let addr = start_server();
    let found = client(addr)
        .search_subjects_by_keywords(&CancellationToken::new(), None, &SearchRequest::new("星际牛仔"))
        .unwrap();

    assert_eq!(found["results"], 1);
    assert_eq!(found["list"][0]["name"], "カウボーイビバップ");
}

#[test]
fn enveloped_listing_is_unwrapped_over_http() {
    let addr = start_server();
    let page: Vec<JsonMap> = client(addr)
        .get_json(
            &CancellationToken::new(),
            "/v0/subjects",
            None,
            &[("type", "2"), ("limit", "2")],
        )
        .unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["id"], 2388);
}

#[test]
fn connection_refused_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut config = ClientConfig::new("integration", &format!("http://{addr}"), "");
    config.attempts = 2;
    let client = BangumiClient::from_config(config).unwrap();

    let err = client
        .get_subject(&CancellationToken::new(), None, "2388")
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "{err}");
}
