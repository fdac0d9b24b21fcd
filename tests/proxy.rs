//! End-to-end tests: client → proxy → balancer tree → mock backends.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;

mod common;

use common::{client, start_mock_backend, start_proxy, ADMIN_KEY};

async fn get_body(client: &reqwest::Client, url: &str) -> (StatusCode, String) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.text().await.unwrap())
}

#[tokio::test]
async fn test_concurrent_requests_follow_weights() {
    let a = start_mock_backend("a", Duration::from_millis(500)).await;
    let b = start_mock_backend("b", Duration::from_millis(500)).await;
    let proxy = start_proxy(&format!(
        r#"
        [listener]
        service = "web"

        [[services]]
        name = "web"
        servers = [
            {{ name = "a", url = "http://{a}", weight = 3 }},
            {{ name = "b", url = "http://{b}", weight = 1 }},
        ]
        "#
    ))
    .await;

    // All eight are in flight together, so picks follow pending / weight.
    let client = client();
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = proxy.url("/");
        tasks.push(tokio::spawn(async move { get_body(&client, &url).await }));
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        *counts.entry(body).or_default() += 1;
    }
    assert_eq!(counts["a"], 6);
    assert_eq!(counts["b"], 2);

    let web = proxy.manager.get("web").unwrap();
    assert_eq!(web.pending_counts()["a"], 0);
    assert_eq!(web.pending_counts()["b"], 0);
}

#[tokio::test]
async fn test_sticky_cookie_follows_health() {
    let a = start_mock_backend("a", Duration::ZERO).await;
    let b = start_mock_backend("b", Duration::ZERO).await;
    let proxy = start_proxy(&format!(
        r#"
        [listener]
        service = "web"

        [[services]]
        name = "web"
        health_check = true
        servers = [
            {{ name = "a", url = "http://{a}" }},
            {{ name = "b", url = "http://{b}" }},
        ]

        [services.sticky.cookie]
        name = "lb"
        http_only = true
        "#
    ))
    .await;
    let client = client();

    for _ in 0..3 {
        let res = client.get(proxy.url("/")).header(COOKIE, "lb=b").send().await.unwrap();
        assert_eq!(res.headers()[SET_COOKIE], "lb=b; Path=/; HttpOnly");
        assert_eq!(res.text().await.unwrap(), "b");
    }

    proxy.manager.set_server_status("web", "b", false).unwrap();
    let res = client.get(proxy.url("/")).header(COOKIE, "lb=b").send().await.unwrap();
    assert_eq!(res.headers()[SET_COOKIE], "lb=a; Path=/; HttpOnly");
    assert_eq!(res.text().await.unwrap(), "a");
}

#[tokio::test]
async fn test_status_reports_through_admin_api() {
    let a = start_mock_backend("a", Duration::ZERO).await;
    let proxy = start_proxy(&format!(
        r#"
        [listener]
        service = "web"

        [[services]]
        name = "web"
        health_check = true
        servers = [{{ name = "a", url = "http://{a}" }}]
        "#
    ))
    .await;
    let client = client();
    let status_url = proxy.admin_url("/admin/services/web/servers/a/status");

    let res = client
        .put(&status_url)
        .bearer_auth(ADMIN_KEY)
        .json(&serde_json::json!({ "healthy": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, body) = get_body(&client, &proxy.url("/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "no available server");

    client
        .put(&status_url)
        .bearer_auth(ADMIN_KEY)
        .json(&serde_json::json!({ "healthy": true }))
        .send()
        .await
        .unwrap();
    let (status, body) = get_body(&client, &proxy.url("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "a");
}

#[tokio::test]
async fn test_nested_services_propagate_health() {
    let b1 = start_mock_backend("blue-1", Duration::ZERO).await;
    let g1 = start_mock_backend("green-1", Duration::ZERO).await;
    let proxy = start_proxy(&format!(
        r#"
        [listener]
        service = "front"

        [[services]]
        name = "front"
        health_check = true
        services = [{{ name = "blue", weight = 4 }}, {{ name = "green" }}]

        [[services]]
        name = "blue"
        health_check = true
        servers = [{{ name = "b1", url = "http://{b1}" }}]

        [[services]]
        name = "green"
        health_check = true
        servers = [{{ name = "g1", url = "http://{g1}" }}]
        "#
    ))
    .await;
    let client = client();

    let (_, body) = get_body(&client, &proxy.url("/")).await;
    assert_eq!(body, "blue-1");

    proxy.manager.set_server_status("blue", "b1", false).unwrap();
    assert_eq!(proxy.manager.entry().healthy_count(), 1);
    for _ in 0..3 {
        let (status, body) = get_body(&client, &proxy.url("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "green-1");
    }

    proxy.manager.set_server_status("green", "g1", false).unwrap();
    let (status, _) = get_body(&client, &proxy.url("/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unreachable_server_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let proxy = start_proxy(&format!(
        r#"
        [listener]
        service = "web"

        [[services]]
        name = "web"
        servers = [{{ name = "dead", url = "http://{dead}" }}]
        "#
    ))
    .await;

    let (status, _) = get_body(&client(), &proxy.url("/")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(proxy.manager.get("web").unwrap().pending_counts()["dead"], 0);
}
