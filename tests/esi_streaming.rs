//! `/esi`: origin page streamed through the HTML rewriter.

use axum::http::StatusCode;

mod common;

const ESI_INCLUDE: &str = r#"<esi:include src="/skywards" />"#;

#[tokio::test]
async fn test_placeholder_replaced_across_chunks() {
    let origin = common::start_programmable_backend(|_| {
        common::MockResponse::html_chunks(&[
            "<!DOCTYPE html><html><body><h1>Flights</h1><di",
            "v class=\"hero esi\"><p>fallback</p></d",
            "iv><!-- <div class=\"esi\"></div> --><p>after</p>",
            "<div class=\"esi\"/></body></html>",
        ])
    })
    .await;

    let mut config = common::test_config();
    config.esi.origin_url = format!("{}/", origin.url());
    let edge = common::start_edge(config, common::StaticSecrets::with(&[])).await;

    let res = common::client().get(edge.url("/esi")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(res.headers()["x-aem-esi"], "on");
    assert_eq!(res.headers()["x-served-by"], "test-pop");

    let body = res.text().await.unwrap();
    assert_eq!(
        body,
        format!(
            "<!DOCTYPE html><html><body><h1>Flights</h1>{ESI_INCLUDE}\
             <!-- <div class=\"esi\"></div> --><p>after</p>{ESI_INCLUDE}</body></html>"
        )
    );
    assert_eq!(origin.requests().len(), 1);

    edge.stop().await;
}

#[tokio::test]
async fn test_configured_rules() {
    let origin = common::start_programmable_backend(|_| {
        common::MockResponse::html_chunks(&["<p>a</p><span class=\"promo\">old</span><p>b</p>"])
    })
    .await;

    let mut config = common::test_config();
    config.esi.origin_url = origin.url();
    config.esi.rules = vec![edge_dispatch::config::RewriteRuleConfig {
        selector: "span.promo".into(),
        replacement: "<b>new</b>".into(),
    }];
    let edge = common::start_edge(config, common::StaticSecrets::with(&[])).await;

    let body = common::client()
        .get(edge.url("/esi"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "<p>a</p><b>new</b><p>b</p>");

    edge.stop().await;
}

#[tokio::test]
async fn test_origin_error_is_bad_gateway() {
    let origin =
        common::start_programmable_backend(|_| common::MockResponse::status(500, "boom")).await;

    let mut config = common::test_config();
    config.esi.origin_url = origin.url();
    let edge = common::start_edge(config, common::StaticSecrets::with(&[])).await;

    let res = common::client().get(edge.url("/esi")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Upstream request failed");

    edge.stop().await;
}

#[tokio::test]
async fn test_unreachable_origin_is_bad_gateway() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let origin_url = format!("http://{}/", closed.local_addr().unwrap());
    drop(closed);

    let mut config = common::test_config();
    config.esi.origin_url = origin_url;
    let edge = common::start_edge(config, common::StaticSecrets::with(&[])).await;

    let res = common::client().get(edge.url("/esi")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    edge.stop().await;
}
