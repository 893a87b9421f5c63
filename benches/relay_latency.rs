use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reqwest::Client;
use token_relay::bench_support::token_relay_proxy::config::RouteMode;
use token_relay::bench_support::token_relay_proxy::oauth::{
    TokenCache, TokenFetchError, TokenGrant, TokenSource,
};
use token_relay::bench_support::{RelayFixture, BENCH_TOKEN};
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

struct StaticSource;

#[async_trait]
impl TokenSource for StaticSource {
    async fn fetch_token(&self) -> Result<TokenGrant, TokenFetchError> {
        Ok(TokenGrant {
            access_token: BENCH_TOKEN.to_string(),
            expires_in: Duration::from_secs(3600),
        })
    }
}

fn bench_token_cache(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let cache = TokenCache::new(Arc::new(StaticSource));
    runtime
        .block_on(cache.get_valid_token())
        .expect("warm cache");

    c.bench_function("token_cache/warm_hit", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(cache.get_valid_token().await.expect("token")) });
    });
}

fn bench_relay_latency(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("relay_latency");
    group
        .sample_size(200)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));

    for (label, route_mode, route) in [
        ("prefix", RouteMode::Prefix("/api".to_string()), "/api/bench"),
        ("passthrough", RouteMode::Passthrough, "/bench"),
    ] {
        group.bench_function(BenchmarkId::new("warm_token", label), |b| {
            let (fixture, url) = runtime.block_on(async {
                let fixture = RelayFixture::start(route_mode.clone())
                    .await
                    .expect("fixture");
                Mock::given(method("GET"))
                    .and(path("/bench"))
                    .and(header("authorization", format!("Bearer {}", BENCH_TOKEN).as_str()))
                    .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
                    .mount(&fixture.backend)
                    .await;
                let url = fixture.url(route);
                (fixture, url)
            });

            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("client");

            b.iter(|| {
                runtime.block_on(async {
                    let response = client.get(&url).send().await.expect("response");
                    assert_eq!(response.status(), 200, "Expected 200 OK from backend");
                    response.bytes().await.expect("bytes");
                });
            });

            runtime.block_on(fixture.shutdown());
        });
    }

    group.finish();
}

criterion_group!(relay_latency, bench_token_cache, bench_relay_latency);
criterion_main!(relay_latency);
