//! Concurrent requests through a two-step chain.

mod common;

use std::time::{Duration, Instant};

use common::{client, config, deployment, module, start_gateway, tenant, traces, MockModule, Reply};

#[tokio::test]
async fn test_concurrent_chains_stay_isolated() {
    let upper = MockModule::start(|r| {
        Reply::status(200).body(&String::from_utf8_lossy(&r.body).to_uppercase())
    })
    .await;
    let wrap = MockModule::start(|r| {
        Reply::status(200).body(&format!("[{}]", String::from_utf8_lossy(&r.body)))
    })
    .await;

    let gateway = start_gateway(config(&format!(
        "{}{}{}{}{}",
        module("mod-upper-1.0.0", "/echo", "10", "request-response"),
        module("mod-wrap-1.0.0", "/echo", "20", "request-response"),
        deployment("mod-upper-1.0.0", &upper.url()),
        deployment("mod-wrap-1.0.0", &wrap.url()),
        tenant("t1", &["mod-upper-1.0.0", "mod-wrap-1.0.0"]),
    )))
    .await;

    let concurrency = 16;
    let requests_per_task = 20;
    let client = client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task in 0..concurrency {
        let client = client.clone();
        let url = gateway.url("/echo");
        tasks.push(tokio::spawn(async move {
            for n in 0..requests_per_task {
                let payload = format!("task{task}-req{n}");
                let res = client
                    .post(&url)
                    .header("X-Okapi-Tenant", "t1")
                    .body(payload.clone())
                    .send()
                    .await
                    .unwrap();
                assert_eq!(res.status(), 200);

                let trace = traces(&res);
                assert_eq!(trace.len(), 2);
                assert!(trace[0].starts_with("POST mod-upper-1.0.0:200 "));
                assert!(trace[1].starts_with("POST mod-wrap-1.0.0:200 "));
                assert_eq!(res.text().await.unwrap(), format!("[{}]", payload.to_uppercase()));
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let total = concurrency * requests_per_task;
    assert_eq!(upper.request_count(), total);
    assert_eq!(wrap.request_count(), total);
    assert!(start.elapsed() < Duration::from_secs(30));
}
