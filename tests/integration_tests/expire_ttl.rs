use std::time::Duration;

use resp_server_rs::{cfg::config::Config, resp::reply::Reply};

use super::common::{TestServer, cmd};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_key_reads_absent_after_the_deadline() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    client.send(&cmd(&["SET", "k", "v"])).await.expect("set");
    assert_eq!(
        client.send(&cmd(&["EXPIRE", "k", "1"])).await.expect("expire"),
        Reply::integer(1)
    );
    assert_eq!(
        client.send(&cmd(&["TTL", "k"])).await.expect("ttl"),
        Reply::integer(1)
    );

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(
        client.send(&cmd(&["GET", "k"])).await.expect("get"),
        Reply::null_bulk()
    );
    assert_eq!(
        client.send(&cmd(&["TTL", "k"])).await.expect("ttl"),
        Reply::integer(-2)
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ttl_reports_minus_one_without_expiry() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    client.send(&cmd(&["SET", "k", "v"])).await.expect("set");
    assert_eq!(
        client.send(&cmd(&["TTL", "k"])).await.expect("ttl"),
        Reply::integer(-1)
    );
    assert_eq!(
        client.send(&cmd(&["TTL", "missing"])).await.expect("ttl"),
        Reply::integer(-2)
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_positive_expire_deletes_immediately() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    client.send(&cmd(&["SET", "k", "v"])).await.expect("set");
    assert_eq!(
        client.send(&cmd(&["EXPIRE", "k", "0"])).await.expect("expire"),
        Reply::integer(1)
    );
    assert_eq!(
        client.send(&cmd(&["EXISTS", "k"])).await.expect("exists"),
        Reply::integer(0)
    );

    server.stop().await;
}
