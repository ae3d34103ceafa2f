use resp_server_rs::{cfg::config::Config, resp::reply::Reply};
use serial_test::serial;

use super::common::{TestServer, cmd};

fn persistent_config(dir: &tempfile::TempDir) -> Config {
    Config {
        append_only: true,
        append_filename: dir
            .path()
            .join("appendonly.aof")
            .to_string_lossy()
            .to_string(),
        ..Config::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn state_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = persistent_config(&dir);

    {
        let server = TestServer::start(&cfg).await.expect("first run");
        let client = server.client().await.expect("client");

        client.send(&cmd(&["SET", "s", "v1"])).await.expect("set");
        client.send(&cmd(&["SET", "gone", "x"])).await.expect("set");
        client.send(&cmd(&["DEL", "gone"])).await.expect("del");
        client
            .send(&cmd(&["ZADD", "board", "1", "a", "2", "b"]))
            .await
            .expect("zadd");
        client.send(&cmd(&["ZREM", "board", "a"])).await.expect("zrem");
        client.send(&cmd(&["SELECT", "3"])).await.expect("select");
        client.send(&cmd(&["SET", "other", "db3"])).await.expect("set");

        server.stop().await;
    }

    let server = TestServer::start(&cfg).await.expect("second run");
    let client = server.client().await.expect("client");

    assert_eq!(
        client.send(&cmd(&["GET", "s"])).await.expect("get"),
        Reply::bulk(b"v1".to_vec())
    );
    assert_eq!(
        client.send(&cmd(&["EXISTS", "gone"])).await.expect("exists"),
        Reply::integer(0)
    );
    assert_eq!(
        client.send(&cmd(&["ZCARD", "board"])).await.expect("zcard"),
        Reply::integer(1)
    );
    assert_eq!(
        client.send(&cmd(&["ZSCORE", "board", "b"])).await.expect("zscore"),
        Reply::bulk(b"2".to_vec())
    );

    client.send(&cmd(&["SELECT", "3"])).await.expect("select");
    assert_eq!(
        client.send(&cmd(&["GET", "other"])).await.expect("get"),
        Reply::bulk(b"db3".to_vec())
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn expire_deadline_survives_replay_as_absolute_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = persistent_config(&dir);

    {
        let server = TestServer::start(&cfg).await.expect("first run");
        let client = server.client().await.expect("client");
        client.send(&cmd(&["SET", "k", "v"])).await.expect("set");
        client.send(&cmd(&["EXPIRE", "k", "100"])).await.expect("expire");
        server.stop().await;
    }

    let server = TestServer::start(&cfg).await.expect("second run");
    let client = server.client().await.expect("client");

    // the replayed deadline is absolute, so the remaining ttl only shrinks
    let ttl = client.send(&cmd(&["TTL", "k"])).await.expect("ttl");
    match ttl {
        Reply::Integer(int) => {
            assert!(int.code > 0 && int.code <= 100, "ttl was {}", int.code);
        },
        other => panic!("expected integer ttl, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn restart_without_append_only_ignores_old_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = persistent_config(&dir);

    {
        let server = TestServer::start(&cfg).await.expect("first run");
        let client = server.client().await.expect("client");
        client.send(&cmd(&["SET", "k", "v"])).await.expect("set");
        server.stop().await;
    }

    let volatile = Config::default();
    let server = TestServer::start(&volatile).await.expect("volatile run");
    let client = server.client().await.expect("client");
    assert_eq!(
        client.send(&cmd(&["GET", "k"])).await.expect("get"),
        Reply::null_bulk()
    );

    server.stop().await;
}
