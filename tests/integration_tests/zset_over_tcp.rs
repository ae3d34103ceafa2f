use resp_server_rs::{cfg::config::Config, resp::reply::Reply};

use super::common::{TestServer, cmd};

fn bulks(parts: &[&str]) -> Reply {
    Reply::multi_bulk(parts.iter().map(|p| p.as_bytes().to_vec()).collect())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zrange_withscores_over_tcp() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    client
        .send(&cmd(&["ZADD", "z", "1", "x", "2", "y", "3", "z"]))
        .await
        .expect("zadd");
    assert_eq!(
        client
            .send(&cmd(&["ZRANGE", "z", "0", "-1", "WITHSCORES"]))
            .await
            .expect("zrange"),
        bulks(&["x", "1", "y", "2", "z", "3"])
    );
    assert_eq!(
        client
            .send(&cmd(&["ZREVRANGE", "z", "0", "-1"]))
            .await
            .expect("zrevrange"),
        bulks(&["z", "y", "x"])
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zrangebyscore_limit_over_tcp() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    client
        .send(&cmd(&["ZADD", "z", "5", "a", "5", "b", "5", "c"]))
        .await
        .expect("zadd");
    assert_eq!(
        client
            .send(&cmd(&["ZRANGEBYSCORE", "z", "5", "5", "LIMIT", "1", "1"]))
            .await
            .expect("zrangebyscore"),
        bulks(&["b"])
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rank_score_and_removal_flow() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    client
        .send(&cmd(&["ZADD", "board", "10", "alice", "20", "bob", "30", "carol"]))
        .await
        .expect("zadd");

    assert_eq!(
        client.send(&cmd(&["ZRANK", "board", "bob"])).await.expect("zrank"),
        Reply::integer(1)
    );
    assert_eq!(
        client
            .send(&cmd(&["ZREVRANK", "board", "bob"]))
            .await
            .expect("zrevrank"),
        Reply::integer(1)
    );
    assert_eq!(
        client
            .send(&cmd(&["ZSCORE", "board", "carol"]))
            .await
            .expect("zscore"),
        Reply::bulk(b"30".to_vec())
    );
    assert_eq!(
        client
            .send(&cmd(&["ZINCRBY", "board", "2.5", "alice"]))
            .await
            .expect("zincrby"),
        Reply::bulk(b"12.5".to_vec())
    );
    assert_eq!(
        client
            .send(&cmd(&["ZCOUNT", "board", "10", "20"]))
            .await
            .expect("zcount"),
        Reply::integer(2)
    );
    assert_eq!(
        client
            .send(&cmd(&["ZREMRANGEBYRANK", "board", "0", "0"]))
            .await
            .expect("zremrangebyrank"),
        Reply::integer(1)
    );
    assert_eq!(
        client.send(&cmd(&["ZCARD", "board"])).await.expect("zcard"),
        Reply::integer(2)
    );

    server.stop().await;
}
