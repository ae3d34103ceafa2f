use resp_server_rs::{cfg::config::Config, resp::reply::Reply};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::common::{TestServer, cmd};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn set_then_get_over_tcp() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    let set = client.send(&cmd(&["SET", "foo", "bar"])).await.expect("set");
    assert_eq!(set, Reply::ok());
    let get = client.send(&cmd(&["GET", "foo"])).await.expect("get");
    assert_eq!(get, Reply::bulk(b"bar".to_vec()));

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pipelined_writes_get_ordered_replies() {
    let server = TestServer::start(&Config::default()).await.expect("server");

    let mut stream = tokio::net::TcpStream::connect(&server.addr)
        .await
        .expect("connect");
    // both commands in one segment; replies must come back in order
    stream
        .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
        .await
        .expect("pipeline write");

    let expected = b"+OK\r\n$3\r\nbar\r\n";
    let mut got = vec![0u8; expected.len()];
    stream.read_exact(&mut got).await.expect("replies");
    assert_eq!(&got, expected);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn incrby_scenario_over_tcp() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let client = server.client().await.expect("client");

    assert_eq!(
        client.send(&cmd(&["SET", "a", "1"])).await.expect("set"),
        Reply::ok()
    );
    assert_eq!(
        client.send(&cmd(&["INCRBY", "a", "9"])).await.expect("incrby"),
        Reply::integer(10)
    );
    assert_eq!(
        client.send(&cmd(&["GET", "a"])).await.expect("get"),
        Reply::bulk(b"10".to_vec())
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn protocol_error_keeps_the_connection_alive() {
    let server = TestServer::start(&Config::default()).await.expect("server");

    let mut stream = tokio::net::TcpStream::connect(&server.addr)
        .await
        .expect("connect");
    stream.write_all(b"*bad\r\nPING\r\n").await.expect("write");

    let mut buf = Vec::new();
    // expect an error line followed by +PONG
    let mut chunk = [0u8; 256];
    loop {
        let n = stream.read(&mut chunk).await.expect("read");
        assert!(n > 0, "server closed the connection on a protocol error");
        buf.extend_from_slice(&chunk[..n]);
        if buf.ends_with(b"+PONG\r\n") {
            break;
        }
    }
    assert!(buf.starts_with(b"-"), "first reply should be an error");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn inline_commands_are_accepted() {
    let server = TestServer::start(&Config::default()).await.expect("server");

    let mut stream = tokio::net::TcpStream::connect(&server.addr)
        .await
        .expect("connect");
    stream.write_all(b"set inline works\r\nget inline\r\n").await.expect("write");

    let expected = b"+OK\r\n$5\r\nworks\r\n";
    let mut got = vec![0u8; expected.len()];
    stream.read_exact(&mut got).await.expect("replies");
    assert_eq!(&got, expected);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn select_isolates_databases_per_connection() {
    let server = TestServer::start(&Config::default()).await.expect("server");
    let first = server.client().await.expect("client one");
    let second = server.client().await.expect("client two");

    first.send(&cmd(&["SELECT", "1"])).await.expect("select");
    first.send(&cmd(&["SET", "k", "one"])).await.expect("set");

    // the other connection still points at db 0
    assert_eq!(
        second.send(&cmd(&["GET", "k"])).await.expect("get"),
        Reply::null_bulk()
    );
    second.send(&cmd(&["SELECT", "1"])).await.expect("select");
    assert_eq!(
        second.send(&cmd(&["GET", "k"])).await.expect("get"),
        Reply::bulk(b"one".to_vec())
    );

    server.stop().await;
}
