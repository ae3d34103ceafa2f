use resp_server_rs::{
    database::Engine,
    resp::{
        connection::RespConn,
        reply::{ErrorReply, Reply},
    },
    utils::to_cmd_line,
};

fn exec(engine: &Engine, conn: &RespConn, parts: &[&str]) -> Reply {
    engine.exec(conn, &to_cmd_line(parts))
}

#[test]
fn set_then_get_returns_the_value() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    assert_eq!(exec(&engine, &conn, &["SET", "k", "v"]), Reply::ok());
    assert_eq!(exec(&engine, &conn, &["GET", "k"]), Reply::bulk(b"v".to_vec()));
}

#[test]
fn set_del_exists_law() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    exec(&engine, &conn, &["SET", "k", "v"]);
    assert_eq!(exec(&engine, &conn, &["DEL", "k"]), Reply::integer(1));
    assert_eq!(exec(&engine, &conn, &["EXISTS", "k"]), Reply::integer(0));
}

#[test]
fn incrby_then_get_pins_the_stored_form() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    assert_eq!(exec(&engine, &conn, &["SET", "a", "1"]), Reply::ok());
    assert_eq!(
        exec(&engine, &conn, &["INCRBY", "a", "9"]),
        Reply::integer(10)
    );
    assert_eq!(exec(&engine, &conn, &["GET", "a"]), Reply::bulk(b"10".to_vec()));
}

#[test]
fn incr_then_decr_restores_the_original() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    exec(&engine, &conn, &["SET", "n", "41"]);
    exec(&engine, &conn, &["INCR", "n"]);
    assert_eq!(exec(&engine, &conn, &["DECR", "n"]), Reply::integer(41));
}

#[test]
fn zadd_same_pair_twice_reports_update_and_keeps_card() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    assert_eq!(
        exec(&engine, &conn, &["ZADD", "k", "3", "m"]),
        Reply::integer(0)
    );
    assert_eq!(
        exec(&engine, &conn, &["ZADD", "k", "3", "m"]),
        Reply::integer(1)
    );
    assert_eq!(exec(&engine, &conn, &["ZCARD", "k"]), Reply::integer(1));
}

#[test]
fn command_names_are_case_insensitive() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    assert_eq!(exec(&engine, &conn, &["SeT", "k", "v"]), Reply::ok());
    assert_eq!(exec(&engine, &conn, &["get", "k"]), Reply::bulk(b"v".to_vec()));
    assert_eq!(exec(&engine, &conn, &["PiNg"]), Reply::pong());
}

#[test]
fn type_and_wrongtype_surface_as_expected() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    exec(&engine, &conn, &["SET", "s", "v"]);
    exec(&engine, &conn, &["ZADD", "z", "1", "m"]);
    assert_eq!(exec(&engine, &conn, &["TYPE", "s"]), Reply::status("string"));
    assert_eq!(exec(&engine, &conn, &["TYPE", "z"]), Reply::status("zset"));
    assert_eq!(exec(&engine, &conn, &["TYPE", "nope"]), Reply::status("none"));
    assert_eq!(
        exec(&engine, &conn, &["INCR", "z"]),
        Reply::Error(ErrorReply::WrongType)
    );
}

#[test]
fn zrangebyscore_limit_scenario() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    exec(&engine, &conn, &["ZADD", "z", "5", "a", "5", "b", "5", "c"]);
    assert_eq!(
        exec(&engine, &conn, &["ZRANGEBYSCORE", "z", "5", "5", "LIMIT", "1", "1"]),
        Reply::multi_bulk(vec![b"b".to_vec()])
    );
}

#[test]
fn zrange_withscores_scenario() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    exec(&engine, &conn, &["ZADD", "z", "1", "x", "2", "y", "3", "z"]);
    assert_eq!(
        exec(&engine, &conn, &["ZRANGE", "z", "0", "-1", "WITHSCORES"]),
        Reply::multi_bulk(
            ["x", "1", "y", "2", "z", "3"]
                .iter()
                .map(|s| s.as_bytes().to_vec())
                .collect()
        )
    );
}

#[test]
fn msetnx_is_all_or_nothing() {
    let engine = Engine::new(16);
    let conn = RespConn::fake();

    exec(&engine, &conn, &["SET", "b", "taken"]);
    assert_eq!(
        exec(&engine, &conn, &["MSETNX", "a", "1", "b", "2"]),
        Reply::integer(0)
    );
    assert_eq!(exec(&engine, &conn, &["EXISTS", "a"]), Reply::integer(0));
}
