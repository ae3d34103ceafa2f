use std::io::Cursor;

use resp_server_rs::resp::{
    parser::{ParseError, Payload, parse_stream},
    reply::{ErrorReply, MultiBulkReply, Reply, ToBytes},
};

async fn frames(input: &[u8]) -> Vec<Payload> {
    let mut rx = parse_stream(Cursor::new(input.to_vec()));
    let mut out = Vec::new();
    while let Some(p) = rx.recv().await {
        out.push(p);
    }
    out
}

#[tokio::test]
async fn set_then_get_wire_scenario() {
    let input = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
    let got = frames(input).await;

    let set = got[0].as_ref().expect("set frame");
    assert_eq!(
        *set,
        Reply::multi_bulk(vec![b"SET".to_vec(), b"foo".to_vec(), b"bar".to_vec()])
    );
    let get = got[1].as_ref().expect("get frame");
    assert_eq!(
        *get,
        Reply::multi_bulk(vec![b"GET".to_vec(), b"foo".to_vec()])
    );
}

#[tokio::test]
async fn decoding_preserves_producer_order() {
    let produced: Vec<Reply> = (0..50)
        .map(|i| {
            Reply::multi_bulk(vec![
                b"set".to_vec(),
                format!("key{i}").into_bytes(),
                format!("value{i}").into_bytes(),
            ])
        })
        .collect();
    let mut wire = Vec::new();
    for frame in &produced {
        wire.extend_from_slice(&frame.to_bytes());
    }

    let got = frames(&wire).await;
    for (i, frame) in produced.iter().enumerate() {
        assert_eq!(got[i].as_ref().expect("frame"), frame);
    }
}

#[tokio::test]
async fn encode_after_decode_is_identity() {
    let originals = vec![
        Reply::status("OK"),
        Reply::pong(),
        Reply::integer(0),
        Reply::integer(i64::MIN),
        Reply::bulk(b"with \r\n inside".to_vec()),
        Reply::multi_bulk(vec![b"nested".to_vec(), b"*1\r\n$1\r\na".to_vec()]),
        Reply::null_bulk(),
        Reply::empty_multi_bulk(),
        Reply::Error(ErrorReply::WrongType),
    ];
    let mut wire = Vec::new();
    for frame in &originals {
        wire.extend_from_slice(&frame.to_bytes());
    }

    let decoded = frames(&wire).await;
    let mut rewire = Vec::new();
    for payload in &decoded {
        match payload {
            Ok(frame) => rewire.extend_from_slice(&frame.to_bytes()),
            Err(err) if err.is_eof() => {},
            Err(err) => panic!("unexpected decode failure: {err}"),
        }
    }
    assert_eq!(rewire, wire);
}

#[tokio::test]
async fn split_reads_reassemble_bulk_frames() {
    // feed the same pipeline through a reader that yields one byte at a
    // time, exercising bulk reassembly across read boundaries
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl tokio::io::AsyncRead for TrickleReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.pos < self.data.len() {
                buf.put_slice(&[self.data[self.pos]]);
                self.pos += 1;
            }
            std::task::Poll::Ready(Ok(()))
        }
    }

    let wire = b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n".to_vec();
    let reader = TrickleReader { data: wire, pos: 0 };
    let mut rx = parse_stream(reader);

    let first = rx.recv().await.expect("payload").expect("frame");
    assert_eq!(
        first,
        Reply::multi_bulk(vec![b"ECHO".to_vec(), b"hello".to_vec()])
    );
}

#[tokio::test]
async fn protocol_error_then_valid_frame() {
    let got = frames(b"$abc\r\nPING\r\n").await;
    assert!(matches!(got[0], Err(ParseError::Protocol(_))));
    assert_eq!(
        *got[1].as_ref().expect("inline ping"),
        Reply::multi_bulk(vec![b"PING".to_vec()])
    );
}

#[tokio::test]
async fn mget_reply_with_holes_round_trips_to_wire() {
    let reply = MultiBulkReply::nullable(vec![
        Some(b"1".to_vec()),
        None,
        Some(b"2".to_vec()),
    ]);
    assert_eq!(
        &reply.to_bytes()[..],
        b"*3\r\n$1\r\n1\r\n$-1\r\n$1\r\n2\r\n"
    );
}
