// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io;

use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    sync::mpsc,
};
use tracing::debug;

use crate::resp::reply::{ErrorReply, Reply, StatusReply};

/// Decoder failure. Protocol errors leave the stream usable; I/O errors
/// (including EOF) terminate it.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ParseError {
    pub fn is_eof(&self) -> bool {
        matches!(self, ParseError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// One item of the decoded stream: a complete frame or a decode failure.
pub type Payload = Result<Reply, ParseError>;

/// Spawns a decoder task over an arbitrary byte source and returns the
/// channel its payloads arrive on. The channel closes after the first I/O
/// failure; protocol errors are emitted in-band and decoding continues
/// with fresh state.
pub fn parse_stream<R>(source: R) -> mpsc::Receiver<Payload>
where R: AsyncRead + Send + Unpin + 'static {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut reader = BufReader::new(source);
        loop {
            match decode_frame(&mut reader).await {
                Ok(frame) => {
                    if tx.send(Ok(frame)).await.is_err() {
                        return;
                    }
                },
                Err(err @ ParseError::Protocol(_)) => {
                    if tx.send(Err(err)).await.is_err() {
                        return;
                    }
                },
                Err(err) => {
                    debug!("decoder stream ends: {err}");
                    let _ = tx.send(Err(err)).await;
                    return;
                },
            }
        }
    });
    rx
}

#[derive(Default)]
struct ReadState {
    reading_multi_line: bool,
    expected_args_count: usize,
    msg_type: u8,
    args: Vec<Vec<u8>>,
    bulk_len: i64,
}

impl ReadState {
    fn finished(&self) -> bool {
        self.expected_args_count > 0 && self.args.len() == self.expected_args_count
    }
}

enum Line {
    /// A CRLF-terminated header or inline line, delimiter included.
    Header(Vec<u8>),
    /// A fixed-length bulk body (`bulk_len` payload bytes plus CRLF).
    Raw(Vec<u8>),
}

/// Decodes exactly one frame from the reader.
///
/// Pipelined input is handled by calling this in a loop over the same
/// buffered reader; each call starts with fresh per-frame state, which is
/// also how a protocol error discards a half-read frame.
pub async fn decode_frame<R>(reader: &mut R) -> Result<Reply, ParseError>
where R: AsyncBufRead + Unpin {
    let mut state = ReadState::default();
    loop {
        let line = read_line(reader, &mut state).await?;
        match line {
            Line::Header(msg) if !state.reading_multi_line => match msg[0] {
                b'*' => {
                    parse_multi_bulk_header(&msg, &mut state)?;
                    if state.expected_args_count == 0 {
                        return Ok(Reply::empty_multi_bulk());
                    }
                },
                b'$' => {
                    parse_bulk_header(&msg, &mut state)?;
                    if state.bulk_len == -1 {
                        return Ok(Reply::null_bulk());
                    }
                },
                _ => return parse_single_line(&msg),
            },
            line => {
                read_body(line, &mut state)?;
                if state.finished() {
                    let args = std::mem::take(&mut state.args);
                    return Ok(if state.msg_type == b'*' {
                        Reply::multi_bulk(args)
                    } else {
                        Reply::bulk(args.into_iter().next().unwrap_or_default())
                    });
                }
            },
        }
    }
}

fn protocol_err(msg: &[u8]) -> ParseError {
    ParseError::Protocol(String::from_utf8_lossy(msg).trim_end().to_string())
}

fn eof() -> ParseError {
    ParseError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "stream closed"))
}

async fn read_line<R>(reader: &mut R, state: &mut ReadState) -> Result<Line, ParseError>
where R: AsyncBufRead + Unpin {
    if state.bulk_len == 0 {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 || line.last() != Some(&b'\n') {
            return Err(eof());
        }
        if line.len() < 2 || line[line.len() - 2] != b'\r' {
            return Err(protocol_err(&line));
        }
        Ok(Line::Header(line))
    } else {
        // the pending bulk body is a fixed-length read, never a line read
        let mut buf = vec![0u8; state.bulk_len as usize + 2];
        reader.read_exact(&mut buf).await?;
        if buf[buf.len() - 2] != b'\r' || buf[buf.len() - 1] != b'\n' {
            return Err(protocol_err(&buf));
        }
        state.bulk_len = 0;
        Ok(Line::Raw(buf))
    }
}

fn parse_multi_bulk_header(msg: &[u8], state: &mut ReadState) -> Result<(), ParseError> {
    let expected = std::str::from_utf8(&msg[1..msg.len() - 2])
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| protocol_err(msg))?;
    if expected == 0 {
        state.expected_args_count = 0;
        return Ok(());
    }
    state.msg_type = msg[0];
    state.reading_multi_line = true;
    state.expected_args_count = expected as usize;
    state.args = Vec::with_capacity(expected as usize);
    Ok(())
}

fn parse_bulk_header(msg: &[u8], state: &mut ReadState) -> Result<(), ParseError> {
    let len = std::str::from_utf8(&msg[1..msg.len() - 2])
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| protocol_err(msg))?;
    match len {
        -1 => {
            state.bulk_len = -1;
            Ok(())
        },
        l if l > 0 => {
            state.bulk_len = l;
            state.msg_type = msg[0];
            state.reading_multi_line = true;
            state.expected_args_count = 1;
            state.args = Vec::with_capacity(1);
            Ok(())
        },
        _ => Err(protocol_err(msg)),
    }
}

fn parse_single_line(msg: &[u8]) -> Result<Reply, ParseError> {
    let text = String::from_utf8_lossy(msg);
    let line = text.trim_end_matches("\r\n");
    match msg[0] {
        b'+' => Ok(StatusReply::new(&line[1..]).into()),
        b'-' => Ok(ErrorReply::Generic(line[1..].to_string()).into()),
        b':' => {
            let code =
                line[1..].parse::<i64>().map_err(|_| protocol_err(msg))?;
            Ok(Reply::integer(code))
        },
        // anything else is an inline text command, split on single spaces
        _ => {
            let args = line.split(' ').map(|s| s.as_bytes().to_vec()).collect();
            Ok(Reply::multi_bulk(args))
        },
    }
}

fn read_body(line: Line, state: &mut ReadState) -> Result<(), ParseError> {
    match line {
        Line::Raw(msg) => {
            let mut arg = msg;
            arg.truncate(arg.len() - 2);
            state.args.push(arg);
        },
        Line::Header(msg) => {
            let line = &msg[..msg.len() - 2];
            if line.first() == Some(&b'$') {
                let len = std::str::from_utf8(&line[1..])
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| protocol_err(&msg))?;
                if len <= 0 {
                    // null or empty element inside a multi-bulk
                    state.args.push(Vec::new());
                    state.bulk_len = 0;
                } else {
                    state.bulk_len = len;
                }
            } else {
                state.args.push(line.to_vec());
            }
        },
    }
    Ok(())
}
