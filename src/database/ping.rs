// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    database::db::Db,
    resp::reply::{ErrorReply, Reply},
};

pub fn cmd_ping(_db: &Db, args: &[Vec<u8>]) -> Reply {
    match args {
        [] => Reply::pong(),
        [message] => Reply::status(String::from_utf8_lossy(message)),
        _ => ErrorReply::ArgNum("ping".into()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_echoes() {
        let db = Db::new(0);
        assert_eq!(cmd_ping(&db, &[]), Reply::pong());
        assert_eq!(cmd_ping(&db, &[b"hi".to_vec()]), Reply::status("hi"));
        assert!(cmd_ping(&db, &[b"a".to_vec(), b"b".to_vec()]).is_error());
    }
}
