use std::error::Error as StdError;

use mongodb::error::{Error, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};

use crate::error::PersistError;

const DUPLICATE_KEY: i32 = 11000;

/// Whether `err`, or any error in its `source()` chain, is a duplicate key
/// violation on the named index.
///
/// The driver can hand back the server error wrapped in another error, so
/// every link of the chain is inspected, not just the top-level one.
pub(crate) fn violates_unique_index(err: &Error, index_name: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(mongo) = e.downcast_ref::<Error>() {
            if duplicate_key_message(mongo).is_some_and(|m| m.contains(index_name)) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

fn duplicate_key_message(err: &Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.as_str())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => Some(e.message.as_str()),
        _ => None,
    }
}

/// Transaction aborted by a write conflict or failover; safe to rerun
pub(crate) fn is_transient(err: &PersistError) -> bool {
    matches!(err, PersistError::Database(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR))
}
