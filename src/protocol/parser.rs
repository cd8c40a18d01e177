//! Text command parser
//!
//! Turns one line of user input into a `Request`.
//!
//! ```text
//! INSERT <collection> <json>
//! FIND   <collection> [filter_json]
//! UPDATE <collection> <filter_json> <update_json>
//! DELETE <collection> <filter_json>
//! COUNT  <collection> [filter_json]
//! SORT   <collection> <sort_key>
//! SAVE
//! LIST_COLLECTIONS
//! ```
//! The command word is case-insensitive. JSON arguments are read as a stream
//! of values, so they may contain spaces.

use serde_json::Value;

use crate::error::{DocStoreError, Result};
use crate::store::Record;

use super::Request;

const INSERT_USAGE: &str = "usage: INSERT <collection> <json_data>";
const FIND_USAGE: &str = "usage: FIND <collection> [filter_json]";
const UPDATE_USAGE: &str = "usage: UPDATE <collection> <filter_json> <update_json>";
const DELETE_USAGE: &str = "usage: DELETE <collection> <filter_json>";
const COUNT_USAGE: &str = "usage: COUNT <collection> [filter_json]";
const SORT_USAGE: &str = "usage: SORT <collection> <sort_key>";

/// Parse a command line; blank input yields `None`
pub fn parse_command(input: &str) -> Result<Option<Request>> {
    let (word, rest) = split_word(input);
    if word.is_empty() {
        return Ok(None);
    }

    let request = match word.to_ascii_uppercase().as_str() {
        "INSERT" => {
            let (collection, args) = collection_and_objects(rest, INSERT_USAGE)?;
            let [record] = exactly::<1>(args, INSERT_USAGE)?;
            Request::Insert { collection, record }
        }
        "FIND" => {
            let (collection, args) = collection_and_objects(rest, FIND_USAGE)?;
            let filter = optional(args, FIND_USAGE)?;
            Request::Find { collection, filter }
        }
        "UPDATE" => {
            let (collection, args) = collection_and_objects(rest, UPDATE_USAGE)?;
            let [filter, patch] = exactly::<2>(args, UPDATE_USAGE)?;
            Request::Update {
                collection,
                filter,
                patch,
            }
        }
        "DELETE" => {
            let (collection, args) = collection_and_objects(rest, DELETE_USAGE)?;
            let [filter] = exactly::<1>(args, DELETE_USAGE)?;
            Request::Delete { collection, filter }
        }
        "COUNT" => {
            let (collection, args) = collection_and_objects(rest, COUNT_USAGE)?;
            let filter = optional(args, COUNT_USAGE)?;
            Request::Count { collection, filter }
        }
        "SORT" => {
            let (collection, rest) = split_word(rest);
            let (key, extra) = split_word(rest);
            if collection.is_empty() || key.is_empty() || !extra.trim().is_empty() {
                return Err(DocStoreError::Parse(SORT_USAGE.to_string()));
            }
            Request::Sort {
                collection: collection.to_string(),
                key: key.to_string(),
            }
        }
        "SAVE" => no_arguments(rest, "SAVE", Request::SaveSnapshot)?,
        "LIST_COLLECTIONS" => no_arguments(rest, "LIST_COLLECTIONS", Request::ListCollections)?,
        other => {
            return Err(DocStoreError::Parse(format!("unknown command: {}", other)));
        }
    };

    Ok(Some(request))
}

/// Parse a single JSON object, e.g. a record, filter, or patch
pub fn parse_object(text: &str, what: &str) -> Result<Record> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DocStoreError::Parse(format!("invalid {} JSON: {}", what, e)))?;
    into_object(value, what)
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, ""),
    }
}

fn collection_and_objects(rest: &str, usage: &str) -> Result<(String, Vec<Record>)> {
    let (collection, rest) = split_word(rest);
    if collection.is_empty() {
        return Err(DocStoreError::Parse(usage.to_string()));
    }

    let objects = serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .map(|value| {
            let value = value.map_err(|e| DocStoreError::Parse(format!("invalid JSON: {}", e)))?;
            into_object(value, "argument")
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((collection.to_string(), objects))
}

fn into_object(value: Value, what: &str) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DocStoreError::Parse(format!(
            "{} must be a JSON object, got {}",
            what, other
        ))),
    }
}

fn exactly<const N: usize>(args: Vec<Record>, usage: &str) -> Result<[Record; N]> {
    args.try_into()
        .map_err(|_| DocStoreError::Parse(usage.to_string()))
}

fn optional(mut args: Vec<Record>, usage: &str) -> Result<Record> {
    match args.len() {
        0 => Ok(Record::new()),
        1 => Ok(args.remove(0)),
        _ => Err(DocStoreError::Parse(usage.to_string())),
    }
}

fn no_arguments(rest: &str, command: &str, request: Request) -> Result<Request> {
    if rest.trim().is_empty() {
        Ok(request)
    } else {
        Err(DocStoreError::Parse(format!("{} takes no arguments", command)))
    }
}
