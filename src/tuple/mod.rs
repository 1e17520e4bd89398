use std::collections::HashMap;

use self::value::Value;

pub mod schema;
pub mod value;

/// A row maps column names to values. It is "full" once it holds exactly the declared columns of a table.
pub type Row = HashMap<String, Value>;

/// Builds a row from (column, value) pairs.
pub fn row<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Row {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_owned(), value))
        .collect()
}
