use std::fmt::Display;

/// Calls `f` for every value, inserting `separator` between the pieces that
/// actually wrote something.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Renders values as `[a, b, c]`, used when logging bound parameters.
pub fn display_list<T: Display>(values: impl IntoIterator<Item = T>) -> String {
    let mut out = String::from("[");
    separated_by(
        &mut out,
        values,
        |out, v| {
            out.push_str(&v.to_string());
        },
        ", ",
    );
    out.push(']');
    out
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..::std::cmp::min($query.len(), 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Formats a statement for error contexts and logs.
#[macro_export]
macro_rules! printable_query {
    ($query:expr) => {
        format_args!("```sql\n{}\n```", $crate::truncate_long!($query))
    };
}
