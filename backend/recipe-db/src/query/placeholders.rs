use super::QueryBuildError;

/// Rewrite `?` placeholders to PostgreSQL's `$1, $2, ...`
///
/// Question marks inside single-quoted literals and double-quoted
/// identifiers are left alone. Fails when the number of placeholders does
/// not match `expected_args`.
pub fn rewrite_placeholders(sql: &str, expected_args: usize) -> Result<String, QueryBuildError> {
    let mut out = String::with_capacity(sql.len() + expected_args * 2);
    let mut in_literal = false;
    let mut in_identifier = false;
    let mut count = 0usize;

    for c in sql.chars() {
        match c {
            '\'' if !in_identifier => {
                in_literal = !in_literal;
                out.push(c);
            }
            '"' if !in_literal => {
                in_identifier = !in_identifier;
                out.push(c);
            }
            '?' if !in_literal && !in_identifier => {
                count += 1;
                out.push('$');
                out.push_str(&count.to_string());
            }
            _ => out.push(c),
        }
    }

    if in_literal || in_identifier {
        return Err(QueryBuildError::UnterminatedQuote);
    }

    if count != expected_args {
        return Err(QueryBuildError::PlaceholderMismatch {
            placeholders: count,
            args: expected_args,
        });
    }

    Ok(out)
}
