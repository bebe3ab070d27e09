//! Command-line tokenizer.
//!
//! Tokens are separated by spaces or tabs. A double quote toggles a quoted
//! span in which whitespace does not separate tokens; the quotes themselves
//! are dropped. Escaped quotes are not supported.

use crate::core::UpdaterError;

/// Split a raw command line into tokens.
///
/// # Errors
///
/// Returns [`UpdaterError::MalformedCommandLine`] when a quoted span is never closed.
///
/// # Examples
///
/// ```
/// use upkeep::cli::tokenize;
///
/// let tokens = tokenize(r#"-unzipTo app.exe "C:\my plugins" "Foo http://x/Foo.zip""#).unwrap();
/// assert_eq!(tokens, ["-unzipTo", "app.exe", r"C:\my plugins", "Foo http://x/Foo.zip"]);
/// ```
pub fn tokenize(line: &str) -> Result<Vec<String>, UpdaterError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    // A quoted span makes a token even when it is empty.
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            ' ' | '\t' if !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(UpdaterError::MalformedCommandLine {
            reason: "unterminated quoted argument".to_string(),
        });
    }
    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Quote a token so that [`tokenize`] reads it back unchanged.
#[must_use]
pub fn quote(token: &str) -> String {
    if token.is_empty() || token.contains([' ', '\t']) {
        format!("\"{token}\"")
    } else {
        token.to_string()
    }
}

/// Rebuild a single command line from already-split process arguments.
#[must_use]
pub fn join_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().map(|a| quote(a.as_ref())).collect::<Vec<_>>().join(" ")
}
