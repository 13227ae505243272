//! Safe SQL identifier handling.
//!
//! Table names, aliases and column names are never bound as parameters
//! (Postgres doesn't allow parameterizing identifiers), so every identifier is
//! rendered as a quoted identifier with `"` escaped as `""`. Aliases chosen at
//! runtime therefore cannot inject SQL.

/// Render a quoted identifier: `member` -> `"member"`, `we"ird` -> `"we""ird"`.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        // NUL cannot appear in a Postgres identifier.
        if ch != '\0' {
            out.push(ch);
        }
    }
    out.push('"');
    out
}

/// Render a qualified reference: `"alias"."column"`.
pub fn qualified(alias: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(alias), quote_ident(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_identifier() {
        assert_eq!(quote_ident("member"), "\"member\"");
    }

    #[test]
    fn escapes_embedded_quotes() {
        assert_eq!(quote_ident("a\"; DROP TABLE x; --"), "\"a\"\"; DROP TABLE x; --\"");
    }

    #[test]
    fn strips_nul() {
        assert_eq!(quote_ident("a\0b"), "\"ab\"");
    }

    #[test]
    fn qualified_reference() {
        assert_eq!(qualified("m", "age"), "\"m\".\"age\"");
    }
}
