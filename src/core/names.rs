//! Identifier helpers shared by the rule, binder and engines.
//!
//! Logic table names compare case-insensitively; rule lookups always go
//! through [`normalize_name`].

/// Lower-cased, unquoted form of an identifier used as a rule lookup key.
pub fn normalize_name(name: &str) -> String {
    unquote_identifier(name).to_lowercase()
}

/// Strips one level of `"..."`, `` `...` `` or `[...]` quoting.
pub fn unquote_identifier(name: &str) -> &str {
    let name = name.trim();
    let bytes = name.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        let quoted = matches!((first, last), (b'"', b'"') | (b'`', b'`') | (b'[', b']'));
        if quoted {
            return &name[1..name.len() - 1];
        }
    }
    name
}
