/*! Utility methods and type aliases shared by the parsers and catalogs. */

pub mod errors;

/// A [`HashMap`](std::collections::HashMap) with [`rustc_hash::FxBuildHasher`] as hasher.
pub type HMap<A,B> = rustc_hash::FxHashMap<A,B>;
/// A [`HashSet`](std::collections::HashSet) with [`rustc_hash::FxBuildHasher`] as hasher.
pub type HSet<A> = rustc_hash::FxHashSet<A>;

/// Splits `s` at every `delim`, trimming each part and dropping empty ones.
/// `"a| b||c"` with `'|'` gives `["a","b","c"]`.
pub fn vector_from_string(s:&str,delim:char) -> Vec<String> {
    s.split(delim).map(str::trim).filter(|p| !p.is_empty()).map(ToString::to_string).collect()
}

/// The inverse of [`vector_from_string`].
pub fn string_from_vector<S:AsRef<str>>(v:&[S],delim:&str) -> String {
    v.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(delim)
}

/// Style and inset names may use `_` in place of spaces in layout files.
pub fn normalize_name(s:&str) -> String { s.replace('_'," ") }

/// Splits `s` at the first `delim` into `(before,after)`; without a delimiter,
/// the whole string is the first part.
pub fn split_once_or_all(s:&str,delim:char) -> (&str,&str) {
    match s.find(delim) {
        Some(i) => (&s[..i],&s[i+delim.len_utf8()..]),
        None => (s,"")
    }
}

/// Quotes a catalog field so that the [`Lexer`](crate::lexer::Lexer) reads it back as a single
/// token when escapes are enabled.
pub fn quote(s:&str) -> String {
    let mut ret = String::with_capacity(s.len() + 2);
    ret.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' { ret.push('\\') }
        ret.push(c);
    }
    ret.push('"');
    ret
}
