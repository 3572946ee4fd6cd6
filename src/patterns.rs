//! Classifier patterns, compiled once and shared read-only across all parses.
//!
//! These run over the file's raw byte buffer (legacy sources are not reliably
//! UTF-8), so everything here is `regex::bytes`. The patterns deliberately do
//! not attempt grammatical correctness: they recognize the common shapes of
//! declaration headers and nothing more.

use regex::bytes::Regex;
use std::sync::LazyLock;

/// A C/C++ identifier, including `::`-qualified names.
const ID: &str = "[_a-zA-Z][_a-zA-Z0-9:]*";

/// `#define` directive, with optional space after the hash.
pub static DEFINE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A#\s*define\s+").unwrap());

/// `#else` directive.
pub static ELSE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A#\s*else").unwrap());

/// Line-anchored `#endif`, searched forward from an `#else`.
pub static ENDIF_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s*endif").unwrap());

/// User-defined type header: optional `typedef`, `struct`/`class`, a name,
/// and an optional base-class list running to end of line.
pub static UDT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)\A(typedef\s+)?(struct|class)\s+({ID})\s*(?::.*)?$")).unwrap()
});

/// Function header: return type, name, parameter list, optional trailing
/// `const`. The return-type class excludes operator characters so expressions
/// are not mistaken for declarations.
pub static FUNC_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\A((?:{ID})[^\-()=+!<>/|^]*?(?:\s+|\*|\?))({ID})\s*\(([^()]*?)\)(\s*const)?\s*\z"
    ))
    .unwrap()
});

/// Destructor header: optional `virtual`, `~name()`, empty or `void` params.
pub static DTOR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\A(?:virtual\s+)?~({ID})\s*\(\s*(?:void\s*)?\)\s*\z")).unwrap()
});

/// Constructor header: `name(params)` followed by an initializer-list `:`.
pub static CTOR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\A({ID})\s*\(([^()]*?)\)\s*(?::.*)\n?\z")).unwrap()
});

/// Trailing `throw(...)` exception specification, stripped before matching.
pub static THROW_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\s+throw\s*\(.*\)\s*\z").unwrap());

/// Access-specifier labels, stripped before matching.
pub static ACCESS_SPECIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(public|private|protected)\s*:\s*").unwrap());

/// Control-flow keywords that disqualify a header outright.
pub static RESERVED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A(for|do|while|if|else|switch|case|namespace)[^_a-zA-Z0-9]").unwrap()
});

// ---------------------------------------------------------------------------
// Parameter normalization
// ---------------------------------------------------------------------------

/// Convert a parameter (or return type) to a canonical textual form: `*` and
/// `&` spaced out, whitespace runs collapsed, `* *` re-merged to `**`.
pub fn norm_param(param: &str) -> String {
    let padded = param.replace('*', " * ").replace('&', " & ");
    let collapsed = padded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("* *", "**")
}
