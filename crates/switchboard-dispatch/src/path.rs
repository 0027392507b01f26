//! Command name normalisation.
//!
//! Command names are stored as a lowercase segment path. Declarations may
//! separate segments with spaces or dots (`"basic add"`, `"basic.add"`); the
//! canonical string form joins segments with a single space, which is also
//! the form the router produces from an event.

/// Splits a declared or routed name into lowercase segments.
///
/// Runs of separators collapse, so `"  Basic..Add "` becomes
/// `["basic", "add"]`. An empty or separator-only name yields no segments.
pub fn string_to_path(name: &str) -> Vec<String> {
    name.split(|c: char| c.is_whitespace() || c == '.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Joins segments into the canonical space-separated form.
pub fn path_to_string(path: &[String]) -> String {
    path.join(" ")
}

/// Canonical form of an arbitrary name string.
pub fn normalize(name: &str) -> String {
    path_to_string(&string_to_path(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_path() {
        assert_eq!(string_to_path("basic add"), vec!["basic", "add"]);
        assert_eq!(string_to_path("Basic.Add"), vec!["basic", "add"]);
        assert_eq!(string_to_path("  a   b\tc "), vec!["a", "b", "c"]);
        assert_eq!(string_to_path(""), Vec::<String>::new());
        assert_eq!(string_to_path(" . "), Vec::<String>::new());
    }

    #[test]
    fn test_path_to_string() {
        assert_eq!(path_to_string(&["basic".into(), "add".into()]), "basic add");
        assert_eq!(path_to_string(&["ping".into()]), "ping");
        assert_eq!(path_to_string(&[]), "");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("PARENT.Child"), "parent child");
    }
}
