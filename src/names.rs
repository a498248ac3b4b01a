use std::fmt::Write;

/// Operator symbols which get a word name instead of the character encoding.
pub static OPERATOR_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "=" => "eq",
    "*" => "mul",
    "/" => "div",
    "+" => "add",
    "-" => "sub",
    "<" => "lt",
    "<=" => "lte",
    ">" => "gt",
    ">=" => "gte",
};

/// Maps a symbol name into an identifier made only of ASCII letters, digits
/// and underscores.
///
/// ASCII letters and `_` are kept, `-` becomes `_`, `?` becomes `_q`, and any
/// other character becomes `_` followed by its decimal code point. The mapping
/// is not injective: `a-b` and `a_b` both map to `a_b`.
pub fn sanitize(name: &str) -> String {
    if let Some(alias) = OPERATOR_ALIASES.get(name) {
        return (*alias).to_string();
    }
    let mut buf = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '_' => buf.push(c),
            '-' => buf.push('_'),
            '?' => buf.push_str("_q"),
            other => {
                // Infallible for `String`.
                _ = write!(buf, "_{}", u32::from(other));
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize() {
        let cases = [
            ("-", "sub"),
            ("+", "add"),
            ("<=", "lte"),
            (">=", "gte"),
            ("=", "eq"),
            ("list?", "list_q"),
            ("a-b", "a_b"),
            ("snake_case", "snake_case"),
            ("CamelCase", "CamelCase"),
            ("x1", "x_49"),
            ("set!", "set_33"),
            ("->", "__62"),
            ("==", "_61_61"),
            ("λ", "_955"),
        ];
        for (name, expected) in cases {
            assert_eq!(sanitize(name), expected, "name: {name}");
        }
    }

    #[test]
    fn test_sanitize_output_is_identifier_safe() {
        for name in ["a?b-c", "*earmuffs*", "<=>", "∀x", "1+", "a.b/c"] {
            let sanitized = sanitize(name);
            assert!(
                sanitized.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "{name} sanitized into {sanitized}"
            );
        }
    }
}
