//! Identifier casing.

/// Upper-cases the first character when it is ASCII, leaving the rest untouched.
///
/// This is the rule used for abbreviated `by<Field>` shortcuts: `id` becomes
/// `Id`, `userId` becomes `UserId`, and a non-ASCII first character is kept as is.
#[must_use]
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(name.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}

/// Converts a `snake_case` Rust identifier into `camelCase`.
///
/// Leading underscores are preserved so `__typename` stays intact.
#[must_use]
pub fn to_camel_case(ident: &str) -> String {
    let trimmed = ident.trim_start_matches('_');
    let prefix = &ident[..ident.len() - trimmed.len()];

    let mut out = String::with_capacity(ident.len());
    out.push_str(prefix);
    let mut upper_next = false;
    for c in trimmed.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("id"), "Id");
        assert_eq!(capitalize_first("userId"), "UserId");
        assert_eq!(capitalize_first("Input"), "Input");
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("énum"), "énum");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("registered_at"), "registeredAt");
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_camel_case("author_id_value"), "authorIdValue");
        assert_eq!(to_camel_case("__typename"), "__typename");
    }
}
