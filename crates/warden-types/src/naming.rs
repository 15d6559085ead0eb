//! Storage-column naming convention.

/// Converts an entity or field name to its storage-column form.
///
/// An underscore is inserted before an uppercase letter that follows a
/// lowercase letter or digit, and before the last capital of an acronym
/// when a lowercase letter follows it. The result is lowercased. Dots are
/// kept so nested paths (`profile.createdAt`) convert segment by segment.
///
/// ```
/// use warden_types::to_snake_case;
///
/// assert_eq!(to_snake_case("createdAt"), "created_at");
/// assert_eq!(to_snake_case("UserAPIKeys"), "user_api_keys");
/// assert_eq!(to_snake_case("already_snake"), "already_snake");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}
