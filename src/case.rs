//! Default JSON:API member names for model fields and relationships.

/// snake_case model name -> camelCase member name.
/// e.g. "id_board_fk" -> "idBoardFk", "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = !out.is_empty();
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("title", "title")]
    #[case("created_at", "createdAt")]
    #[case("first_name", "firstName")]
    #[case("_private", "private")]
    #[case("double__underscore", "doubleUnderscore")]
    fn camel_case_members(#[case] field: &str, #[case] member: &str) {
        assert_eq!(to_camel_case(field), member);
    }
}
