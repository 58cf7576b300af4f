//! Shared string utilities.

/// Check if a name is snake_case (e.g., "load_config", "v2")
pub fn is_snake_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    let mut prev_underscore = false;
    for c in chars {
        if c == '_' {
            if prev_underscore {
                return false;
            }
            prev_underscore = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_underscore = false;
        } else {
            return false;
        }
    }
    true
}

/// Check if a name is PascalCase (e.g., "Point", "HttpClient")
pub fn is_pascal_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// Convert a TOML value to its string representation
pub fn toml_value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_snake_case() {
        assert!(is_snake_case("main"));
        assert!(is_snake_case("load_config"));
        assert!(is_snake_case("_private"));
        assert!(is_snake_case("v2_api"));
        assert!(!is_snake_case(""));
        assert!(!is_snake_case("loadConfig"));
        assert!(!is_snake_case("Load"));
        assert!(!is_snake_case("double__underscore"));
    }

    #[test]
    fn test_is_pascal_case() {
        assert!(is_pascal_case("Point"));
        assert!(is_pascal_case("HttpClient2"));
        assert!(!is_pascal_case("point"));
        assert!(!is_pascal_case("Http_Client"));
        assert!(!is_pascal_case(""));
    }

    #[test]
    fn test_toml_value_to_string() {
        assert_eq!(toml_value_to_string(&toml::Value::Integer(3)), "3");
        assert_eq!(toml_value_to_string(&toml::Value::Boolean(true)), "true");
        assert_eq!(
            toml_value_to_string(&toml::Value::String("get_".into())),
            "get_"
        );
        assert_eq!(toml_value_to_string(&toml::Value::Array(vec![])), "");
    }
}
