use std::fmt;

/// Access token sent as a bearer credential on every TeamCity request.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

// Keep the secret out of logs and panic messages.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_trimmed() {
        let token = Token::from("  secret\n");
        assert_eq!(token.as_str(), "secret");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("secret".to_string());
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(debug, "Token(***)");
    }
}
