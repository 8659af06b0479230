//! Secure token manager with memory-safe handling and masking capabilities
//!
//! This module keeps the GitHub access token in a `secrecy` box so it never
//! shows up in `Debug` output, and masks it in wire traces.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;

/// Environment variable holding the access token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Secure holder for the GitHub access token
///
/// # Examples
///
/// ```
/// use release_publisher::security::SecureTokenManager;
///
/// let manager = SecureTokenManager::new("ghp_abcdef123456");
/// assert_eq!(manager.authorization_header(), "token ghp_abcdef123456");
/// assert_eq!(manager.mask_token("ghp_abcdef123456"), "ghp...456");
/// ```
pub struct SecureTokenManager {
    token: SecretString,
    /// Literal matcher for the token and its replacement; `None` for an empty token
    masking: Option<(Regex, String)>,
}

impl fmt::Debug for SecureTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureTokenManager")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl SecureTokenManager {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let masking = if token.is_empty() {
            None
        } else {
            Regex::new(&regex::escape(&token))
                .ok()
                .map(|pattern| (pattern, Self::mask(&token)))
        };

        Self {
            token: SecretString::from(token),
            masking,
        }
    }

    /// Reads the token from an environment map
    ///
    /// Returns `None` when the variable is unset or blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::security::SecureTokenManager;
    /// use std::collections::HashMap;
    ///
    /// let env = HashMap::from([("GITHUB_TOKEN".to_string(), "abc".to_string())]);
    /// assert!(SecureTokenManager::from_env(&env).is_some());
    /// assert!(SecureTokenManager::from_env(&HashMap::new()).is_none());
    /// ```
    pub fn from_env(env: &HashMap<String, String>) -> Option<Self> {
        let value = env.get(TOKEN_ENV_VAR)?.trim();
        if value.is_empty() {
            return None;
        }
        Some(Self::new(value))
    }

    /// Value of the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("token {}", self.token.expose_secret())
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    pub fn mask_token(&self, token: &str) -> String {
        Self::mask(token)
    }

    fn mask(token: &str) -> String {
        if token.len() < 10 || !token.is_char_boundary(3) || !token.is_char_boundary(token.len() - 3) {
            return "****".to_string();
        }

        let prefix = &token[..3];
        let suffix = &token[token.len() - 3..];
        format!("{}...{}", prefix, suffix)
    }

    /// Replaces every occurrence of the managed token in `text`
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::security::SecureTokenManager;
    ///
    /// let manager = SecureTokenManager::new("secret-token-12345");
    /// let masked = manager.mask_tokens_in_string("authorization: token secret-token-12345");
    /// assert_eq!(masked, "authorization: token sec...345");
    /// ```
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        match &self.masking {
            Some((pattern, masked)) => pattern
                .replace_all(text, regex::NoExpand(masked))
                .into_owned(),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_header_format() {
        let manager = SecureTokenManager::new("0123456789abcdef");
        assert_eq!(manager.authorization_header(), "token 0123456789abcdef");
    }

    #[test]
    fn test_from_env_returns_none_when_missing() {
        assert!(SecureTokenManager::from_env(&HashMap::new()).is_none());
    }

    #[test]
    fn test_from_env_returns_none_when_blank() {
        let env = HashMap::from([(TOKEN_ENV_VAR.to_string(), "   ".to_string())]);
        assert!(SecureTokenManager::from_env(&env).is_none());
    }

    #[test]
    fn test_from_env_trims_value() {
        let env = HashMap::from([(TOKEN_ENV_VAR.to_string(), " ghp_abc\n".to_string())]);
        let manager = SecureTokenManager::from_env(&env).unwrap();
        assert_eq!(manager.authorization_header(), "token ghp_abc");
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let manager = SecureTokenManager::new("super-secret-value");
        let debug = format!("{:?}", manager);
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_mask_token_with_short_token() {
        let manager = SecureTokenManager::new("x");
        assert_eq!(manager.mask_token("short"), "****");
        assert_eq!(manager.mask_token(""), "****");
    }

    #[test]
    fn test_mask_token_with_long_token() {
        let manager = SecureTokenManager::new("x");
        assert_eq!(manager.mask_token("abcdef123456"), "abc...456");
        assert_eq!(manager.mask_token("very-long-token-string"), "ver...ing");
    }

    #[test]
    fn test_mask_tokens_in_string_no_tokens() {
        let manager = SecureTokenManager::new("secret-token-12345");
        let input = "This is a safe string with no tokens";
        assert_eq!(manager.mask_tokens_in_string(input), input);
    }

    #[test]
    fn test_mask_tokens_in_string_masks_every_occurrence() {
        let manager = SecureTokenManager::new("repeat-token-98765");
        let dump = "authorization: token repeat-token-98765\r\n\r\n{\"echo\":\"repeat-token-98765\"}";

        let masked = manager.mask_tokens_in_string(dump);
        assert_eq!(masked.matches("rep...765").count(), 2);
        assert!(!masked.contains("repeat-token-98765"));
        assert_eq!(manager.mask_tokens_in_string(&masked), masked);
    }

    #[test]
    fn test_empty_token_leaves_text_untouched() {
        let manager = SecureTokenManager::new("");
        assert_eq!(manager.mask_tokens_in_string("token abc"), "token abc");
        assert!(!format!("{:?}", manager).is_empty());
    }

    #[test]
    fn test_mask_tokens_in_string_with_special_chars() {
        let manager = SecureTokenManager::new("tok.en+with*special$chars");
        let output = manager.mask_tokens_in_string("Authorization: token tok.en+with*special$chars");
        assert_eq!(output, "Authorization: token tok...ars");
    }
}
