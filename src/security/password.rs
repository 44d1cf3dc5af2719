use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Registration password policy: at least 6 characters with one lowercase,
/// one uppercase, and one digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordIssue {
    TooShort { min: usize, actual: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
}

impl PasswordIssue {
    pub fn message(&self) -> String {
        match self {
            Self::TooShort { min, actual } => {
                format!("Password must be at least {min} characters (currently {actual})")
            }
            Self::MissingUppercase => "Password must contain at least one uppercase letter".into(),
            Self::MissingLowercase => "Password must contain at least one lowercase letter".into(),
            Self::MissingDigit => "Password must contain at least one number".into(),
        }
    }
}

const MIN_PASSWORD_LENGTH: usize = 6;

pub fn validate_password(password: &str) -> Vec<PasswordIssue> {
    let mut issues = Vec::new();

    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        issues.push(PasswordIssue::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual: length,
        });
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        issues.push(PasswordIssue::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        issues.push(PasswordIssue::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(PasswordIssue::MissingDigit);
    }

    issues
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash format: {e}"))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("Password verification failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secur3pass").expect("Hash failed");
        assert!(verify_password("Secur3pass", &hash).expect("Verify failed"));
        assert!(!verify_password("WrongPassword1", &hash).expect("Verify failed"));
    }

    #[test]
    fn test_policy_accepts_valid_password() {
        assert!(validate_password("Abcdef1").is_empty());
    }

    #[test]
    fn test_policy_rejects_short_password() {
        let issues = validate_password("Ab1");
        assert!(issues.iter().any(|i| matches!(i, PasswordIssue::TooShort { .. })));
    }

    #[test]
    fn test_policy_requires_mixed_case_and_digit() {
        let issues = validate_password("alllowercase");
        assert!(issues.contains(&PasswordIssue::MissingUppercase));
        assert!(issues.contains(&PasswordIssue::MissingDigit));

        let issues = validate_password("ALLUPPERCASE1");
        assert!(issues.contains(&PasswordIssue::MissingLowercase));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }
}
