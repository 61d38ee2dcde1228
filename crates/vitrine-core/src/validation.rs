//! Client-side format checks run before any network call.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Minimum password length accepted by the backend
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the "special character" password rule
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Minimum length of a display name
const MIN_NAME_LENGTH: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must have 8+ characters, 1 uppercase, 1 lowercase, 1 number and 1 special character")]
    WeakPassword,

    #[error("You must accept the terms of use")]
    TermsNotAccepted,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid CPF")]
    InvalidCpf,

    #[error("Phone must be in the format (00) 00000-0000")]
    InvalidPhone,

    #[error("Name must have at least 3 letters and contain only letters and spaces")]
    InvalidName,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(\d{2}\) \d{5}-\d{4}$").expect("valid phone pattern"))
}

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword)
    }
}

/// Confirmation must match before strength is checked
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    validate_password(password)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email_regex().is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    let valid = name.chars().count() >= MIN_NAME_LENGTH
        && name.chars().all(|c| c.is_alphabetic() || c.is_whitespace());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidName)
    }
}

/// Check a CPF number (formatting characters are ignored)
pub fn is_valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = sum % 11;
        if rest < 2 {
            0
        } else {
            11 - rest
        }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}

pub fn validate_cpf(cpf: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(cpf) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCpf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength() {
        assert!(is_strong_password("Abcdef1!"));
        assert!(is_strong_password("Senh@Forte2024"));

        assert!(!is_strong_password("Abc1!")); // too short
        assert!(!is_strong_password("abcdefg1!")); // no uppercase
        assert!(!is_strong_password("ABCDEFG1!")); // no lowercase
        assert!(!is_strong_password("Abcdefgh!")); // no digit
        assert!(!is_strong_password("Abcdefgh1")); // no special
        assert!(!is_strong_password("Abcdefg1_")); // underscore is not in the special set
    }

    #[test]
    fn test_new_password_checks_match_first() {
        assert_eq!(
            validate_new_password("weak", "other"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            validate_new_password("weak", "weak"),
            Err(ValidationError::WeakPassword)
        );
        assert_eq!(validate_new_password("Abcdef1!", "Abcdef1!"), Ok(()));
    }

    #[test]
    fn test_email_format() {
        assert!(validate_email("maria@loja.com.br").is_ok());
        assert!(validate_email("  maria@loja.com  ").is_ok());
        assert!(validate_email("maria@loja").is_err());
        assert!(validate_email("maria loja@x.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_phone_format() {
        assert!(validate_phone("(11) 98765-4321").is_ok());
        assert!(validate_phone("11987654321").is_err());
        assert!(validate_phone("(11) 8765-4321").is_err());
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("José da Silva").is_ok());
        assert!(validate_name("Jo").is_err());
        assert!(validate_name("R2D2 Unit").is_err());
    }

    #[test]
    fn test_cpf_check_digits() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("529.982.247-26"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("1234567890"));
    }
}
