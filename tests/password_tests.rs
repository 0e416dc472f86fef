use pharma_assure_backend::util::password::*;
use std::collections::HashSet;

// Passwords paired with whether they pass the length rules
fn get_test_passwords() -> Vec<(String, bool)> {
    vec![
        ("ValidPass123!".to_string(), true),
        ("password".to_string(), true),         // Exactly the minimum
        ("short".to_string(), false),           // Too short
        ("1234567".to_string(), false),         // One below the minimum
        ("".to_string(), false),                // Empty
        ("        ".to_string(), false),        // Long enough but blank
        ("a".repeat(MAX_PASSWORD_LEN), true),   // Exactly the maximum
        ("a".repeat(MAX_PASSWORD_LEN + 1), false),
        ("pässwörd".to_string(), true),         // Counted in characters, not bytes
    ]
}

#[test]
fn test_hash_password_success() {
    let password = "test_password_123";
    let hash = PasswordUtilsImpl::hash_password(password).unwrap();

    assert!(!hash.is_empty());
    assert_ne!(hash, password);
    assert!(hash.starts_with("$argon2"));

    let parts: Vec<&str> = hash.split('$').collect();
    assert!(parts.len() >= 5, "Hash should have at least 5 parts separated by $");
}

#[test]
fn test_hash_password_empty_password() {
    // Empty passwords hash fine; validation is what rejects them
    let hash = PasswordUtilsImpl::hash_password("").unwrap();
    assert!(hash.starts_with("$argon2"));
}

#[test]
fn test_hash_password_unicode_characters() {
    let password = "mötDePässe🔒123";
    let hash = PasswordUtilsImpl::hash_password(password).unwrap();
    assert!(PasswordUtilsImpl::verify_password(password, &hash).unwrap());
}

#[test]
fn test_hash_password_different_results() {
    let password = "same_password_123";
    let hashes: HashSet<String> = (0..5)
        .map(|_| PasswordUtilsImpl::hash_password(password).unwrap())
        .collect();

    // Salts differ, so every hash differs
    assert_eq!(hashes.len(), 5);
    for hash in &hashes {
        assert!(PasswordUtilsImpl::verify_password(password, hash).unwrap());
    }
}

#[test]
fn test_verify_password_correct() {
    let password = "correct_horse_battery";
    let hash = PasswordUtilsImpl::hash_password(password).unwrap();
    assert!(PasswordUtilsImpl::verify_password(password, &hash).unwrap());
}

#[test]
fn test_verify_password_case_sensitive() {
    let hash = PasswordUtilsImpl::hash_password("CaseSensitive123").unwrap();
    assert!(!PasswordUtilsImpl::verify_password("casesensitive123", &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("CASESENSITIVE123", &hash).unwrap());
}

#[test]
fn test_verify_password_incorrect() {
    let hash = PasswordUtilsImpl::hash_password("right_password").unwrap();
    assert!(!PasswordUtilsImpl::verify_password("wrong_password", &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("", &hash).unwrap());
}

#[test]
fn test_verify_password_invalid_hash_format() {
    for bad_hash in ["", "plain-text", "not$a$phc$string"] {
        assert!(
            matches!(
                PasswordUtilsImpl::verify_password("anything", bad_hash),
                Err(PasswordError::InvalidHashFormat) | Err(PasswordError::VerificationFailed(_))
            ),
            "hash {:?} should be rejected",
            bad_hash
        );
    }
}

#[test]
fn test_validate_password_strength_with_test_data() {
    for (password, expected) in get_test_passwords() {
        assert_eq!(
            PasswordUtilsImpl::validate_password_strength(&password).is_ok(),
            expected,
            "unexpected result for password of length {}",
            password.chars().count()
        );
    }
}

#[test]
fn test_validate_password_strength_specific_errors() {
    let errors = PasswordUtilsImpl::validate_password_strength("abc").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("at least 8"));

    let errors = PasswordUtilsImpl::validate_password_strength(&"x".repeat(200)).unwrap_err();
    assert!(errors[0].contains("at most 128"));

    let errors = PasswordUtilsImpl::validate_password_strength("").unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.contains("blank")));
}

#[test]
fn test_password_workflow_integration() {
    let password = "Pharmacy2024!";
    assert!(PasswordUtilsImpl::validate_password_strength(password).is_ok());
    let hash = PasswordUtilsImpl::hash_password(password).unwrap();
    assert!(PasswordUtilsImpl::verify_password(password, &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("Pharmacy2025!", &hash).unwrap());
}
