//! Client-side form validation. Failures here short-circuit before any
//! network call; the backend revalidates everything anyway.

pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_BYTES: usize = 72;

/// Structural email check: one '@', non-empty local and domain parts,
/// a dot in the domain, no whitespace anywhere.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    let invalid = || "Please enter a valid email address".to_string();

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(d) => d,
        None => return Err(invalid()),
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    // The domain must contain a dot with something on both sides.
    let mut labels = domain.split('.');
    if domain.split('.').count() < 2 || labels.any(str::is_empty) {
        return Err(invalid());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LENGTH
        ));
    }

    // Bcrypt on the backend truncates at 72 bytes, so reject past that.
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(format!(
            "Password is too long (maximum {} bytes)",
            PASSWORD_MAX_BYTES
        ));
    }

    Ok(())
}

pub fn validate_password_match(password: &str, confirm: &str) -> Result<(), String> {
    if password != confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

pub fn validate_required(label: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}
