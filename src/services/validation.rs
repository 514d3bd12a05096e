use chrono::{Datelike, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z\s'-]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^[\d\s\-\+\(\)]+$").unwrap();
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() < 2 {
        return Err("Name must be at least 2 characters");
    }
    if !NAME_RE.is_match(trimmed) {
        return Err("Name can only contain letters, spaces, hyphens, and apostrophes");
    }

    Ok(())
}

/// Accepts either an email address or a phone number with at least 10 digits.
pub fn validate_email_or_phone(value: &str) -> Result<(), &'static str> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err("Email or phone number is required");
    }
    if EMAIL_RE.is_match(trimmed) {
        return Ok(());
    }

    let digits_only: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if PHONE_RE.is_match(trimmed) && digits_only.len() >= 10 {
        return Ok(());
    }

    Err("Please enter a valid email or phone number")
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err("Username is required");
    }
    if trimmed.chars().count() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if !USERNAME_RE.is_match(trimmed) {
        return Err("Username can only contain letters, numbers, and underscores");
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("Password is required");
    }
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }

    Ok(())
}

/// Login form accepts an email or a username.
pub fn validate_email_or_username(value: &str) -> Result<(), &'static str> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err("Email or username is required");
    }
    if EMAIL_RE.is_match(trimmed) {
        return Ok(());
    }
    if trimmed.len() >= 3 && USERNAME_RE.is_match(trimmed) {
        return Ok(());
    }

    Err("Please enter a valid email or username")
}

pub fn validate_birthday(month: u32, day: u32, year: i32) -> Result<(), &'static str> {
    validate_birthday_at(month, day, year, Utc::now().date_naive())
}

/// Birthday must be a real calendar date, not in the future, and imply age >= 13.
pub fn validate_birthday_at(
    month: u32,
    day: u32,
    year: i32,
    today: NaiveDate,
) -> Result<(), &'static str> {
    // from_ymd_opt rejects impossible dates like Feb 30
    let birth_date = match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => return Err("Please select a valid date"),
    };

    if birth_date > today {
        return Err("Birthday cannot be in the future");
    }

    let mut age = today.year() - year;
    let month_diff = today.month() as i32 - month as i32;
    let day_diff = today.day() as i32 - day as i32;

    if month_diff < 0 || (month_diff == 0 && day_diff < 0) {
        age -= 1;
    }

    if age < 13 {
        return Err("You must be at least 13 years old to sign up");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(validate_name("Anna-Marie O'Neil").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(" a ").is_err());
        assert!(validate_name("R2D2").is_err());
    }

    #[test]
    fn email_or_phone() {
        assert!(validate_email_or_phone("a@b.com").is_ok());
        assert!(validate_email_or_phone("+1 (555) 123-4567").is_ok());
        assert!(validate_email_or_phone("555-123").is_err());
        assert!(validate_email_or_phone("not an email").is_err());
        assert!(validate_email_or_phone("").is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("ab_3").is_ok());
        assert!(validate_username("bad name").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough1").is_ok());
        // seven characters is seven characters, whatever the byte count
        assert!(validate_password("pääääää").is_err());
        assert!(validate_password("pääääää1").is_ok());
    }

    #[test]
    fn email_or_username_rules() {
        assert!(validate_email_or_username("a@b.com").is_ok());
        assert!(validate_email_or_username("some_user").is_ok());
        assert!(validate_email_or_username("ab").is_err());
    }

    #[test]
    fn birthday_rejects_impossible_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(validate_birthday_at(2, 30, 2000, today).is_err());
    }

    #[test]
    fn birthday_rejects_future() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(validate_birthday_at(1, 1, 2030, today).is_err());
    }

    #[test]
    fn birthday_age_boundary() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        // exactly 13 today
        assert!(validate_birthday_at(8, 30, 2013, today).is_ok());
        // turns 13 tomorrow
        assert!(validate_birthday_at(8, 31, 2013, today).is_err());
        // month borrow: born in a later month of the same year
        assert!(validate_birthday_at(9, 1, 2013, today).is_err());
        assert!(validate_birthday_at(7, 31, 2013, today).is_ok());
    }
}
