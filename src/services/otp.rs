use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

pub const OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("Email or phone number is required")]
    EmailInvalid,
    #[error("Code must be exactly 6 digits")]
    InvalidFormat,
    #[error("No verification code was requested")]
    NoChallenge,
    #[error("This code has expired, request a new one")]
    Expired,
    #[error("Incorrect code, check your email and try again")]
    Mismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Active,
    Consumed,
    Superseded,
}

/// One issued code and its verification window.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub destination: String,
    pub state: ChallengeState,
}

impl OtpChallenge {
    pub fn issue(destination: &str, now: DateTime<Utc>) -> Result<Self, OtpError> {
        if destination.trim().is_empty() {
            return Err(OtpError::EmailInvalid);
        }

        let code = format!("{}", rand::thread_rng().gen_range(100000..=999999));

        Ok(OtpChallenge {
            code,
            issued_at: now,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            destination: destination.trim().to_string(),
            state: ChallengeState::Active,
        })
    }

    /// A new issue replaces this challenge; its code must stop working.
    pub fn supersede(&mut self) {
        self.state = ChallengeState::Superseded;
    }
}

/// Checks run in fixed order: format, presence, expiry, match.
/// A consumed or superseded challenge counts as no challenge on record,
/// so a replayed code fails even inside the original window.
pub fn verify_code(
    entered: &str,
    challenge: Option<&mut OtpChallenge>,
    now: DateTime<Utc>,
) -> Result<String, OtpError> {
    if entered.len() != 6 || !entered.chars().all(|c| c.is_ascii_digit()) {
        return Err(OtpError::InvalidFormat);
    }

    let challenge = match challenge {
        Some(c) if c.state == ChallengeState::Active => c,
        _ => return Err(OtpError::NoChallenge),
    };

    if now > challenge.expires_at {
        return Err(OtpError::Expired);
    }
    if entered != challenge.code {
        return Err(OtpError::Mismatch);
    }

    challenge.state = ChallengeState::Consumed;
    Ok(mint_token())
}

fn mint_token() -> String {
    // opaque session token; a real deployment would mint a signed credential
    format!("session_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn code_is_six_digits() {
        for _ in 0..50 {
            let c = OtpChallenge::issue("a@b.com", now()).unwrap();
            assert_eq!(c.code.len(), 6);
            assert!(c.code.chars().all(|ch| ch.is_ascii_digit()));
            let value: u32 = c.code.parse().unwrap();
            assert!((100000..=999999).contains(&value));
        }
    }

    #[test]
    fn expiry_is_ten_minutes() {
        let t = now();
        let c = OtpChallenge::issue("a@b.com", t).unwrap();
        assert_eq!(c.issued_at, t);
        assert_eq!(c.expires_at, t + Duration::minutes(10));
    }

    #[test]
    fn empty_destination_rejected() {
        assert_eq!(OtpChallenge::issue("  ", now()).unwrap_err(), OtpError::EmailInvalid);
    }

    #[test]
    fn format_checked_first() {
        // bad format wins even with no challenge at all
        assert_eq!(verify_code("12345", None, now()), Err(OtpError::InvalidFormat));
        assert_eq!(verify_code("12345a", None, now()), Err(OtpError::InvalidFormat));
        assert_eq!(verify_code("1234567", None, now()), Err(OtpError::InvalidFormat));
        assert_eq!(verify_code("123456", None, now()), Err(OtpError::NoChallenge));
    }

    #[test]
    fn happy_path_then_replay_rejected() {
        let t = now();
        let mut c = OtpChallenge::issue("a@b.com", t).unwrap();
        let code = c.code.clone();

        let token = verify_code(&code, Some(&mut c), t).unwrap();
        assert!(token.starts_with("session_"));
        assert_eq!(c.state, ChallengeState::Consumed);

        // same code again: the challenge is spent
        assert_eq!(verify_code(&code, Some(&mut c), t), Err(OtpError::NoChallenge));
    }

    #[test]
    fn mismatch() {
        let t = now();
        let mut c = OtpChallenge::issue("a@b.com", t).unwrap();
        let wrong = if c.code == "123456" { "654321" } else { "123456" };
        assert_eq!(verify_code(wrong, Some(&mut c), t), Err(OtpError::Mismatch));
        // a wrong guess does not consume the challenge
        assert_eq!(c.state, ChallengeState::Active);
    }

    #[test]
    fn expired_wins_over_mismatch() {
        let t = now();
        let mut c = OtpChallenge::issue("a@b.com", t).unwrap();
        let late = t + Duration::minutes(11);
        assert_eq!(verify_code("000000", Some(&mut c), late), Err(OtpError::Expired));
        let code = c.code.clone();
        assert_eq!(verify_code(&code, Some(&mut c), late), Err(OtpError::Expired));
    }

    #[test]
    fn boundary_is_inclusive() {
        let t = now();
        let mut c = OtpChallenge::issue("a@b.com", t).unwrap();
        let code = c.code.clone();
        let at_expiry = c.expires_at;
        assert!(verify_code(&code, Some(&mut c), at_expiry).is_ok());
    }

    #[test]
    fn superseded_code_rejected() {
        let t = now();
        let mut old = OtpChallenge::issue("a@b.com", t).unwrap();
        old.supersede();
        let code = old.code.clone();
        assert_eq!(verify_code(&code, Some(&mut old), t), Err(OtpError::NoChallenge));
    }
}
