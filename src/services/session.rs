use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::services::otp::{verify_code, OtpChallenge, OtpError};
use crate::services::validation;

/// Abandoned sessions are swept out after this long.
pub const SESSION_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignupStep {
    BasicInfo,
    AccountDetails,
    Birthday,
    Verification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Birthday {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignupError {
    #[error("{reason}")]
    ValidationFailed {
        field: &'static str,
        reason: &'static str,
    },
    #[error("Complete the previous step first")]
    StepOutOfOrder,
    #[error("This signup was already finalized")]
    AlreadyFinalized,
    #[error(transparent)]
    Otp(#[from] OtpError),
}

fn field_error(field: &'static str, reason: &'static str) -> SignupError {
    SignupError::ValidationFailed { field, reason }
}

/// Everything account creation needs, handed out once per signup.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Birthday,
    pub profile_photo: Option<String>,
}

/// In-memory aggregate for one in-progress signup. Fields accumulate
/// across the ordered steps and are committed to the account store only
/// after OTP verification, in a single snapshot.
#[derive(Debug)]
pub struct SignupSession {
    step: SignupStep,
    verified: bool,
    finalized: bool,
    token: Option<String>,
    profile_photo: Option<String>,
    first_name: String,
    last_name: String,
    email: String,
    username: String,
    password: String,
    birthday: Option<Birthday>,
    challenge: Option<OtpChallenge>,
}

impl SignupSession {
    pub fn new() -> Self {
        SignupSession {
            step: SignupStep::BasicInfo,
            verified: false,
            finalized: false,
            token: None,
            profile_photo: None,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            username: String::new(),
            password: String::new(),
            birthday: None,
            challenge: None,
        }
    }

    fn require(&self, step: SignupStep) -> Result<(), SignupError> {
        if self.step < step {
            return Err(SignupError::StepOutOfOrder);
        }
        Ok(())
    }

    /// Advancing never regresses: re-submitting an earlier step merges
    /// new values over old ones and keeps every later-step field.
    fn advance(&mut self, next: SignupStep) {
        self.step = self.step.max(next);
    }

    pub fn submit_basic_info(
        &mut self,
        first_name: &str,
        last_name: &str,
        profile_photo: Option<String>,
    ) -> Result<(), SignupError> {
        validation::validate_name(first_name).map_err(|r| field_error("first_name", r))?;
        validation::validate_name(last_name).map_err(|r| field_error("last_name", r))?;

        self.first_name = first_name.trim().to_string();
        self.last_name = last_name.trim().to_string();
        if profile_photo.is_some() {
            self.profile_photo = profile_photo;
        }
        self.advance(SignupStep::AccountDetails);
        Ok(())
    }

    pub fn submit_account_details(
        &mut self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SignupError> {
        self.require(SignupStep::AccountDetails)?;

        validation::validate_email_or_phone(email).map_err(|r| field_error("email", r))?;
        validation::validate_username(username).map_err(|r| field_error("username", r))?;
        validation::validate_password(password).map_err(|r| field_error("password", r))?;

        self.email = email.trim().to_string();
        self.username = username.trim().to_string();
        self.password = password.to_string();
        self.advance(SignupStep::Birthday);
        Ok(())
    }

    pub fn submit_birthday(&mut self, day: u32, month: u32, year: i32) -> Result<(), SignupError> {
        self.require(SignupStep::Birthday)?;

        validation::validate_birthday(month, day, year).map_err(|r| field_error("birthday", r))?;

        self.birthday = Some(Birthday { day, month, year });
        self.advance(SignupStep::Verification);
        Ok(())
    }

    /// Generates a fresh challenge for this session's email. The caller
    /// delivers it and only then calls [`store_challenge`]; a failed
    /// delivery leaves no code on record.
    ///
    /// [`store_challenge`]: SignupSession::store_challenge
    pub fn begin_verification(&mut self, now: DateTime<Utc>) -> Result<OtpChallenge, SignupError> {
        self.require(SignupStep::Verification)?;
        if self.finalized {
            return Err(SignupError::AlreadyFinalized);
        }
        Ok(OtpChallenge::issue(&self.email, now)?)
    }

    pub fn store_challenge(&mut self, challenge: OtpChallenge) {
        if let Some(old) = self.challenge.as_mut() {
            old.supersede();
        }
        self.challenge = Some(challenge);
    }

    /// A session that already passed verification hands back the same
    /// token again when the same code is re-entered; that is the retry
    /// path after a failed account write. Anything else falls through
    /// to [`verify_code`], so a malformed entry still reports
    /// `InvalidFormat` and a wrong one finds the challenge spent.
    pub fn verify_otp(&mut self, entered: &str, now: DateTime<Utc>) -> Result<String, SignupError> {
        self.require(SignupStep::Verification)?;
        if self.verified {
            if let (Some(token), Some(challenge)) = (&self.token, &self.challenge) {
                if entered == challenge.code {
                    return Ok(token.clone());
                }
            }
        }
        let token = verify_code(entered, self.challenge.as_mut(), now)?;
        self.verified = true;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Hands out the accumulated fields exactly once. If account
    /// creation later fails, [`reopen`] puts the snapshot back up for
    /// grabs so the attempt can be retried.
    ///
    /// [`reopen`]: SignupSession::reopen
    pub fn take_snapshot(&mut self) -> Result<AccountSnapshot, SignupError> {
        if !self.verified {
            return Err(SignupError::StepOutOfOrder);
        }
        if self.finalized {
            return Err(SignupError::AlreadyFinalized);
        }

        let birthday = self.birthday.ok_or(SignupError::StepOutOfOrder)?;
        self.finalized = true;

        Ok(AccountSnapshot {
            email: self.email.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birthday,
            profile_photo: self.profile_photo.clone(),
        })
    }

    pub fn reopen(&mut self) {
        self.finalized = false;
    }
}

impl Default for SignupSession {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry {
    created_at: DateTime<Utc>,
    session: Arc<Mutex<SignupSession>>,
}

/// Owns every in-flight signup. Each session sits behind its own mutex
/// so resend and verify for one session cannot interleave; results for
/// an abandoned session go nowhere because the id no longer resolves.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, now: DateTime<Utc>) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| now - entry.created_at <= Duration::minutes(SESSION_TTL_MINUTES));

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            Entry {
                created_at: now,
                session: Arc::new(Mutex::new(SignupSession::new())),
            },
        );
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<SignupSession>>> {
        self.sessions.lock().await.get(&id).map(|e| e.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_session() -> SignupSession {
        let mut s = SignupSession::new();
        s.submit_basic_info("Maya", "Chen", Some("file:///avatar.jpg".into()))
            .unwrap();
        s.submit_account_details("maya@example.com", "maya_c", "hunter2hunter2")
            .unwrap();
        s.submit_birthday(14, 3, 2000).unwrap();
        s
    }

    #[test]
    fn steps_must_run_in_order() {
        let mut s = SignupSession::new();
        assert_eq!(
            s.submit_account_details("a@b.com", "user_1", "password1"),
            Err(SignupError::StepOutOfOrder)
        );
        assert_eq!(s.submit_birthday(1, 1, 2000), Err(SignupError::StepOutOfOrder));
        assert!(s.begin_verification(Utc::now()).is_err());
    }

    #[test]
    fn invalid_field_blocks_the_step() {
        let mut s = SignupSession::new();
        let err = s.submit_basic_info("M", "Chen", None).unwrap_err();
        assert_eq!(
            err,
            SignupError::ValidationFailed {
                field: "first_name",
                reason: "Name must be at least 2 characters"
            }
        );
        // the failed step did not advance anything
        assert_eq!(
            s.submit_account_details("a@b.com", "user_1", "password1"),
            Err(SignupError::StepOutOfOrder)
        );
    }

    #[test]
    fn revisiting_an_earlier_step_keeps_later_fields() {
        let mut s = filled_session();
        s.submit_basic_info("Mia", "Chen", None).unwrap();

        let now = Utc::now();
        let challenge = s.begin_verification(now).unwrap();
        let code = challenge.code.clone();
        s.store_challenge(challenge);
        s.verify_otp(&code, now).unwrap();

        let snap = s.take_snapshot().unwrap();
        assert_eq!(snap.first_name, "Mia");
        assert_eq!(snap.email, "maya@example.com");
        assert_eq!(snap.username, "maya_c");
        assert_eq!(snap.birthday, Birthday { day: 14, month: 3, year: 2000 });
        // photo from the first submission survived the revisit
        assert_eq!(snap.profile_photo.as_deref(), Some("file:///avatar.jpg"));
    }

    #[test]
    fn full_flow_yields_one_snapshot() {
        let mut s = filled_session();
        let now = Utc::now();

        let challenge = s.begin_verification(now).unwrap();
        let code = challenge.code.clone();
        s.store_challenge(challenge);

        let token = s.verify_otp(&code, now).unwrap();
        assert!(token.starts_with("session_"));

        let snap = s.take_snapshot().unwrap();
        assert_eq!(snap.email, "maya@example.com");
        assert_eq!(snap.password, "hunter2hunter2");

        assert_eq!(s.take_snapshot().unwrap_err(), SignupError::AlreadyFinalized);
    }

    #[test]
    fn reopen_allows_retry_after_failed_creation() {
        let mut s = filled_session();
        let now = Utc::now();
        let challenge = s.begin_verification(now).unwrap();
        let code = challenge.code.clone();
        s.store_challenge(challenge);
        let token = s.verify_otp(&code, now).unwrap();

        s.take_snapshot().unwrap();
        s.reopen();
        // the retried verify hands back the same token for the same code
        assert_eq!(s.verify_otp(&code, now).unwrap(), token);
        assert!(s.take_snapshot().is_ok());
    }

    #[test]
    fn cached_token_requires_the_original_code() {
        let mut s = filled_session();
        let now = Utc::now();
        let challenge = s.begin_verification(now).unwrap();
        let code = challenge.code.clone();
        s.store_challenge(challenge);
        s.verify_otp(&code, now).unwrap();

        // a verified session still rejects garbage and wrong codes
        assert_eq!(
            s.verify_otp("x", now),
            Err(SignupError::Otp(OtpError::InvalidFormat))
        );
        let wrong = if code == "123456" { "654321" } else { "123456" };
        assert_eq!(
            s.verify_otp(wrong, now),
            Err(SignupError::Otp(OtpError::NoChallenge))
        );
    }

    #[test]
    fn resend_supersedes_previous_code() {
        let mut s = filled_session();
        let now = Utc::now();

        let first = s.begin_verification(now).unwrap();
        let old_code = first.code.clone();
        s.store_challenge(first);

        let second = s.begin_verification(now).unwrap();
        let new_code = second.code.clone();
        s.store_challenge(second);

        if old_code != new_code {
            assert_eq!(s.verify_otp(&old_code, now), Err(SignupError::Otp(OtpError::Mismatch)));
        }
        assert!(s.verify_otp(&new_code, now).is_ok());
    }

    #[test]
    fn verify_without_issuing_reports_no_challenge() {
        let mut s = filled_session();
        assert_eq!(
            s.verify_otp("123456", Utc::now()),
            Err(SignupError::Otp(OtpError::NoChallenge))
        );
    }

    #[tokio::test]
    async fn store_creates_resolves_and_prunes() {
        let store = SessionStore::new();
        let now = Utc::now();

        let id = store.create(now).await;
        assert!(store.get(id).await.is_some());
        assert!(store.remove(id).await);
        assert!(store.get(id).await.is_none());

        // a session created long ago is swept on the next create
        let stale = store.create(now - Duration::minutes(SESSION_TTL_MINUTES + 1)).await;
        let _fresh = store.create(now).await;
        assert!(store.get(stale).await.is_none());
    }

    #[tokio::test]
    async fn abandonment_is_visible_to_an_in_flight_finalize() {
        let store = SessionStore::new();
        let id = store.create(Utc::now()).await;

        // a finalizing handler holds the session's own mutex across
        // its database awaits
        let session = store.get(id).await.unwrap();
        let _guard = session.lock().await;

        // abandoning only takes the store lock, so it goes through
        // even while the session is held
        assert!(store.remove(id).await);

        // the finalizer's own remove then reports the session gone,
        // which is its cue to undo the commit
        assert!(!store.remove(id).await);
        assert!(store.get(id).await.is_none());
    }
}
