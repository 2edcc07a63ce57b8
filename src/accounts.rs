//! Mock player accounts: registration, login, session and profile edits
//!
//! Accounts live in a [`KeyValueStore`]: the active session profile under
//! [`SESSION_KEY`] and every registered account under [`ACCOUNTS_KEY`].

use crate::errors::{AuthError, FieldErrors, HeyBetError, HeyBetResult, StorageError, ValidationError};
use crate::store::{load_json, store_json, KeyValueStore};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_KEY: &str = "heybet_user";
pub const ACCOUNTS_KEY: &str = "heybet_users";

pub const MINIMUM_AGE: i32 = 18;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// A registered profile plus its password digest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccount {
    pub profile: UserProfile,
    pub password_digest: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub name: String,
    pub cpf: String,
    pub phone: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    pub profile_image: Option<String>,
}

/// Fields left as `None` keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
}

pub struct AuthService<S> {
    store: S,
    session: Option<UserProfile>,
}

impl<S: KeyValueStore> AuthService<S> {
    pub fn new(store: S) -> Self {
        Self { store, session: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Pick up a session persisted by an earlier run; unreadable data is discarded
    pub fn restore_session(&mut self) -> HeyBetResult<Option<&UserProfile>> {
        match load_json::<UserProfile>(&self.store, SESSION_KEY) {
            Ok(profile) => self.session = profile,
            Err(HeyBetError::Storage(StorageError::CorruptedData { reason, .. })) => {
                warn!(key = SESSION_KEY, %reason, "Discarding unreadable session");
                self.store.remove(SESSION_KEY)?;
                self.session = None;
            }
            Err(e) => return Err(e),
        }
        Ok(self.session.as_ref())
    }

    pub fn accounts(&self) -> HeyBetResult<Vec<StoredAccount>> {
        Ok(load_json(&self.store, ACCOUNTS_KEY)?.unwrap_or_default())
    }

    pub fn register(&mut self, form: &RegistrationForm, today: NaiveDate) -> HeyBetResult<&UserProfile> {
        let birth_date = validate_registration(form, today)?;
        let email = normalize_email(&form.email);

        let mut accounts = self.accounts()?;
        if accounts.iter().any(|account| account.profile.email == email) {
            return Err(AuthError::AccountExists(email).into());
        }

        let profile = UserProfile {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            name: form.name.trim().to_string(),
            cpf: form.cpf.trim().to_string(),
            phone: form.phone.trim().to_string(),
            birth_date,
            is_verified: false,
            created_at: Utc::now(),
            profile_image: form.profile_image.clone(),
        };
        accounts.push(StoredAccount {
            profile: profile.clone(),
            password_digest: password_digest(&email, &form.password),
        });

        store_json(&mut self.store, ACCOUNTS_KEY, &accounts)?;
        info!(user_id = %profile.id, %email, "Account registered");
        self.start_session(profile)
    }

    pub fn login(&mut self, email: &str, password: &str) -> HeyBetResult<&UserProfile> {
        let mut errors = FieldErrors::new();
        check_credentials(&mut errors, email, password);
        errors.into_result()?;

        let email = normalize_email(email);
        let digest = password_digest(&email, password);
        let profile = self
            .accounts()?
            .into_iter()
            .find(|account| account.profile.email == email && account.password_digest == digest)
            .map(|account| account.profile)
            .ok_or(AuthError::InvalidCredentials)?;

        info!(user_id = %profile.id, "Logged in");
        self.start_session(profile)
    }

    pub fn logout(&mut self) -> HeyBetResult<()> {
        self.store.remove(SESSION_KEY)?;
        if let Some(profile) = self.session.take() {
            info!(user_id = %profile.id, "Logged out");
        }
        Ok(())
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) -> HeyBetResult<&UserProfile> {
        let mut profile = self.session.clone().ok_or(AuthError::NotAuthenticated)?;

        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(cpf) = update.cpf {
            profile.cpf = cpf;
        }
        if let Some(phone) = update.phone {
            profile.phone = phone;
        }
        if update.profile_image.is_some() {
            profile.profile_image = update.profile_image;
        }

        let mut accounts = self.accounts()?;
        if let Some(account) = accounts.iter_mut().find(|a| a.profile.id == profile.id) {
            account.profile = profile.clone();
            store_json(&mut self.store, ACCOUNTS_KEY, &accounts)?;
        }

        self.start_session(profile)
    }

    fn start_session(&mut self, profile: UserProfile) -> HeyBetResult<&UserProfile> {
        store_json(&mut self.store, SESSION_KEY, &profile)?;
        Ok(&*self.session.insert(profile))
    }
}

/// Check every registration field, returning the parsed birth date
pub fn validate_registration(form: &RegistrationForm, today: NaiveDate) -> HeyBetResult<NaiveDate> {
    let mut errors = FieldErrors::new();
    check_credentials(&mut errors, &form.email, &form.password);

    if form.name.trim().is_empty() {
        errors.add("name", "Name is required");
    }
    if form.cpf.trim().is_empty() {
        errors.add("cpf", "CPF is required");
    }
    if form.phone.trim().is_empty() {
        errors.add("phone", "Phone is required");
    }

    let birth_date = match parse_birth_date(&form.birth_date, today) {
        Ok(date) => Some(date),
        Err(message) => {
            errors.add("birth_date", message);
            None
        }
    };

    match birth_date {
        Some(date) if errors.is_empty() => Ok(date),
        _ => Err(ValidationError::Fields(errors).into()),
    }
}

fn parse_birth_date(input: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Birth date is required".to_string());
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| "Birth date must be YYYY-MM-DD".to_string())?;
    if age_on(date, today) < MINIMUM_AGE {
        return Err(format!("You must be at least {} years old", MINIMUM_AGE));
    }
    Ok(date)
}

fn check_credentials(errors: &mut FieldErrors, email: &str, password: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email.trim()) {
        errors.add("email", "Email is invalid");
    }

    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

/// `something@something.something` with no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => domain
            .rsplit_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty()),
        _ => false,
    }
}

/// Completed years between `birth` and `today`
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn digits(input: &str) -> Vec<char> {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Mask a CPF as `123.456.789-00`, tolerating partial input
pub fn format_cpf(input: &str) -> String {
    let mut out = String::with_capacity(14);
    for (i, c) in digits(input).into_iter().take(11).enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Mask a mobile number as `(11) 99999-9999`, tolerating partial input
pub fn format_phone(input: &str) -> String {
    let digits = digits(input);
    if digits.len() <= 2 {
        return digits.into_iter().collect();
    }

    let mut out = String::with_capacity(15);
    out.push('(');
    for (i, c) in digits.into_iter().take(11).enumerate() {
        match i {
            2 => out.push_str(") "),
            7 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}
