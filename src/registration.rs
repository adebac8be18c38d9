//! Birthday registrations: form validation and the store capability.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calculator::BirthInstant;
use crate::error::{BASE_FIELD, BirthdayError, Result, ValidationErrors};

pub const FIELD_NAME: &str = "name";
pub const FIELD_BIRTH_DATE: &str = "birth_date";
pub const FIELD_BIRTH_TIME: &str = "birth_time";

/// Raw form input as typed by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub birth_date: String,
    #[serde(default)]
    pub birth_time: Option<String>,
}

/// Edit form. The name is fixed once registered; the birth instant is
/// replaced as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BirthEdit {
    pub birth_date: String,
    #[serde(default)]
    pub birth_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub birth: BirthInstant,
}

impl Registration {
    /// Validates `form` against `existing` registrations. Every field error is
    /// collected before failing.
    pub fn from_form(
        form: &RegistrationForm,
        today: NaiveDate,
        existing: &[Registration],
    ) -> Result<Self> {
        let mut errors = ValidationErrors::new();

        let name = form.name.trim();
        let id = slugify(name);
        if name.is_empty() {
            errors.add(FIELD_NAME, "name_required");
        } else if id.is_empty() {
            errors.add(FIELD_NAME, "invalid_name");
        }

        let birth = validate_birth(&form.birth_date, form.birth_time.as_deref(), today, &mut errors);

        if !id.is_empty()
            && existing
                .iter()
                .any(|r| r.id == id || r.name.eq_ignore_ascii_case(name))
        {
            errors.add(BASE_FIELD, "already_configured");
        }

        errors.into_result()?;
        let birth = birth.ok_or_else(|| BirthdayError::InvalidInput("birth date".into()))?;

        Ok(Self {
            id,
            name: name.to_string(),
            birth,
        })
    }
}

impl BirthEdit {
    pub fn validate(&self, today: NaiveDate) -> Result<BirthInstant> {
        let mut errors = ValidationErrors::new();
        let birth = validate_birth(&self.birth_date, self.birth_time.as_deref(), today, &mut errors);
        errors.into_result()?;
        birth.ok_or_else(|| BirthdayError::InvalidInput("birth date".into()))
    }
}

/// Create/update/delete/list over registered birthdays.
pub trait BirthdayStore {
    fn register(&mut self, form: &RegistrationForm, today: NaiveDate) -> Result<Registration>;

    /// Replaces the birth instant of `id`; the name is unchanged.
    fn update(&mut self, id: &str, edit: &BirthEdit, today: NaiveDate) -> Result<Registration>;

    fn remove(&mut self, id: &str) -> Result<Registration>;

    fn list(&self) -> Vec<Registration>;

    fn get(&self, id: &str) -> Result<Registration> {
        self.list()
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| BirthdayError::NotFound(id.to_string()))
    }

    fn birth_instant(&self, id: &str) -> Result<BirthInstant> {
        self.get(id).map(|r| r.birth)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<Registration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Registration>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Registration] {
        &self.entries
    }
}

impl BirthdayStore for MemoryStore {
    fn register(&mut self, form: &RegistrationForm, today: NaiveDate) -> Result<Registration> {
        let registration = Registration::from_form(form, today, &self.entries).inspect_err(|e| {
            tracing::warn!("Rejected registration for {:?}: {}", form.name, e);
        })?;
        tracing::info!("Registered birthday for {}", registration.name);
        self.entries.push(registration.clone());
        Ok(registration)
    }

    fn update(&mut self, id: &str, edit: &BirthEdit, today: NaiveDate) -> Result<Registration> {
        let entry = self
            .entries
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BirthdayError::NotFound(id.to_string()))?;
        let birth = edit.validate(today).inspect_err(|e| {
            tracing::warn!("Rejected edit for {}: {}", id, e);
        })?;
        entry.birth = birth;
        tracing::info!("Updated birthday for {}", entry.name);
        Ok(entry.clone())
    }

    fn remove(&mut self, id: &str) -> Result<Registration> {
        let index = self
            .entries
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| BirthdayError::NotFound(id.to_string()))?;
        let removed = self.entries.remove(index);
        tracing::info!("Removed birthday entry: {}", removed.name);
        Ok(removed)
    }

    fn list(&self) -> Vec<Registration> {
        self.entries.clone()
    }
}

/// Accepts `DD.MM.YYYY` (day and month may be one digit) or `YYYY-MM-DD`.
pub fn parse_birth_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.split('.').count() == 3 {
        return NaiveDate::parse_from_str(input, "%d.%m.%Y").ok();
    }
    let parts: Vec<&str> = input.split('-').collect();
    if parts.len() == 3 && parts[0].len() == 4 {
        return NaiveDate::parse_from_str(input, "%Y-%m-%d").ok();
    }
    None
}

/// Accepts `HH:MM:SS` or `HH:MM`.
pub fn parse_birth_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .ok()
}

/// Stored dates are shown back to the user as `DD.MM.YYYY`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Lowercase ASCII alphanumerics joined by single underscores.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

fn validate_birth(
    date: &str,
    time: Option<&str>,
    today: NaiveDate,
    errors: &mut ValidationErrors,
) -> Option<BirthInstant> {
    let date = if date.trim().is_empty() {
        errors.add(FIELD_BIRTH_DATE, "date_required");
        None
    } else {
        match parse_birth_date(date) {
            Some(d) if d > today => {
                errors.add(FIELD_BIRTH_DATE, "future_date");
                None
            }
            Some(d) => Some(d),
            None => {
                errors.add(FIELD_BIRTH_DATE, "invalid_date");
                None
            }
        }
    };

    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        None => Some(None),
        Some(raw) => match parse_birth_time(raw) {
            Some(t) => Some(Some(t)),
            None => {
                errors.add(FIELD_BIRTH_TIME, "invalid_time");
                None
            }
        },
    };

    Some(BirthInstant::new(date?, time?))
}
