//! Tab-scoped edit forms.
//!
//! Every edit tab owns a fixed set of fields. A submission is parsed into the
//! typed form of its tab, which is then applied onto the stored profile. Only
//! the fields present in the submission are touched.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use validator::{ValidateEmail, ValidateLength};

use crate::{
    core::{
        security::hash_password,
        utils::{date_to_string_opt, DATE_FORMAT},
    },
    model::{gender::Gender, user_profile::UserProfile},
};

use super::error::ValidationError;

/// Raw submission: field name to submitted value, `None` for JSON null.
pub type SubmittedFields = HashMap<String, Option<String>>;

const MAX_TEXT_LEN: u64 = 255;
const MIN_PASSWORD_LEN: u64 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditTab {
    Profile,
    ContactAddress,
    LoginAccount,
    Death,
}

impl EditTab {
    pub const ALL: [EditTab; 4] = [
        EditTab::Profile,
        EditTab::ContactAddress,
        EditTab::LoginAccount,
        EditTab::Death,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        EditTab::ALL.into_iter().find(|x| x.as_str() == token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditTab::Profile => "profile",
            EditTab::ContactAddress => "contact_address",
            EditTab::LoginAccount => "login_account",
            EditTab::Death => "death",
        }
    }

    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            EditTab::Profile => &["nickname", "name", "gender_id", "dob", "yob", "birth_order"],
            EditTab::ContactAddress => &["address", "city", "phone"],
            EditTab::LoginAccount => &["email", "password"],
            EditTab::Death => &["dod", "yod"],
        }
    }

    /// Current values of the tab's fields. The password is never exposed.
    pub fn field_values(&self, profile: &UserProfile) -> Vec<(&'static str, Option<String>)> {
        match self {
            EditTab::Profile => vec![
                ("nickname", profile.nickname.clone()),
                ("name", profile.name.clone()),
                ("gender_id", profile.gender_id.map(|x| x.to_string())),
                ("dob", date_to_string_opt(profile.dob)),
                ("yob", profile.yob.clone()),
                ("birth_order", profile.birth_order.map(|x| x.to_string())),
            ],
            EditTab::ContactAddress => vec![
                ("address", profile.address.clone()),
                ("city", profile.city.clone()),
                ("phone", profile.phone.clone()),
            ],
            EditTab::LoginAccount => vec![("email", profile.email.clone()), ("password", None)],
            EditTab::Death => vec![
                ("dod", date_to_string_opt(profile.dod)),
                ("yod", profile.yod.clone()),
            ],
        }
    }
}

/// Tab shown for a request. Unknown tokens fall back to the profile tab while
/// the requested token is kept as is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTab {
    pub tab: EditTab,
    pub requested: Option<String>,
}

impl ResolvedTab {
    pub fn resolve(requested: Option<&str>) -> Self {
        Self {
            tab: requested
                .and_then(EditTab::from_token)
                .unwrap_or(EditTab::Profile),
            requested: requested.map(|x| x.to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        match &self.requested {
            Some(requested) => requested != self.tab.as_str(),
            None => false,
        }
    }
}

/// State of one field in a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submitted<T> {
    Absent,
    Empty,
    Value(T),
}

impl<T> Submitted<T> {
    /// Absent keeps the stored value, empty clears it.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Submitted::Absent => {}
            Submitted::Empty => *target = None,
            Submitted::Value(val) => *target = Some(val),
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Submitted<U> {
        match self {
            Submitted::Absent => Submitted::Absent,
            Submitted::Empty => Submitted::Empty,
            Submitted::Value(val) => Submitted::Value(f(val)),
        }
    }
}

/// Year stored next to a date (yob for dob, yod for dod).
///
/// `date` is the date of the same submission. A submitted date decides the
/// year, otherwise the submitted year is applied onto `current_year`. The
/// stored date plays no part.
pub fn derive_year(
    current_year: Option<String>,
    date: &Submitted<NaiveDate>,
    year: Submitted<String>,
) -> Option<String> {
    if let Submitted::Value(date) = date {
        return Some(format!("{:04}", date.year()));
    }
    let mut current_year = current_year;
    year.apply_to(&mut current_year);
    current_year
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileForm {
    pub nickname: Submitted<String>,
    pub name: Submitted<String>,
    pub gender_id: Submitted<i16>,
    pub dob: Submitted<NaiveDate>,
    pub yob: Submitted<String>,
    pub birth_order: Submitted<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactAddressForm {
    pub address: Submitted<String>,
    pub city: Submitted<String>,
    pub phone: Submitted<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginAccountForm {
    pub email: Submitted<String>,
    /// Plain text; an empty password never replaces the stored hash.
    pub password: Submitted<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeathForm {
    pub dod: Submitted<NaiveDate>,
    pub yod: Submitted<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabUpdate {
    Profile(ProfileForm),
    ContactAddress(ContactAddressForm),
    LoginAccount(LoginAccountForm),
    Death(DeathForm),
}

impl TabUpdate {
    /// Parse and validate a submission for `tab`. Fields outside the tab are
    /// rejected, all failures are reported together.
    pub fn parse(tab: EditTab, fields: &SubmittedFields) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(fields);
        let mut unknown: Vec<&String> = fields
            .keys()
            .filter(|x| !tab.field_names().contains(&x.as_str()))
            .collect();
        unknown.sort();
        for field in unknown {
            reader.errors.add(
                field,
                format!("{} is not a field of the {} tab", field, tab.as_str()),
            );
        }

        let update = match tab {
            EditTab::Profile => TabUpdate::Profile(ProfileForm {
                nickname: reader.text("nickname"),
                name: reader.text("name"),
                gender_id: reader.gender("gender_id"),
                dob: reader.date("dob"),
                yob: reader.year("yob"),
                birth_order: reader.positive_number("birth_order"),
            }),
            EditTab::ContactAddress => TabUpdate::ContactAddress(ContactAddressForm {
                address: reader.long_text("address"),
                city: reader.text("city"),
                phone: reader.text("phone"),
            }),
            EditTab::LoginAccount => TabUpdate::LoginAccount(LoginAccountForm {
                email: reader.email("email"),
                password: reader.password("password"),
            }),
            EditTab::Death => TabUpdate::Death(DeathForm {
                dod: reader.date("dod"),
                yod: reader.year("yod"),
            }),
        };
        reader.errors.into_result(update)
    }

    pub fn tab(&self) -> EditTab {
        match self {
            TabUpdate::Profile(_) => EditTab::Profile,
            TabUpdate::ContactAddress(_) => EditTab::ContactAddress,
            TabUpdate::LoginAccount(_) => EditTab::LoginAccount,
            TabUpdate::Death(_) => EditTab::Death,
        }
    }

    /// Email submitted in a login account update, if any.
    pub fn submitted_email(&self) -> Option<&str> {
        match self {
            TabUpdate::LoginAccount(LoginAccountForm {
                email: Submitted::Value(email),
                ..
            }) => Some(email.as_str()),
            _ => None,
        }
    }

    /// Apply onto `profile`, hashing a submitted password.
    pub fn apply_to(self, profile: &mut UserProfile) -> anyhow::Result<()> {
        match self {
            TabUpdate::Profile(form) => {
                form.nickname.apply_to(&mut profile.nickname);
                form.name.apply_to(&mut profile.name);
                form.gender_id.apply_to(&mut profile.gender_id);
                profile.yob = derive_year(profile.yob.take(), &form.dob, form.yob);
                form.dob.apply_to(&mut profile.dob);
                form.birth_order.apply_to(&mut profile.birth_order);
            }
            TabUpdate::ContactAddress(form) => {
                form.address.apply_to(&mut profile.address);
                form.city.apply_to(&mut profile.city);
                form.phone.apply_to(&mut profile.phone);
            }
            TabUpdate::LoginAccount(form) => {
                form.email.apply_to(&mut profile.email);
                if let Submitted::Value(password) = form.password {
                    let hashed = hash_password(&password)
                        .map_err(|err| anyhow::anyhow!("hash password: {}", err))?;
                    profile.password = Some(hashed);
                }
            }
            TabUpdate::Death(form) => {
                profile.yod = derive_year(profile.yod.take(), &form.dod, form.yod);
                form.dod.apply_to(&mut profile.dod);
            }
        }
        Ok(())
    }
}

struct FieldReader<'a> {
    fields: &'a SubmittedFields,
    errors: ValidationError,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a SubmittedFields) -> Self {
        Self {
            fields,
            errors: ValidationError::new(),
        }
    }

    /// Untrimmed value, null and "" count as empty.
    fn raw(&self, name: &str) -> Submitted<&'a str> {
        match self.fields.get(name) {
            None => Submitted::Absent,
            Some(None) => Submitted::Empty,
            Some(Some(val)) if val.is_empty() => Submitted::Empty,
            Some(Some(val)) => Submitted::Value(val.as_str()),
        }
    }

    fn trimmed(&self, name: &str) -> Submitted<&'a str> {
        match self.raw(name) {
            Submitted::Value(val) if val.trim().is_empty() => Submitted::Empty,
            other => other.map(|x| x.trim()),
        }
    }

    fn long_text(&mut self, name: &str) -> Submitted<String> {
        self.trimmed(name).map(|x| x.to_string())
    }

    fn text(&mut self, name: &str) -> Submitted<String> {
        let val = self.long_text(name);
        if let Submitted::Value(text) = &val {
            if !text.validate_length(None, Some(MAX_TEXT_LEN), None) {
                self.errors.add(
                    name,
                    format!("{} may not be greater than {} characters", name, MAX_TEXT_LEN),
                );
            }
        }
        val
    }

    fn date(&mut self, name: &str) -> Submitted<NaiveDate> {
        match self.trimmed(name) {
            Submitted::Absent => Submitted::Absent,
            Submitted::Empty => Submitted::Empty,
            Submitted::Value(val) => match NaiveDate::parse_from_str(val, DATE_FORMAT) {
                Ok(date) if (1..=9999).contains(&date.year()) => Submitted::Value(date),
                _ => {
                    self.errors.add(
                        name,
                        format!("{} must be a valid date in YYYY-MM-DD format", name),
                    );
                    Submitted::Absent
                }
            },
        }
    }

    fn year(&mut self, name: &str) -> Submitted<String> {
        let val = self.long_text(name);
        if let Submitted::Value(year) = &val {
            if year.len() != 4 || !year.chars().all(|x| x.is_ascii_digit()) {
                self.errors
                    .add(name, format!("{} must be a 4 digit year", name));
            }
        }
        val
    }

    fn gender(&mut self, name: &str) -> Submitted<i16> {
        match self.trimmed(name) {
            Submitted::Absent => Submitted::Absent,
            Submitted::Empty => Submitted::Empty,
            Submitted::Value(val) => match val.parse::<i16>().ok().and_then(Gender::from_id) {
                Some(gender) => Submitted::Value(gender.id()),
                None => {
                    self.errors
                        .add(name, format!("{} must be 1 (male) or 2 (female)", name));
                    Submitted::Absent
                }
            },
        }
    }

    fn positive_number(&mut self, name: &str) -> Submitted<i32> {
        match self.trimmed(name) {
            Submitted::Absent => Submitted::Absent,
            Submitted::Empty => Submitted::Empty,
            Submitted::Value(val) => match val.parse::<i32>() {
                Ok(number) if number > 0 => Submitted::Value(number),
                _ => {
                    self.errors
                        .add(name, format!("{} must be a positive number", name));
                    Submitted::Absent
                }
            },
        }
    }

    fn email(&mut self, name: &str) -> Submitted<String> {
        let val = self.text(name);
        if let Submitted::Value(email) = &val {
            if !email.validate_email() {
                self.errors
                    .add(name, format!("{} must be a valid email address", name));
            }
        }
        val
    }

    fn password(&mut self, name: &str) -> Submitted<String> {
        let val = self.raw(name).map(|x| x.to_string());
        if let Submitted::Value(password) = &val {
            if !password.validate_length(Some(MIN_PASSWORD_LEN), None, None) {
                self.errors.add(
                    name,
                    format!("{} must be at least {} characters", name, MIN_PASSWORD_LEN),
                );
            }
        }
        val
    }
}
