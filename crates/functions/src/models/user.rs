//! User registration and profile rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use order_desk_core::{Email, Partition, Role};

use crate::store::TableEntity;
use crate::validation::{ValidationErrors, Validator, ViolationKind};

const MISSING_FIELDS: &str = "Please provide name, surname, email, password, and phoneNumber.";
const INVALID_EMAIL: &str = "Please provide a valid email address.";

/// `POST /register` body.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "phone")]
    pub phone_number: Option<String>,
    pub role: Option<String>,
    pub image_url: Option<String>,
}

impl std::fmt::Debug for RegisterUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterUserRequest")
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("phone_number", &self.phone_number)
            .field("role", &self.role)
            .field("image_url", &self.image_url)
            .finish()
    }
}

/// A registration that passed validation. The password is still plaintext.
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub password: String,
    pub phone_number: String,
    pub role: Role,
    pub image_url: Option<String>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("phone_number", &self.phone_number)
            .field("role", &self.role)
            .field("image_url", &self.image_url)
            .finish()
    }
}

impl RegisterUserRequest {
    /// Check required fields and the email address.
    ///
    /// # Errors
    ///
    /// Returns every violation found.
    pub fn validate(self) -> Result<NewUser, ValidationErrors> {
        let mut v = Validator::new();

        let name = v.required_str("name", self.name.as_deref());
        let surname = v.required_str("surname", self.surname.as_deref());
        let email = v
            .required_str("email", self.email.as_deref())
            .and_then(|raw| match Email::parse(&raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    v.invalid("email", e.to_string());
                    None
                }
            });
        // Passwords are not trimmed
        let password = match self.password {
            Some(p) if !p.trim().is_empty() => Some(p),
            _ => {
                v.missing("password");
                None
            }
        };
        let phone_number = v.required_str("phoneNumber", self.phone_number.as_deref());

        let user = match (name, surname, email, password, phone_number) {
            (Some(name), Some(surname), Some(email), Some(password), Some(phone_number)) => {
                Some(NewUser {
                    name,
                    surname,
                    email,
                    password,
                    phone_number,
                    role: Role::from_input(self.role.as_deref()),
                    image_url: non_blank(self.image_url),
                })
            }
            _ => None,
        };

        v.conclude(user, |violations| {
            if violations.iter().any(|x| x.kind == ViolationKind::Missing) {
                MISSING_FIELDS.to_string()
            } else {
                INVALID_EMAIL.to_string()
            }
        })
    }
}

/// A stored user profile, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub phone_number: String,
    pub hashed_password: String,
    pub role: Role,
    pub image_url: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl UserEntity {
    #[must_use]
    pub fn new(user: NewUser, hashed_password: String) -> Self {
        Self {
            name: user.name,
            surname: user.surname,
            email: user.email,
            phone_number: user.phone_number,
            hashed_password,
            role: user.role,
            image_url: user.image_url,
            created_date: Utc::now(),
        }
    }
}

impl TableEntity for UserEntity {
    const PARTITION: Partition = Partition::Users;

    fn row_key(&self) -> String {
        self.email.as_str().to_owned()
    }
}

/// A user as returned by listings, without the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub phone_number: String,
    pub role: Role,
    pub image_url: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl From<UserEntity> for UserView {
    fn from(user: UserEntity) -> Self {
        Self {
            name: user.name,
            surname: user.surname,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role,
            image_url: user.image_url,
            created_date: user.created_date,
        }
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
