//! Account signup, login and token handling

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::User;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Signup form, after trimming and lowercasing the email
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 3, message = "Username must be at least 3 characters."))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
    #[serde(default)]
    pub address: String,
    #[validate(range(min = 13, message = "You must be at least 13 years old."))]
    pub age: i32,
    /// Location picked on the signup map; the delivery fee is computed
    /// server-side from these
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl SignupInput {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.address = self.address.trim().to_string();
        self.place_id = self.place_id.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self.formatted_address = self
            .formatted_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .or_else(|| Some(self.address.clone()).filter(|a| !a.is_empty()));
        if self.lat.is_none() || self.lng.is_none() {
            self.lat = None;
            self.lng = None;
        }
        self
    }
}

/// Field checked first wins when several are invalid
const SIGNUP_FIELD_ORDER: [&str; 5] = ["username", "email", "password", "confirm_password", "age"];

/// First failing field of a validated form as an `AppError`
pub fn first_validation_error(errors: &ValidationErrors, order: &[&str]) -> AppError {
    let fields = errors.field_errors();
    let mut names: Vec<&str> = order.iter().copied().filter(|f| fields.contains_key(f)).collect();
    if names.is_empty() {
        names = fields.keys().copied().collect();
        names.sort_unstable();
    }
    match names.first() {
        Some(field) => {
            let message = fields
                .get(field)
                .and_then(|errs| errs.first())
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", field));
            AppError::validation(field, message)
        }
        None => AppError::ValidationError(errors.to_string()),
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub is_staff: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Full `users` row
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub age: i32,
    pub place_id: Option<String>,
    pub formatted_address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub distance_km: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            email: r.email,
            address: r.address,
            age: r.age,
            place_id: r.place_id,
            formatted_address: r.formatted_address,
            lat: r.lat,
            lng: r.lng,
            distance_km: r.distance_km,
            delivery_fee: r.delivery_fee,
            is_staff: r.is_staff,
            created_at: r.created_at,
        }
    }
}

pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, address, age, place_id, \
    formatted_address, lat, lng, distance_km, delivery_fee, is_staff, created_at";

/// Decode a bearer token
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Register a customer account
    pub async fn signup(&self, input: SignupInput) -> AppResult<(User, AuthTokens)> {
        let input = input.normalized();
        input
            .validate()
            .map_err(|e| first_validation_error(&e, &SIGNUP_FIELD_ORDER))?;

        let email_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
                .bind(&input.email)
                .fetch_one(&self.db)
                .await?;
        if email_taken > 0 {
            return Err(AppError::DuplicateEntry("email".into()));
        }

        let username_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = $1")
                .bind(&input.username)
                .fetch_one(&self.db)
                .await?;
        if username_taken > 0 {
            return Err(AppError::DuplicateEntry("username".into()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, password_hash, address, age, place_id, \
             formatted_address, lat, lng) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.address)
        .bind(input.age)
        .bind(&input.place_id)
        .bind(&input.formatted_address)
        .bind(input.lat)
        .bind(input.lng)
        .fetch_one(&self.db)
        .await?;

        tracing::info!("New account {} ({})", row.username, row.id);

        let tokens = self.generate_tokens(row.id, row.is_staff)?;
        Ok((row.into(), tokens))
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(User, AuthTokens)> {
        let email = email.trim().to_lowercase();
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.generate_tokens(user.id, user.is_staff)?;
        Ok((user.into(), tokens))
    }

    /// Load an account by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound("User".into()))
    }

    /// Sign an access token
    pub fn generate_tokens(&self, user_id: Uuid, is_staff: bool) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            is_staff,
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> SignupInput {
        SignupInput {
            username: "  kavi ".into(),
            email: " Kavi@Example.TT ".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            address: "Chaguanas".into(),
            age: 30,
            place_id: Some("  ".into()),
            formatted_address: None,
            lat: Some(10.51),
            lng: None,
        }
    }

    fn field_of(err: AppError) -> String {
        match err {
            AppError::Validation { field, .. } => field,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_valid_signup_is_normalized() {
        let input = input().normalized();
        assert!(input.validate().is_ok());
        assert_eq!(input.username, "kavi");
        assert_eq!(input.email, "kavi@example.tt");
        assert_eq!(input.place_id, None);
        assert_eq!(input.formatted_address.as_deref(), Some("Chaguanas"));
        assert_eq!(input.lat, None);
    }

    #[test]
    fn test_signup_rules() {
        let mut short = input();
        short.username = "ab".into();
        let err = short.normalized().validate().unwrap_err();
        assert_eq!(field_of(first_validation_error(&err, &SIGNUP_FIELD_ORDER)), "username");

        let mut bad_email = input();
        bad_email.email = "not-an-email".into();
        let err = bad_email.normalized().validate().unwrap_err();
        assert_eq!(field_of(first_validation_error(&err, &SIGNUP_FIELD_ORDER)), "email");

        let mut mismatch = input();
        mismatch.confirm_password = "secret2".into();
        let err = mismatch.normalized().validate().unwrap_err();
        assert_eq!(
            field_of(first_validation_error(&err, &SIGNUP_FIELD_ORDER)),
            "confirm_password"
        );

        let mut young = input();
        young.age = 12;
        let err = young.normalized().validate().unwrap_err();
        assert_eq!(field_of(first_validation_error(&err, &SIGNUP_FIELD_ORDER)), "age");
    }

    #[test]
    fn test_first_error_follows_field_order() {
        let mut many = input();
        many.password = "123".into();
        many.age = 5;
        let err = many.normalized().validate().unwrap_err();
        assert_eq!(field_of(first_validation_error(&err, &SIGNUP_FIELD_ORDER)), "password");
    }

    #[test]
    fn test_token_round_trip() {
        let secret = "test-secret";
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            is_staff: true,
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let decoded = verify_token(&token, secret).unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert!(decoded.is_staff);
        assert!(matches!(verify_token(&token, "other"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            is_staff: false,
            exp: (now - Duration::hours(2)).timestamp(),
            iat: (now - Duration::hours(3)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s")).unwrap();
        assert!(matches!(verify_token(&token, "s"), Err(AppError::TokenExpired)));
    }
}
