use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::PgWireResult;

/// Connection-level password for the SQL front-end. Distinct from renter
/// accounts, which authenticate through `SELECT ... FROM sessions`.
#[derive(Debug)]
pub struct CarlotAuthSource {
    password: String,
}

impl CarlotAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for CarlotAuthSource {
    async fn get_password(&self, login: &LoginInfo) -> PgWireResult<Password> {
        tracing::debug!(user = ?login.user(), "startup authentication");
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}
