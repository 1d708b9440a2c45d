use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Opaque bearer token used by the dashboard API. Identity management
    /// itself lives outside this service; the token is provisioned by the
    /// admin CLI.
    #[serde(skip_serializing)]
    pub api_token: String,
    pub premium: bool,
    pub stripe_customer_id: Option<String>,
    pub created_at: i64,
}
