use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub display_name: String,
    /// Spendable balance in cents.
    pub balance_cents: i64,
    pub is_admin: bool,
}
