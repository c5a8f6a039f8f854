use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// How long freshly issued invitation codes stay redeemable.
    pub invitation_ttl_days: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let invitation_ttl_days = std::env::var("INVITATION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3);
        Ok(Self {
            database_url,
            invitation_ttl_days,
        })
    }
}
