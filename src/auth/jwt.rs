use crate::auth::types::Claims;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};

pub const TOKEN_LIFETIME_HOURS: i64 = 24;

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    debug!("验证 JWT token");
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub fn generate_token(
    secret: &str,
    admin_id: &str,
    email: &str,
) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
    debug!("为管理员 {} 生成 JWT token", admin_id);
    let expires_at = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);
    let claims = Claims {
        sub: admin_id.to_string(),
        exp: expires_at.timestamp() as usize,
        email: email.to_string(),
    };

    match encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    ) {
        Ok(token) => {
            info!("成功为管理员 {} 生成 token", admin_id);
            Ok((token, expires_at))
        }
        Err(e) => {
            error!("为管理员 {} 生成 token 失败: {}", admin_id, e);
            Err(e)
        }
    }
}
