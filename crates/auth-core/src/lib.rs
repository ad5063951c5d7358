//! commercium-auth-core - 认证核心库
//!
//! JWT 签发/校验与基于角色的访问控制

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use commercium_common::UserId;
use commercium_errors::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

/// 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Seller => "SELLER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    /// 兼容 `ROLE_` 前缀
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches("ROLE_").to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "SELLER" => Ok(Self::Seller),
            "ADMIN" => Ok(Self::Admin),
            other => Err(AppError::validation(format!("Unknown role: {}", other))),
        }
    }
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Audience
    #[serde(default)]
    pub aud: String,
    /// Token type (access or refresh)
    #[serde(default)]
    pub token_type: String,
    /// Roles
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    fn new(
        user_id: &UserId,
        roles: &[Role],
        expires_in_secs: i64,
        token_type: &str,
        issuer: &str,
        audience: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            token_type: token_type.to_string(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        }
    }

    pub fn user_id(&self) -> AppResult<UserId> {
        UserId::parse(self.sub.clone()).map_err(AppError::unauthenticated)
    }

    /// 无法识别的角色字符串被忽略
    pub fn roles(&self) -> Vec<Role> {
        self.roles.iter().filter_map(|r| r.parse().ok()).collect()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    /// 缺少全部给定角色时返回 Forbidden
    pub fn require_any_role(&self, roles: &[Role]) -> AppResult<()> {
        if self.has_any_role(roles) {
            return Ok(());
        }
        let expected: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        Err(AppError::forbidden(format!(
            "Requires one of roles: {}",
            expected.join(", ")
        )))
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == ACCESS_TOKEN
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == REFRESH_TOKEN
    }
}

/// Token 服务
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
    refresh_token_expires_in: i64,
    issuer: String,
    audience: String,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_token_expires_in: i64,
        refresh_token_expires_in: i64,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in,
            refresh_token_expires_in,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// 生成访问令牌
    pub fn generate_access_token(&self, user_id: &UserId, roles: &[Role]) -> AppResult<String> {
        let claims = Claims::new(
            user_id,
            roles,
            self.access_token_expires_in,
            ACCESS_TOKEN,
            &self.issuer,
            &self.audience,
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
    }

    /// 生成刷新令牌（不携带角色）
    pub fn generate_refresh_token(&self, user_id: &UserId) -> AppResult<String> {
        let claims = Claims::new(
            user_id,
            &[],
            self.refresh_token_expires_in,
            REFRESH_TOKEN,
            &self.issuer,
            &self.audience,
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate refresh token: {}", e)))
    }

    /// 校验签名、签发者、受众与过期时间
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::unauthenticated(format!("Invalid token: {}", e)))?
            .claims;

        if claims.token_type.is_empty() {
            return Err(AppError::unauthenticated("Token type not specified"));
        }
        if claims.jti.is_empty() {
            return Err(AppError::unauthenticated("Token ID (jti) missing"));
        }

        Ok(claims)
    }

    /// 仅接受 access token
    pub fn validate_access_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.validate_token(token)?;
        if !claims.is_access_token() {
            return Err(AppError::unauthenticated("Not an access token"));
        }
        Ok(claims)
    }

    /// 仅接受 refresh token
    pub fn validate_refresh_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.validate_token(token)?;
        if !claims.is_refresh_token() {
            return Err(AppError::unauthenticated("Not a refresh token"));
        }
        Ok(claims)
    }

    pub fn access_token_expires_in(&self) -> i64 {
        self.access_token_expires_in
    }
}
