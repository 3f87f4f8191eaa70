// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    config::Config,
    db::UserRepository,
    models::auth::{AuthResponse, Caller, Claims, Role, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    jwt_secret: String,
    jwt_expiry_hours: i64,
    bcrypt_cost: u32,
    allow_registration: bool,
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepository>, config: &Config) -> Self {
        Self {
            user_repo,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiry_hours: config.jwt_expiry_hours,
            bcrypt_cost: config.bcrypt_cost,
            allow_registration: config.allow_registration,
        }
    }

    /// Registro aberto: sempre nasce sales_agent, o resto só via admin.
    pub async fn register_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        if !self.allow_registration {
            return Err(AppError::forbidden("O registro aberto está desabilitado."));
        }

        let password_hash = self.hash_password(password).await?;
        let user = self
            .user_repo
            .create_user(email, &password_hash, Role::SalesAgent)
            .await?;

        tracing::info!(user_id = %user.id, "Novo usuário registrado");
        self.auth_response(user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.auth_response(user)
    }

    /// Verifica assinatura e expiração e recarrega o usuário: o papel que vale é o
    /// do banco, então troca de papel ou exclusão têm efeito imediato.
    pub async fn validate_token(&self, token: &str) -> Result<Caller, AppError> {
        let claims = self.decode_token(token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .map(Caller::from)
            .ok_or(AppError::InvalidToken)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.jwt_expiry_hours);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let cost = self.bcrypt_cost;

        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        Ok(hashed)
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, AppError> {
        let token = self.create_token(&user)?;
        Ok(AuthResponse {
            id: user.id,
            email: user.email,
            role: user.role,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    // Nenhum teste daqui toca no repositório
    struct NoUsers;

    #[async_trait]
    impl UserRepository for NoUsers {
        async fn find_by_email(&self, _: &str) -> Result<Option<User>, AppError> {
            Ok(None)
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<User>, AppError> {
            Ok(None)
        }
        async fn find_by_ids(&self, _: &[Uuid]) -> Result<Vec<User>, AppError> {
            Ok(Vec::new())
        }
        async fn list_all(&self) -> Result<Vec<User>, AppError> {
            Ok(Vec::new())
        }
        async fn list_by_role(&self, _: Role) -> Result<Vec<User>, AppError> {
            Ok(Vec::new())
        }
        async fn create_user(&self, _: &str, _: &str, _: Role) -> Result<User, AppError> {
            Err(AppError::EmailAlreadyExists)
        }
        async fn update_role(&self, _: Uuid, _: Role) -> Result<Option<User>, AppError> {
            Ok(None)
        }
        async fn delete_user(&self, _: Uuid) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    fn service(secret: &str, expiry_hours: i64) -> AuthService {
        AuthService {
            user_repo: Arc::new(NoUsers),
            jwt_secret: secret.to_string(),
            jwt_expiry_hours: expiry_hours,
            bcrypt_cost: 4,
            allow_registration: false,
        }
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "manager@x.com".into(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_roundtrip_carries_subject_and_role() {
        let auth = service("segredo", 24);
        let user = user(Role::SalesManager);
        let token = auth.create_token(&user).unwrap();

        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::SalesManager);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Bem além da tolerância padrão de 60s do jsonwebtoken
        let auth = service("segredo", -2);
        let token = auth.create_token(&user(Role::Admin)).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = service("outro", 24).create_token(&user(Role::Admin)).unwrap();
        assert!(matches!(service("segredo", 24).decode_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service("segredo", 24).decode_token("lixo"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn registration_can_be_disabled() {
        let result = service("segredo", 24).register_user("a@x.com", "123456").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn hashed_password_verifies() {
        let auth = service("segredo", 24);
        let hashed = auth.hash_password("s3cret!").await.unwrap();
        assert!(verify("s3cret!", &hashed).unwrap());
        assert!(!verify("errada", &hashed).unwrap());
    }
}
