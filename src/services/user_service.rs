use uuid::Uuid;

use crate::{
    auth::{Claims, hash_password, verify_password},
    config::Config,
    error::{AppError, Result},
    models::{AuthResponse, LoginRequest, NewUser, RegisterRequest, UpdateUserRequest, User},
    store::UserStore,
};

/// Expects a payload that has been through `RegisterRequest::normalized`.
pub async fn register(
    users: &dyn UserStore,
    config: &Config,
    payload: RegisterRequest,
) -> Result<User> {
    let email = payload.email;

    if users.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password, config.bcrypt_cost)?;

    let user = users
        .create_user(NewUser {
            name: payload.name,
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(user)
}

pub async fn login(
    users: &dyn UserStore,
    config: &Config,
    payload: LoginRequest,
) -> Result<AuthResponse> {
    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = users
        .get_user_by_email(&payload.email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let (token, _) = Claims::new(
        user.id,
        user.name.clone(),
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )?;

    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn get_user_by_id(users: &dyn UserStore, user_id: Uuid) -> Result<User> {
    users
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn update_user(
    users: &dyn UserStore,
    config: &Config,
    user_id: Uuid,
    payload: UpdateUserRequest,
) -> Result<User> {
    let mut user = get_user_by_id(users, user_id).await?;

    if let Some(name) = payload.name {
        user.name = name;
    }

    if let Some(email) = payload.email {
        user.email = email;
    }

    if let Some(password) = payload.password {
        user.password_hash = hash_password(&password, config.bcrypt_cost)?;
    }

    users.update_user(&user).await
}
