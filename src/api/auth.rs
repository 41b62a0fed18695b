use axum::{
    Extension, Json,
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::warn;

use super::{ApiError, ApiResponse, AppState, MessageResponse, validation};
use crate::constants::auth as auth_keys;
use crate::services::{
    AdminInfo, ConfirmationKind, EmailMessage, LoginOutcome, RegisterInput,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub accept_terms: bool,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStep {
    #[default]
    Credentials,
    Pin,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub step: LoginStep,
    pub email: String,
    pub password: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Serialize)]
pub struct ResetLinkResponse {
    pub email: String,
}

/// Wizard state held in the server-side cookie session between the
/// forgot-password steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetState {
    pub email: String,
    pub verified: bool,
}

/// Authenticated admin attached to the request by the auth middleware.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub id: i32,
    pub email: String,
    pub role: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. Session cookie carrying the session token (from login)
/// 2. `Authorization: Bearer <token>` header
/// 3. `X-Session-Token` header
///
/// Every accepted token must still match an active, unexpired
/// `admin_sessions` row.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut token = session
        .get::<String>(auth_keys::SESSION_TOKEN_KEY)
        .await
        .ok()
        .flatten();

    if token.is_none() {
        token = extract_session_token(&headers);
    }

    let Some(token) = token else {
        return Err(ApiError::unauthorized());
    };

    let Some(admin) = state.auth.validate_session(&token).await? else {
        return Err(ApiError::unauthorized());
    };

    tracing::Span::current().record("admin_id", admin.id);
    request.extensions_mut().insert(CurrentAdmin {
        id: admin.id,
        email: admin.email,
        role: admin.role,
    });

    Ok(next.run(request).await)
}

/// Extract a session token from headers
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    if let Some(token) = headers.get("X-Session-Token")
        && let Ok(token_str) = token.to_str()
    {
        return Some(token_str.trim().to_string());
    }

    None
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

// ============================================================================
// Email composition
// ============================================================================

async fn send_register_confirmation(
    state: &AppState,
    email: &str,
    code: &str,
    token: &str,
) -> Result<(), ApiError> {
    let base_url = state.config().read().await.server.public_base_url.clone();
    let link = format!("{base_url}/api/auth/verify-email?token={token}");

    state
        .mailer()
        .send(EmailMessage {
            to: email.to_string(),
            subject: "Confirma tu cuenta de Telegan".to_string(),
            body: format!(
                "Tu código de confirmación es: {code}\n\n\
                 También puedes confirmar tu cuenta abriendo este enlace:\n{link}\n"
            ),
        })
        .await
        .map_err(|e| ApiError::internal(format!("Failed to send confirmation email: {e}")))
}

async fn send_reset_confirmation(
    state: &AppState,
    email: &str,
    code: &str,
    token: &str,
) -> Result<(), ApiError> {
    let base_url = state.config().read().await.server.public_base_url.clone();
    let link = format!("{base_url}/api/auth/reset-password?token={token}");

    state
        .mailer()
        .send(EmailMessage {
            to: email.to_string(),
            subject: "Restablecer contraseña de Telegan".to_string(),
            body: format!(
                "Tu código para restablecer la contraseña es: {code}\n\n\
                 O abre este enlace:\n{link}\n\nEl código caduca en 30 minutos."
            ),
        })
        .await
        .map_err(|e| ApiError::internal(format!("Failed to send reset email: {e}")))
}

fn send_welcome_email(state: &AppState, email: &str) {
    let mailer = state.shared.mailer.clone();
    let message = EmailMessage {
        to: email.to_string(),
        subject: "Bienvenido a Telegan".to_string(),
        body: "Tu cuenta ha sido verificada. Ya puedes iniciar sesión.".to_string(),
    };
    tokio::spawn(async move {
        if let Err(e) = mailer.send(message).await {
            warn!("Welcome email failed: {e:#}");
        }
    });
}

/// Best-effort login notifications: an email to the admin plus an
/// optional WhatsApp alert. Neither is awaited by the login path.
fn notify_login(state: &AppState, admin: &AdminInfo, ip: &str) {
    let mailer = state.shared.mailer.clone();
    let message = EmailMessage {
        to: admin.email.clone(),
        subject: "Nuevo inicio de sesión en Telegan".to_string(),
        body: format!("Se inició sesión en tu cuenta desde la IP {ip}."),
    };
    tokio::spawn(async move {
        if let Err(e) = mailer.send(message).await {
            warn!("Login notification email failed: {e:#}");
        }
    });

    if let Some(whatsapp) = state.shared.whatsapp.clone() {
        let text = format!("Telegan: inicio de sesión de {} desde {}", admin.email, ip);
        tokio::spawn(async move {
            if let Err(e) = whatsapp.send_alert(&text).await {
                warn!("WhatsApp login alert failed: {e:#}");
            }
        });
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Creates a dormant account and emails the confirmation code + link.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if !payload.accept_terms {
        return Err(ApiError::validation("Terms must be accepted"));
    }
    let email = validation::validate_email(&payload.email)?.to_string();
    validation::validate_password(&payload.password)?;

    let admin = state
        .auth
        .register(RegisterInput {
            name: payload.name.trim().to_string(),
            email: email.clone(),
            phone: payload.phone,
            password: payload.password,
        })
        .await?;

    let issued = state
        .confirmations
        .issue(&admin.email, ConfirmationKind::Register)
        .await?;
    send_register_confirmation(&state, &admin.email, &issued.code, &issued.token).await?;

    Ok(Json(ApiResponse::success(RegisterResponse {
        email: admin.email,
        message: "Registration received. Check your email for the confirmation code".to_string(),
    })))
}

/// POST /auth/confirm
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    state
        .confirmations
        .verify_code(email, ConfirmationKind::Register, &payload.code)
        .await?;

    send_welcome_email(&state, email);

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account verified. You can now log in",
    ))))
}

/// POST /auth/confirm/resend
/// Re-issues the registration code. The response never reveals whether
/// the address exists.
pub async fn confirm_resend(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    let admin = state.store().admin_users().get_by_email(email).await?;
    if let Some(admin) = admin
        && !admin.email_verified
    {
        let issued = state
            .confirmations
            .issue(email, ConfirmationKind::Register)
            .await?;
        send_register_confirmation(&state, email, &issued.code, &issued.token).await?;
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the account exists and is unverified, a new code has been sent",
    ))))
}

/// GET /auth/verify-email?token=
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = state
        .confirmations
        .verify_token(&query.token, ConfirmationKind::Register)
        .await?;

    send_welcome_email(&state, &email);

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account verified. You can now log in",
    ))))
}

/// POST /auth/login
/// Two-step login: "credentials" opens a session for verified accounts
/// or demands the PIN; "pin" verifies the account without opening one.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    match payload.step {
        LoginStep::Credentials => {
            let password = payload
                .password
                .as_deref()
                .ok_or_else(|| ApiError::validation("Password is required"))?;

            let ip = client_ip(&headers);
            let outcome = state
                .auth
                .login(email, password, &ip, &user_agent(&headers))
                .await?;

            match outcome {
                LoginOutcome::PinRequired { email } => {
                    session
                        .insert(auth_keys::PENDING_EMAIL_KEY, &email)
                        .await
                        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

                    // Reuse the outstanding code if it is still live,
                    // otherwise issue a fresh one.
                    let existing = state
                        .store()
                        .confirmations()
                        .latest_active(&email, ConfirmationKind::Register.as_str())
                        .await?;
                    let (code, token) = match existing {
                        Some(row) if row.expires_at > Utc::now() => (row.code, row.token),
                        _ => {
                            let issued = state
                                .confirmations
                                .issue(&email, ConfirmationKind::Register)
                                .await?;
                            (issued.code, issued.token)
                        }
                    };
                    send_register_confirmation(&state, &email, &code, &token).await?;

                    Ok(Json(ApiResponse::success(LoginResponse {
                        step: "pin".to_string(),
                        token: None,
                        expires_at: None,
                        admin: None,
                        message: Some(
                            "Email not verified. A confirmation code has been sent".to_string(),
                        ),
                    })))
                }
                LoginOutcome::Verified {
                    token,
                    expires_at,
                    admin,
                } => {
                    session
                        .insert(auth_keys::SESSION_TOKEN_KEY, &token)
                        .await
                        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
                    session
                        .insert("admin_id", admin.id)
                        .await
                        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
                    session
                        .insert("role", &admin.role)
                        .await
                        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

                    notify_login(&state, &admin, &ip);

                    Ok(Json(ApiResponse::success(LoginResponse {
                        step: "authenticated".to_string(),
                        token: Some(token),
                        expires_at: Some(expires_at),
                        admin: Some(admin),
                        message: None,
                    })))
                }
            }
        }
        LoginStep::Pin => {
            let code = payload
                .code
                .as_deref()
                .ok_or_else(|| ApiError::validation("Code is required"))?;

            state
                .confirmations
                .verify_code(email, ConfirmationKind::Register, code)
                .await?;

            let _ = session.remove::<String>(auth_keys::PENDING_EMAIL_KEY).await;

            // Verification never opens a session; the client re-submits
            // credentials.
            Ok(Json(ApiResponse::success(LoginResponse {
                step: "verified".to_string(),
                token: None,
                expires_at: None,
                admin: None,
                message: Some("Account verified. Log in with your credentials".to_string()),
            })))
        }
    }
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let mut token = session
        .get::<String>(auth_keys::SESSION_TOKEN_KEY)
        .await
        .ok()
        .flatten();
    if token.is_none() {
        token = extract_session_token(&headers);
    }

    if let Some(token) = token {
        state.auth.logout(&token).await?;
    }

    let _ = session.flush().await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out",
    ))))
}

/// GET /auth/me (requires authentication)
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAdmin>,
) -> Result<Json<ApiResponse<AdminInfo>>, ApiError> {
    let admin = state
        .store()
        .admin_users()
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin", current.id))?;

    Ok(Json(ApiResponse::success(AdminInfo::from(admin))))
}

/// POST /auth/forgot-password
/// Constant response regardless of account existence.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    let admin = state.store().admin_users().get_by_email(email).await?;
    if let Some(admin) = admin
        && admin.active
    {
        let issued = state
            .confirmations
            .issue(email, ConfirmationKind::PasswordReset)
            .await?;
        send_reset_confirmation(&state, email, &issued.code, &issued.token).await?;
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the account exists, a reset code has been sent",
    ))))
}

/// POST /auth/forgot-password/verify
pub async fn forgot_password_verify(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    state
        .confirmations
        .verify_code(email, ConfirmationKind::PasswordReset, &payload.code)
        .await?;

    session
        .insert(
            auth_keys::RESET_STATE_KEY,
            PasswordResetState {
                email: email.to_string(),
                verified: true,
            },
        )
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Code verified. You can now set a new password",
    ))))
}

/// POST /auth/forgot-password/reset
/// Requires the verify step to have succeeded in this session. Nothing
/// is mutated on validation failures.
pub async fn forgot_password_reset(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    let reset_state = session
        .get::<PasswordResetState>(auth_keys::RESET_STATE_KEY)
        .await
        .ok()
        .flatten();
    let verified = reset_state
        .as_ref()
        .is_some_and(|s| s.verified && s.email == email);
    if !verified {
        return Err(ApiError::Unauthorized(
            "Password reset has not been verified".to_string(),
        ));
    }

    if payload.new_password != payload.confirm_password {
        return Err(ApiError::validation("Passwords do not match"));
    }
    validation::validate_password(&payload.new_password)?;

    state.auth.reset_password(email, &payload.new_password).await?;

    let _ = session
        .remove::<PasswordResetState>(auth_keys::RESET_STATE_KEY)
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated. You can now log in",
    ))))
}

/// GET /auth/reset-password?token=
/// Link-based entry into the reset wizard; validates the token and marks
/// the session verified for that email.
pub async fn reset_password_link(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ApiResponse<ResetLinkResponse>>, ApiError> {
    let email = state
        .confirmations
        .verify_token(&query.token, ConfirmationKind::PasswordReset)
        .await?;

    session
        .insert(
            auth_keys::RESET_STATE_KEY,
            PasswordResetState {
                email: email.clone(),
                verified: true,
            },
        )
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Json(ApiResponse::success(ResetLinkResponse { email })))
}
