pub mod auth_service;
pub mod auth_service_impl;
pub mod confirmation_service_impl;
pub mod mailer;

pub use auth_service::{
    AdminInfo, AuthError, AuthService, ConfirmationKind, ConfirmationService, IssuedConfirmation,
    LoginOutcome, RegisterInput,
};
pub use auth_service_impl::SeaOrmAuthService;
pub use confirmation_service_impl::SeaOrmConfirmationService;
pub use mailer::{EmailMessage, EmailSender, LogEmailSender, WebhookEmailSender, build_mailer};
