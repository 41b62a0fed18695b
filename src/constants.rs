pub mod roles {
    pub const SUPER_ADMIN: &str = "SUPER_ADMIN";

    pub const TECNICO: &str = "TECNICO";

    pub const ADMIN_FINCA: &str = "ADMIN_FINCA";

    pub const ALL: &[&str] = &[SUPER_ADMIN, TECNICO, ADMIN_FINCA];

    #[must_use]
    pub fn is_valid(role: &str) -> bool {
        ALL.contains(&role)
    }
}

pub mod auth {
    /// Confirmation codes are zero-padded 6-digit numbers.
    pub const CODE_LENGTH: usize = 6;

    pub const MIN_PASSWORD_LENGTH: usize = 8;

    /// Session keys stored in the cookie session.
    pub const SESSION_TOKEN_KEY: &str = "session_token";

    pub const PENDING_EMAIL_KEY: &str = "pending_email";

    pub const RESET_STATE_KEY: &str = "password_reset";
}

pub mod pagination {
    pub const DEFAULT_PAGE_SIZE: u64 = 25;

    pub const MAX_PAGE_SIZE: u64 = 100;
}
