/// User account errors.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("login name {login_name:?} collides with an existing account")]
    DuplicateSecondaryKey { login_name: String },
}
