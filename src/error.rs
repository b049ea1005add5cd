use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckoutError {
    /// The transaction or the method catalog could not be fetched. Fatal to the
    /// session: it never leaves `loading`.
    #[error("payment link unavailable: {0}")]
    LinkUnavailable(String),
    #[error("store error: {0}")]
    Store(#[from] std::io::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
