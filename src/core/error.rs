#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MountError {
    #[error("Invalid {0} value {1}")]
    OutOfRange(&'static str, f64),

    #[error("{0} is not set")]
    Unset(&'static str),

    #[error("{0} is invalid while mount is parked")]
    InvalidWhileParked(&'static str),
}

pub type Result<T> = std::result::Result<T, MountError>;
