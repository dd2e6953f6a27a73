use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("The type {0} isn't a valid type.")]
    UnknownAlias(String),

    #[error("Passivity lookup failed: {0}")]
    Lookup(String),

    #[error("{0}")]
    Other(String),
}
