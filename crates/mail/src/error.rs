use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse MIME message ({size} bytes)")]
    Parse { size: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
