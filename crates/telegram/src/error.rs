use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// The Bot API answered with `ok: false`; carries its description.
    #[error("telegram api error ({status}): {description}")]
    Api { status: u16, description: String },

    #[error("{message}")]
    Message { message: String },
}

impl mailgram_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

mailgram_common::impl_context!();
