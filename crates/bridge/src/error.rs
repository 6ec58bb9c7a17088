use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] mailgram_render::Error),

    #[error(transparent)]
    Telegram(#[from] mailgram_telegram::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
