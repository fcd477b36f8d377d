#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Bag(#[from] bag::BagError),

    #[error(transparent)]
    Playback(#[from] playback::PlaybackError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
