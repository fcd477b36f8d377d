#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Bag(#[from] bag::BagError),

    #[error("udp sink ({target}): {source}")]
    Sink { target: String, source: std::io::Error },

    #[error("udp feed ({addr}): {source}")]
    Feed { addr: String, source: std::io::Error },
}
