/// Configuration-time failures. The caller may retry with different
/// parameters; nothing has been started when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("unsupported PCM encoding for this operation")]
    UnsupportedFormat,
    #[error("unsupported channel combination")]
    UnsupportedChannels,
    #[error("pin assignment overlaps or is out of range")]
    PinConflict,
    #[error("DMA channels overlap or are out of range")]
    DmaChannelConflict,
    #[error("state machine index out of range")]
    InvalidStateMachine,
    #[error("clock divider does not fit the divider register")]
    DividerOutOfRange,
    #[error("arena has too few buffers for the requested pools")]
    InsufficientBuffers,
    #[error("requested samples per buffer exceed the buffer capacity")]
    BufferTooSmall,
    #[error("buffer arena is already owned by another stream")]
    ArenaInUse,
    #[error("stream consumer format does not match the output format")]
    FormatMismatch,
    #[error("output is not in the state this operation requires")]
    InvalidState,
}
