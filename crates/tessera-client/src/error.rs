/// Errors surfaced by the protocol layer.
///
/// Every failure is a distinct condition so callers can tell a server
/// protocol violation apart from caller misuse and from an operation that is
/// simply still pending. None of these are retried internally; retry policy
/// belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The streamed read contract was violated: an empty chunk, a chunk
    /// setting more than one variant, a commit that is not the final chunk
    /// of its message, or an explicit false reset/commit signal.
    #[error("malformed stream: {0}")]
    MalformedStream(&'static str),

    /// A message's row key disagrees with the row currently being
    /// accumulated.
    #[error("row key mismatch: accumulating {expected:?}, message carries {found:?}")]
    RowKeyMismatch { expected: String, found: String },

    /// An operation was attempted after a terminal state, such as updating
    /// an already-committed row or polling with no operation pending.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The buffer holds more mutations than the server accepts in one
    /// atomic write. Raised before any network call.
    #[error("too many mutations: {count} buffered, limit is {limit}")]
    TooManyMutations { count: usize, limit: usize },

    /// An operation name, resource name, required field, or payload type
    /// does not match what the client expects. Signals an API or version
    /// mismatch, never a transient condition.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Polling exhausted its attempt budget without observing completion.
    #[error("operation timed out after {attempts} polls")]
    OperationTimedOut { attempts: u32 },

    /// Carrier for failures raised by service implementations. The protocol
    /// layer never constructs or translates this variant; it exists so
    /// transport errors pass through unchanged.
    #[error("transport failure: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Renders a row key for error messages. Keys are arbitrary bytes; invalid
/// UTF-8 is replaced rather than escaped.
pub(crate) fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
