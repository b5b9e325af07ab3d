use thiserror::Error;

/// Errors raised while authenticating a session's first frame.
///
/// Any of these aborts the session: the connection is closed after an
/// error frame, no further frames are processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("access token is required")]
    MissingToken,

    #[error("failed to parse handshake frame: {0}")]
    MalformedHandshake(String),

    #[error("token rejected: {0}")]
    TokenRejected(String),

    #[error("party has no recognized role: '{0}'")]
    UnknownRole(String),

    #[error("identity verifier unavailable: {0}")]
    VerifierUnavailable(String),
}

/// Errors in the framing protocol after authentication.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("failed to parse frame: {0}")]
    MalformedFrame(String),

    #[error("unknown message type")]
    UnknownFrameType,

    #[error("session is not authenticated")]
    Unauthenticated,

    #[error("session is not registered")]
    UnknownSession,

    #[error("session identity already set to a different party")]
    IdentityConflict,
}

/// Errors from record-store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors from the external conversation engine and its coordination.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Drain deadline elapsed while a prior run stayed active.
    #[error("thread {thread_id} still has an active run after {waited_secs}s")]
    ThreadBusy { thread_id: String, waited_secs: u64 },

    /// Run-completion deadline elapsed before a terminal status.
    #[error("run {run_id} did not complete after {waited_secs}s")]
    RunTimeout { run_id: String, waited_secs: u64 },

    #[error("engine request failed: {message}")]
    Provider { message: String },

    #[error("failed to parse engine response: {0}")]
    Deserialization(String),
}

/// Errors from static configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("assistant '{0}' is not configured")]
    UnknownAssistant(String),

    #[error("failed to read instructions for '{role}': {source_error}")]
    MissingInstructions { role: String, source_error: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Umbrella error for orchestration operations.
///
/// The frame-handling boundary converts these into `<type>_error` frames;
/// only [`AuthError`] on the first frame terminates the session.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
