use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure a run can hit falls into one of these kinds. None of them
/// is retried: configuration errors stop the process before the pipeline
/// starts, and retrieval or persistence errors stop the run at the window
/// where they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Missing or invalid range, step, or endpoint settings
    Config,
    /// Query executor failure for either source
    Retrieval,
    /// Result log creation, write, or flush failure
    Persistence,
    /// Filesystem failure outside the result logs
    Io,
    /// A pipeline task panicked or was torn down unexpectedly
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Retrieval => "ERR_RETRIEVAL",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the context an operator needs to act on
/// a failed run: which operation, which source, which window boundary.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    source_name: Option<String>,
    boundary: Option<u64>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            source_name: None,
            boundary: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the name of the source ("old" / "new") the failure came from
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Add the start boundary of the window being processed
    pub fn with_boundary(mut self, boundary: u64) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the source name context, if any
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Get the window boundary context, if any
    pub fn boundary(&self) -> Option<u64> {
        self.boundary
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(source_name) = &self.source_name {
            write!(f, " (source: {})", source_name)?;
        }
        if let Some(boundary) = self.boundary {
            write!(f, " (boundary: {})", boundary)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Configuration validation failures
///
/// All of these are raised before any pipeline stage runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required setting was not provided
    #[error("{field} is not set")]
    MissingField { field: &'static str },

    /// A numeric setting could not be parsed as an unsigned integer
    #[error("failed to parse {field}: {value:?} is not an unsigned integer")]
    InvalidNumber { field: &'static str, value: String },

    /// The end boundary does not lie above the (clamped) start boundary
    #[error("END_HEIGHT ({end}) must be greater than START_HEIGHT ({start})")]
    EmptyRange { start: u64, end: u64 },

    /// Step must be positive
    #[error("STEP must be greater than 0")]
    ZeroStep,

    /// The endpoint file could not be read or parsed
    #[error("failed to load endpoint file {path}: {reason}")]
    EndpointFile { path: String, reason: String },
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        ExError::new(ExErrorKind::Config)
            .with_op("load_config")
            .with_message(err.to_string())
    }
}
