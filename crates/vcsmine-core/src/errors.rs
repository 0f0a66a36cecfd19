use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on without
/// parsing messages. The kinds follow the persistence layer's error classes:
/// configuration, precondition, backend execution, consistency and soft
/// conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Preconditions
    InvalidArgument,
    IllegalState,
    NoSuchElement,

    // Construction
    Configuration,
    Unsupported,

    // Backend
    Backend,
    Decode,
    Io,

    // Corrupt schema or caller state
    ConsistencyViolation,
    OrderingViolation,

    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ExErrorKind::IllegalState => "ERR_ILLEGAL_STATE",
            ExErrorKind::NoSuchElement => "ERR_NO_SUCH_ELEMENT",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Unsupported => "ERR_UNSUPPORTED",
            ExErrorKind::Backend => "ERR_BACKEND",
            ExErrorKind::Decode => "ERR_DECODE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::ConsistencyViolation => "ERR_CONSISTENCY_VIOLATION",
            ExErrorKind::OrderingViolation => "ERR_ORDERING_VIOLATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether errors of this kind mean the store or its configuration is unusable
    ///
    /// Fatal kinds are never retried by callers; they abort the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Configuration
                | ExErrorKind::ConsistencyViolation
                | ExErrorKind::OrderingViolation
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling and optional
/// context (operation, entity type, entity id) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    entity_id: Option<i64>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity type context (e.g. "commit")
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add raw entity identifier context
    pub fn with_entity_id(mut self, id: i64) -> Self {
        self.entity_id = Some(id);
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

    /// See [`ExErrorKind::is_fatal`]
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the entity identifier context, if any
    pub fn entity_id(&self) -> Option<i64> {
        self.entity_id
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
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(entity_id) = self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
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

/// Violations of the Entity Contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// Identifier is not a positive integral value
    #[error("Invalid identifier {value}: identifiers must be positive")]
    InvalidIdentifier { value: i64 },

    /// Entity already carries a different identifier
    #[error("Identifier already assigned: {current}, refusing {requested}")]
    IdentifierReassigned { current: i64, requested: i64 },
}

impl From<EntityError> for ExError {
    fn from(err: EntityError) -> Self {
        match err {
            EntityError::InvalidIdentifier { value } => ExError::new(ExErrorKind::InvalidArgument)
                .with_op("set_id")
                .with_entity_id(value)
                .with_message("Identifiers must be positive"),

            EntityError::IdentifierReassigned { current, requested } => {
                ExError::new(ExErrorKind::IllegalState)
                    .with_op("set_id")
                    .with_entity_id(current)
                    .with_message(format!(
                        "Identifier already assigned, refusing {}",
                        requested
                    ))
            }
        }
    }
}
