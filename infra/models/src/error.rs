use std::borrow::Cow;

/// A specialized [`ModelError`] enum of this crate.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A definition file is missing or does not parse.
    #[error("Definition config error{}: {source}", format_context(.context))]
    Config {
        #[source]
        source: config::ConfigError,
        context: Option<Cow<'static, str>>,
    },

    /// Filesystem access to the model directory failed.
    #[error("Model IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    /// A definition references an extension or parent that cannot be resolved,
    /// or a schema declaration is malformed.
    #[error("Schema build error{}: {message}", format_context(.context))]
    SchemaBuild { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A model references a connection that is not registered.
    #[error("Connection error{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A pre hook aborted the wrapped operation.
    #[error("Hook aborted{}: {message}", format_context(.context))]
    Hook { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A wrapper for underlying `SurrealDB` driver errors.
    #[error("SurrealDB error{}: {source}", format_context(.context))]
    Surreal {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal model error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ModelError {
    fn with_context(self, context: Cow<'static, str>) -> Self {
        let context = Some(context);
        match self {
            Self::Config { source, .. } => Self::Config { source, context },
            Self::Io { source, .. } => Self::Io { source, context },
            Self::SchemaBuild { message, .. } => Self::SchemaBuild { message, context },
            Self::Connection { message, .. } => Self::Connection { message, context },
            Self::Hook { message, .. } => Self::Hook { message, context },
            Self::Surreal { source, .. } => Self::Surreal { source, context },
            Self::Internal { message, .. } => Self::Internal { message, context },
        }
    }
}

impl From<surrealdb::Error> for ModelError {
    fn from(source: surrealdb::Error) -> Self {
        Self::Surreal { source, context: None }
    }
}

impl From<config::ConfigError> for ModelError {
    fn from(source: config::ConfigError) -> Self {
        Self::Config { source, context: None }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

impl From<&'static str> for ModelError {
    fn from(message: &'static str) -> Self {
        Self::Internal { message: message.into(), context: None }
    }
}

impl From<String> for ModelError {
    fn from(message: String) -> Self {
        Self::Internal { message: message.into(), context: None }
    }
}

/// Adds `.context(...)` to results convertible into [`ModelError`].
pub trait ModelErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ModelError>;
}

impl<T> ModelErrorExt<T> for Result<T, ModelError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ModelError> {
        self.map_err(|error| error.with_context(context.into()))
    }
}

impl<T> ModelErrorExt<T> for Result<T, surrealdb::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ModelError> {
        self.map_err(|source| ModelError::Surreal { source, context: Some(context.into()) })
    }
}

impl<T> ModelErrorExt<T> for Result<T, config::ConfigError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ModelError> {
        self.map_err(|source| ModelError::Config { source, context: Some(context.into()) })
    }
}

impl<T> ModelErrorExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ModelError> {
        self.map_err(|source| ModelError::Io { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> String {
    context.as_ref().map_or_else(String::new, |context| format!(" ({context})"))
}
