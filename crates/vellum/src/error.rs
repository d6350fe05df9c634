use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed code, or code that failed while running.
    #[error("template evaluation failed for `{source_code}`: {message}")]
    TemplateEvaluation {
        source_code: String,
        message: String,
    },

    #[error("type error: {message}")]
    Type { message: String },

    #[error("no property named `{name}`")]
    MissingProperty { name: String },

    #[error("structural error: {message}")]
    Structural { message: String },
}

impl Error {
    pub fn evaluation(source_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateEvaluation {
            source_code: source_code.into(),
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    /// Attach the source snippet to an evaluation error raised deeper in the
    /// interpreter, where only the message was known.
    pub(crate) fn with_source(self, source_code: &str) -> Self {
        match self {
            Self::TemplateEvaluation {
                source_code: existing,
                message,
            } if existing.is_empty() => Self::TemplateEvaluation {
                source_code: source_code.to_owned(),
                message,
            },
            other => other,
        }
    }
}
