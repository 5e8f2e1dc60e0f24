use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("XML syntax error at {pos}: {message}")]
    Syntax { pos: u64, message: String },

    #[error("Unbalanced tags at {pos}: expected </{expected}>, found </{found}>")]
    UnbalancedTag {
        pos: u64,
        expected: String,
        found: String,
    },

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Document has more than one root element (second one is <{0}>)")]
    MultipleRoots(String),

    #[error("Text outside the root element at {pos}")]
    TextOutsideRoot { pos: u64 },

    #[error("Invalid attribute at {pos}: {message}")]
    Attribute { pos: u64, message: String },

    #[error("Unclosed element <{0}>")]
    Unclosed(String),
}

impl ModelError {
    pub fn syntax(pos: u64, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub fn unbalanced(pos: u64, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnbalancedTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn attribute(pos: u64, message: impl Into<String>) -> Self {
        Self::Attribute {
            pos,
            message: message.into(),
        }
    }
}
