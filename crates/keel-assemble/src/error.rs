use thiserror::Error;

use keel_aml::{AmlEditError, AmlEncodeError, AmlPath};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssembleError {
    #[error("configuration template root must be a JSON object")]
    TemplateNotAnObject,

    #[error("malformed configuration template: {0}")]
    MalformedTemplate(String),

    #[error("directive references table {index}, but the run holds {count}")]
    NoSuchTable { index: usize, count: usize },

    #[error("no namespace node at {path}")]
    MissingNode { path: AmlPath },

    #[error("cannot apply edit at {path}: {source}")]
    Edit {
        path: AmlPath,
        source: AmlEditError,
    },

    #[error(transparent)]
    Encode(#[from] AmlEncodeError),

    #[error("driver dependency cycle involving {id:?}")]
    DriverCycle { id: String },
}
