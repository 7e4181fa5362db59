use thiserror::Error;

use crate::ids::DeviceId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error(
        "inconsistent CPU topology: {performance} performance + {efficiency} efficiency cores \
         exceed {logical} logical processors"
    )]
    InconsistentTopology {
        performance: u16,
        efficiency: u16,
        logical: u16,
    },

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("more than one GPU is marked as the primary display device ({first} and {second})")]
    MultiplePrimaryGpus { first: DeviceId, second: DeviceId },

    #[error("unrecognized hardware identifier {0:?} (expected \"VVVV:DDDD\" hex pair)")]
    UnrecognizedIdentifier(String),
}
