use thiserror::Error;

#[derive(Debug, Error)]
pub enum FerroError {
    #[error("actuator index {index} out of range: valid indices are 1..={count}")]
    Addressing { index: usize, count: usize },

    #[error("unrecognized request: {0}")]
    Decode(String),

    #[error("drive fault on pin {pin}: {reason}")]
    DriveFault { pin: u8, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FerroError {
    /// True for errors that leave an actuator in an unknown drive state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FerroError::DriveFault { .. })
    }
}

pub type Result<T> = std::result::Result<T, FerroError>;
