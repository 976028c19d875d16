use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemandError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported input format for {path}: {reason}")]
    InputFormatError { path: String, reason: String },

    #[error("{source_name} data unavailable: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("No active blocks in area '{area}' (no block has population or jobs)")]
    NoActiveData { area: String },

    #[error("Data processing error in {stage}: {message}")]
    ProcessingError { stage: String, message: String },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Input,
    Configuration,
    Data,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DemandError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DemandError::IoError(_) => ErrorCategory::Io,
            DemandError::CsvError(_)
            | DemandError::SerializationError(_)
            | DemandError::InputFormatError { .. } => ErrorCategory::Input,
            DemandError::TomlError(_)
            | DemandError::ConfigError { .. }
            | DemandError::MissingConfigError { .. }
            | DemandError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DemandError::DataUnavailable { .. } | DemandError::NoActiveData { .. } => {
                ErrorCategory::Data
            }
            DemandError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 有備援策略可用
            DemandError::DataUnavailable { .. } => ErrorSeverity::Low,
            // 只影響單一區域
            DemandError::NoActiveData { .. } => ErrorSeverity::Medium,
            DemandError::CsvError(_)
            | DemandError::SerializationError(_)
            | DemandError::InputFormatError { .. }
            | DemandError::ProcessingError { .. } => ErrorSeverity::High,
            DemandError::IoError(_)
            | DemandError::TomlError(_)
            | DemandError::ConfigError { .. }
            | DemandError::MissingConfigError { .. }
            | DemandError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DemandError::IoError(_) => {
                "Check that the input files exist and the output directory is writable".to_string()
            }
            DemandError::CsvError(_) => {
                "Check the CSV header row and that every row has the same number of columns"
                    .to_string()
            }
            DemandError::SerializationError(_) => {
                "Check that JSON inputs are an array of objects".to_string()
            }
            DemandError::TomlError(_) => "Check the TOML syntax of the run configuration".to_string(),
            DemandError::ConfigError { .. } | DemandError::InvalidConfigValueError { .. } => {
                "Fix the configuration value and run again".to_string()
            }
            DemandError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration", field)
            }
            DemandError::InputFormatError { .. } => {
                "Use a .csv or .json input file".to_string()
            }
            DemandError::DataUnavailable { .. } => {
                "A heuristic employment estimate will be used instead".to_string()
            }
            DemandError::NoActiveData { .. } => {
                "Check the field mapping and that the block file carries population counts"
                    .to_string()
            }
            DemandError::ProcessingError { .. } => {
                "Run with --verbose to see which stage failed".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Could not read or write a file: {}", self),
            ErrorCategory::Input => format!("Input data could not be parsed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Area data problem: {}", self),
            ErrorCategory::Processing => format!("Demand model generation failed: {}", self),
        }
    }

    /// 依嚴重程度決定 CLI 退出碼，任何錯誤都不為 0
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, DemandError>;
