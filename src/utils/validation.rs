use crate::utils::error::{DemandError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DemandError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DemandError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(DemandError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 浮點數參數必須是有限值且不小於下限
pub fn validate_non_negative(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DemandError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number >= 0".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[&str],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        match std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(extension) if allowed_set.contains(extension.to_ascii_lowercase().as_str()) => {}
            Some(extension) => {
                return Err(DemandError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.to_string(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(DemandError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.to_string(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DemandError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if !(value >= min && value <= max) {
        return Err(DemandError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
