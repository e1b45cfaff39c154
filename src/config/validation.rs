use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("job_binaries.max_kb must be positive")]
    InvalidMaxSize,

    #[error("job_binaries.fetch_timeout_secs must be positive")]
    InvalidFetchTimeout,

    #[error("job_binaries.staging_dir must be an absolute path, got '{0}'")]
    RelativeStagingDir(String),

    #[error("swift.url_suffix must start with '.', got '{0}'")]
    InvalidUrlSuffix(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_job_binaries(config)?;
    validate_swift(config)?;
    Ok(())
}

fn validate_job_binaries(config: &Config) -> Result<(), ValidationError> {
    let job_binaries = &config.job_binaries;

    if job_binaries.max_kb == 0 {
        return Err(ValidationError::InvalidMaxSize);
    }

    if job_binaries.fetch_timeout_secs == 0 {
        return Err(ValidationError::InvalidFetchTimeout);
    }

    if !job_binaries.staging_dir.starts_with('/') {
        return Err(ValidationError::RelativeStagingDir(
            job_binaries.staging_dir.clone(),
        ));
    }

    Ok(())
}

fn validate_swift(config: &Config) -> Result<(), ValidationError> {
    let suffix = &config.swift.url_suffix;
    if !suffix.starts_with('.') || suffix.len() < 2 {
        return Err(ValidationError::InvalidUrlSuffix(suffix.clone()));
    }
    Ok(())
}
