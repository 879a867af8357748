/// Application-level failure: a message plus the process exit code.
///
/// Exit codes:
/// - `2`: input/output problems (missing file, bad column, non-numeric cell, write failure)
/// - `3`: no usable data rows
/// - `4`: fit or propagation failure
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of the numeric core (fit + propagation).
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Inputs that cannot define a weighted fit (empty, mismatched lengths,
    /// non-finite values, non-positive sigma).
    InvalidInput(String),
    /// The normal equations have no unique solution (e.g. all x equal).
    SingularFit(String),
    /// A propagated quantity came out non-finite or with negative variance.
    Numerical(String),
}

impl FitError {
    pub fn kind(&self) -> &'static str {
        match self {
            FitError::InvalidInput(_) => "invalid input",
            FitError::SingularFit(_) => "singular fit",
            FitError::Numerical(_) => "numerical error",
        }
    }
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::InvalidInput(msg) | FitError::SingularFit(msg) | FitError::Numerical(msg) => {
                write!(f, "{}: {msg}", self.kind())
            }
        }
    }
}

impl std::error::Error for FitError {}

impl From<FitError> for AppError {
    fn from(value: FitError) -> Self {
        AppError::new(4, format!("Fit failed ({value})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_code_four() {
        let err: AppError = FitError::SingularFit("all x equal".to_string()).into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().contains("singular fit: all x equal"));
    }
}
