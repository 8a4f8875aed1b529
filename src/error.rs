use std::fmt;

#[derive(Debug)]
pub enum CodeSheetError {
    Validation(String),
    Render(String),
    InvalidGeometry(String),
    Assembly(String),
    Io(std::io::Error),
}

impl fmt::Display for CodeSheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSheetError::Validation(message) => write!(f, "invalid input: {}", message),
            CodeSheetError::Render(message) => write!(f, "code rendering failed: {}", message),
            CodeSheetError::InvalidGeometry(message) => {
                write!(f, "invalid geometry: {}", message)
            }
            CodeSheetError::Assembly(message) => {
                write!(f, "document assembly failed: {}", message)
            }
            CodeSheetError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for CodeSheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodeSheetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CodeSheetError {
    fn from(value: std::io::Error) -> Self {
        CodeSheetError::Io(value)
    }
}
