use std::error;
use std::fmt;

use crate::installer::InstallerError;
use crate::k8s::K8sError;

/// Convenient result type for generator operations using [`GenError`] as the error type.
pub type GenResult<T> = Result<T, GenError>;

/// Main error type of the generator.
///
/// A [`GenError`] is either a single error, made of an [`ErrorKind`], a static description and an
/// optional dynamic detail, or an aggregate of many errors collected across the units of a batch.
#[derive(Debug, Clone)]
pub struct GenError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Many(Vec<GenError>),
}

/// Categories of failures, one per provisioning or cleanup step.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Provisioning
    InstallFailed,
    ExtractionFailed,
    ResolutionFailed,
    RegistrationFailed,

    // Cleanup
    ListFailed,
    DeleteFailed,

    // Decoding
    DeserializationError,
    DecodeError,
    SerializationError,

    // Configuration & workers
    ConfigError,
    WorkerPanic,

    Unknown,
}

impl GenError {
    /// Creates a [`GenError`] aggregating multiple errors.
    pub fn many(errors: Vec<GenError>) -> GenError {
        GenError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or [`ErrorKind::Unknown`] if
    /// there is none.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the dynamic detail of this error, or of the first aggregated error carrying one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }

    /// Replaces the kind of a single error, keeping its description and detail.
    ///
    /// Used when a lower level failure is attributed to the provisioning step it happened in.
    pub fn with_kind(self, kind: ErrorKind) -> GenError {
        let repr = match self.repr {
            ErrorRepr::WithDescription(_, desc) => ErrorRepr::WithDescription(kind, desc),
            ErrorRepr::WithDescriptionAndDetail(_, desc, detail) => {
                ErrorRepr::WithDescriptionAndDetail(kind, desc, detail)
            }
            many @ ErrorRepr::Many(_) => many,
        };

        GenError { repr }
    }
}

impl PartialEq for GenError {
    fn eq(&self, other: &GenError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")
                } else if errors.len() == 1 {
                    errors[0].fmt(f)
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl error::Error for GenError {}

impl From<(ErrorKind, &'static str)> for GenError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for GenError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl<E> From<Vec<E>> for GenError
where
    E: Into<GenError>,
{
    fn from(errors: Vec<E>) -> GenError {
        GenError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Converts [`serde_yaml::Error`] to [`GenError`] with [`ErrorKind::DeserializationError`].
impl From<serde_yaml::Error> for GenError {
    fn from(err: serde_yaml::Error) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::DeserializationError,
                "YAML deserialization failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`GenError`] with [`ErrorKind::SerializationError`].
impl From<serde_json::Error> for GenError {
    fn from(err: serde_json::Error) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::SerializationError,
                "JSON serialization failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`base64::DecodeError`] to [`GenError`] with [`ErrorKind::DecodeError`].
impl From<base64::DecodeError> for GenError {
    fn from(err: base64::DecodeError) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::DecodeError,
                "Base64 decoding failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`config::shared::ValidationError`] to [`GenError`] with [`ErrorKind::ConfigError`].
impl From<config::shared::ValidationError> for GenError {
    fn from(err: config::shared::ValidationError) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConfigError,
                "Invalid generate options",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`InstallerError`] to [`GenError`] with [`ErrorKind::InstallFailed`].
impl From<InstallerError> for GenError {
    fn from(err: InstallerError) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::InstallFailed,
                "Cluster installation failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`K8sError`] to [`GenError`] with [`ErrorKind::Unknown`].
///
/// Call sites attribute the error to their step through [`GenError::with_kind`].
impl From<K8sError> for GenError {
    fn from(err: K8sError) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::Unknown,
                "Kubernetes request failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`tokio::task::JoinError`] to [`GenError`] with [`ErrorKind::WorkerPanic`].
impl From<tokio::task::JoinError> for GenError {
    fn from(err: tokio::task::JoinError) -> GenError {
        GenError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::WorkerPanic,
                "Provisioning worker terminated abnormally",
                err.to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen_error;

    #[test]
    fn test_simple_error_creation() {
        let err = GenError::from((ErrorKind::ExtractionFailed, "No cluster entries"));
        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert_eq!(err.detail(), None);
        assert_eq!(err.kinds(), vec![ErrorKind::ExtractionFailed]);
    }

    #[test]
    fn test_error_with_detail() {
        let err = gen_error!(
            ErrorKind::ResolutionFailed,
            "Pod has no address",
            "vcluster-abcde-0"
        );
        assert_eq!(err.kind(), ErrorKind::ResolutionFailed);
        assert_eq!(err.detail(), Some("vcluster-abcde-0"));
    }

    #[test]
    fn test_multiple_errors() {
        let errors = vec![
            GenError::from((ErrorKind::ExtractionFailed, "No cluster entries")),
            GenError::from((ErrorKind::RegistrationFailed, "Secret already exists")),
        ];
        let err = GenError::many(errors);

        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::ExtractionFailed, ErrorKind::RegistrationFailed]
        );
    }

    #[test]
    fn test_empty_multiple_errors() {
        let err = GenError::many(vec![]);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.kinds().is_empty());
        assert_eq!(err.to_string(), "Multiple errors occurred (empty)");
    }

    #[test]
    fn test_with_kind_keeps_detail() {
        let err = GenError::from(K8sError::Exec("stream closed".to_string()))
            .with_kind(ErrorKind::ExtractionFailed);

        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert!(err.detail().unwrap().contains("stream closed"));
    }

    #[test]
    fn test_error_display() {
        let err = GenError::from((ErrorKind::ListFailed, "Namespaces could not be listed"));
        assert_eq!(err.to_string(), "ListFailed: Namespaces could not be listed");

        let err = gen_error!(ErrorKind::DeleteFailed, "Namespace deletion failed", "boom");
        assert_eq!(
            err.to_string(),
            "DeleteFailed: Namespace deletion failed -> boom"
        );
    }

    #[test]
    fn test_many_errors_display() {
        let err = GenError::many(vec![
            GenError::from((ErrorKind::ExtractionFailed, "a")),
            GenError::from((ErrorKind::RegistrationFailed, "b")),
        ]);

        assert_eq!(
            err.to_string(),
            "Multiple errors occurred (2 total):\n  1: ExtractionFailed: a\n  2: RegistrationFailed: b"
        );
    }
}
