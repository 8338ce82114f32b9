use std::fmt::{Debug, Display};
use std::path::PathBuf;

use arcstr::ArcStr;
use thiserror::Error;

use crate::identity::ApiError;
use crate::layout::error::LayoutError;

pub type Result<T> = std::result::Result<T, PicletError>;

pub struct PicletError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl PicletError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }

    /// Returns `true` if this error should abort the whole batch rather than
    /// a single submission or pair.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.source,
            ErrorSource::ComponentNotFound { .. }
                | ErrorSource::Config(_)
                | ErrorSource::TomlParsing(_)
                | ErrorSource::MissingDirectory(_)
                | ErrorSource::LayerNotFound(_)
        )
    }
}

impl std::error::Error for PicletError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for PicletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error:\n{}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for item in self.context.iter() {
                writeln!(f, "\twhile {}", item)?;
            }
        }
        Ok(())
    }
}

impl Debug for PicletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for PicletError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl PicletError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<PicletError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    CreateDir(PathBuf),
    CreateFile(PathBuf),
    ReadFile(PathBuf),
    LoadSubmission(PathBuf),
    ComposePiclet(ArcStr),
    Component(ArcStr),
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            CreateDir(path) => write!(f, "creating directory {path:?}"),
            CreateFile(path) => write!(f, "creating file {path:?}"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            LoadSubmission(path) => write!(f, "loading submission {path:?}"),
            ComposePiclet(name) => write!(f, "composing {name}"),
            Component(name) => write!(f, "instantiating component {name}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("directory does not exist: {0:?}")]
    MissingDirectory(PathBuf),

    #[error("component {name} not found in library {library}")]
    ComponentNotFound { library: ArcStr, name: ArcStr },

    #[error("no such layer role: {0}")]
    LayerNotFound(String),

    #[error("unsupported layout format: {0}")]
    UnsupportedFormat(String),

    #[error("layout has no top cell")]
    NoTopCell,

    #[error("error while generating layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("verification tool failed: {0}")]
    Verification(String),

    #[error("github api error: {0}")]
    Api(#[from] ApiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("error parsing JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("error writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("unexpected error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
