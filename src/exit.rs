use std::fmt;

use crate::api::ApiError;
use crate::views::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    InvalidArgs,
    RequestFailed,
    NotFound,
}

impl ExitCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::InvalidArgs => 2,
            ExitCode::RequestFailed => 10,
            ExitCode::NotFound => 11,
        }
    }
}

#[derive(Debug)]
pub struct ExitError {
    pub code: ExitCode,
    pub err: anyhow::Error,
}

impl ExitError {
    pub fn new(code: ExitCode, err: anyhow::Error) -> Self {
        Self { code, err }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.err.source()
    }
}

/// Explicit `ExitError` first, then the typed errors anywhere in the chain.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(exit) = err.downcast_ref::<ExitError>() {
        return exit.code.as_i32();
    }
    for cause in err.chain() {
        if cause.is::<ValidationError>() {
            return ExitCode::InvalidArgs.as_i32();
        }
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return api_exit_code(api).as_i32();
        }
    }
    ExitCode::RequestFailed.as_i32()
}

pub fn api_exit_code(err: &ApiError) -> ExitCode {
    match err {
        ApiError::NotFound => ExitCode::NotFound,
        ApiError::BaseUrl { .. } => ExitCode::InvalidArgs,
        _ => ExitCode::RequestFailed,
    }
}

pub fn invalid_args(message: impl Into<String>) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, anyhow::anyhow!(message.into())).into()
}

pub fn invalid_args_err(err: anyhow::Error) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, err).into()
}
