use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("host is required")]
    MissingHost,
}

pub type Result<T> = std::result::Result<T, ControllerError>;
