//! Member, savings, loan and settings operations over the record store

pub use self::error::{Category, Error, ErrorKind};
pub use self::service::*;

mod error;
mod service;
