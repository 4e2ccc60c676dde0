//! Import and export of common mesh interchange formats.

pub mod obj;
pub mod stl;

use thiserror::Error;

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    MeshError(#[from] crate::core::mesh::builder::Err),
    #[error(transparent)]
    ObjError(#[from] tobj::LoadError),
    #[error("parse error: {0}")]
    Parse(String),
}
