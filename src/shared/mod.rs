//! Machinery shared between [`crate::encode`] and [`crate::decode`]: the
//! border traversal machine, rANS tables, prediction schemes and the
//! quantization grid.

pub(crate) mod connectivity;
pub(crate) mod entropy;
pub(crate) mod prediction;
pub(crate) mod quantization;
