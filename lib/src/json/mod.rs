//! Reading compiled stories and reading/writing saved state as JSON.
pub(crate) mod json_read;
pub(crate) mod json_write;
