//! Per-area trait implementations for [`LibSqlBackend`].

mod conversations;
mod tasks;

pub(crate) use super::libsql_backend::{
    LibSqlBackend, fmt_ts, get_bool, get_opt_text, get_text, get_ts, get_uuid, opt_text,
};
