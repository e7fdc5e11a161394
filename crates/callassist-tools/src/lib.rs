//! Tools available to the transcript router.

pub mod sql_backend;
pub mod sql_lookup;

pub use sql_backend::{
    mock_data_record, LookupOutcome, Row, SqlBackend, SqlError, UnavailableBackend, WarehouseBackend,
    WarehouseConfig,
};
pub use sql_lookup::{SqlLookupTool, DEFAULT_CATALOG_SCHEMA, SQL_LOOKUP_TOOL_NAME};
