pub mod batch_update;
pub mod dialect;
pub mod executor;
pub mod postgres;
pub mod sql_type_wrapper;
