pub mod console;
pub mod csv_sink;
pub mod in_memory;
pub mod market;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
