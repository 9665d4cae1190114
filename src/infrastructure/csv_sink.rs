use crate::domain::order::OrderRecord;
use crate::domain::ports::OrderSink;
use crate::error::Result;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tokio::sync::Mutex;

/// Appends order records to a CSV file.
///
/// The header row is written only when the file starts out empty, so the log
/// survives restarts as a single table.
pub struct CsvOrderSink {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvOrderSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let is_empty = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

#[async_trait]
impl OrderSink for CsvOrderSink {
    async fn record(&self, order: OrderRecord) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.serialize(&order)?;
        writer.flush()?;
        Ok(())
    }
}
