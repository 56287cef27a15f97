//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading over ledger entry records for the async replay
//! strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of EntryRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::EntryRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Maintains streaming behavior: at most one batch is held in memory.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of ledger entry records
    ///
    /// Reads up to `batch_size` rows. Rows that cannot be converted are
    /// logged and skipped.
    ///
    /// # Returns
    ///
    /// The converted records, or an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<EntryRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(error = %e, "skipping ledger entry"),
                },
                Some(Err(e)) => warn!(error = %e, "CSV parse error"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, Reference};
    use futures::io::Cursor;

    const HEADER: &str = "owner,category,status,amount,reference,description,created_at\n";

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let csv_content = format!(
            "{HEADER}p1,credit,success,100,A,,\np1,debit,success,50,B,,\np2,credit,success,200,C,,\n"
        );
        let mut async_reader = AsyncReader::new(Cursor::new(csv_content.into_bytes()));

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].request.reference, Reference::from("A"));
        assert_eq!(batch[1].request.reference, Reference::from("B"));

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].owner_id(), &OwnerId::from("p2"));

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = AsyncReader::new(Cursor::new(HEADER.as_bytes().to_vec()));
        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_record() {
        let csv_content = format!("{HEADER}p1,refund,success,100,A,,\np1,credit,success,50,B,,\n");
        let mut async_reader = AsyncReader::new(Cursor::new(csv_content.into_bytes()));

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].request.reference, Reference::from("B"));
    }
}
