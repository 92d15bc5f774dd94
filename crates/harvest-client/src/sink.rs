use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use harvest_core::error::AppError;
use harvest_core::models::NormalizedJob;
use harvest_core::traits::Sink;

type BoxedWriter = csv::Writer<Box<dyn Write + Send>>;

/// CSV export: one row per record, header row first.
///
/// Columns follow the field order of [`NormalizedJob`], so the header is
/// stable across runs. Rows are buffered; call [`Sink::flush`] at the end.
#[derive(Clone)]
pub struct CsvSink {
    writer: Arc<Mutex<BoxedWriter>>,
}

impl CsvSink {
    /// Create (or truncate) a CSV file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            AppError::SinkError(format!("Cannot create {}: {e}", path.display()))
        })?;
        Ok(Self::from_writer(Box::new(BufWriter::new(file))))
    }

    /// Write CSV to standard output.
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(io::stdout()))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(csv::Writer::from_writer(writer))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoxedWriter> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for CsvSink {
    fn push(&self, record: NormalizedJob) -> Result<(), AppError> {
        self.lock()
            .serialize(&record)
            .map_err(|e| AppError::SinkError(format!("Failed to write CSV row: {e}")))
    }

    fn flush(&self) -> Result<(), AppError> {
        self.lock()
            .flush()
            .map_err(|e| AppError::SinkError(format!("Failed to flush CSV: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::models::ExperienceLevel;
    use harvest_core::testutil::sample_job;

    const HEADER: &str = "source_platform,title,company,location,contract,remote,salary,currency,\
                          description,requirements,experience_level,education_level,published_at,\
                          url,detected_at";

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        let sink = CsvSink::create(&path).unwrap();

        sink.push(sample_job()).unwrap();
        let mut second = sample_job();
        second.title = "Data Engineer".into();
        second.salary = None;
        second.experience_level = Some(ExperienceLevel::Junior);
        sink.push(second).unwrap();
        sink.flush().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers.join(","), HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "Welcome to the jungle");
        assert_eq!(&rows[0][1], "Backend Engineer");
        assert_eq!(&rows[0][6], "45000");
        assert_eq!(&rows[0][8], "Build services, in Rust.\n\nProfil : 3-5 ans");
        assert_eq!(&rows[0][10], "Mid");
        assert_eq!(&rows[0][11], "");
        assert_eq!(&rows[1][1], "Data Engineer");
        assert_eq!(&rows[1][6], "");
        assert_eq!(&rows[1][10], "Junior");
    }

    #[test]
    fn unwritable_path_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("jobs.csv");
        let err = CsvSink::create(&path).err().unwrap();
        assert!(matches!(err, AppError::SinkError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn clones_share_one_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        let sink = CsvSink::create(&path).unwrap();
        let clone = sink.clone();

        sink.push(sample_job()).unwrap();
        clone.push(sample_job()).unwrap();
        clone.flush().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 2);
    }
}
