use crate::error::{ProcessingError, Result};
use crate::models::{MergedDay, StationCatalog, TimeSeries};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::{merged_rows, series_rows, ExportRow};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write station-day series, 86400 rows each, to one file.
    pub fn write_series(&self, series: &[TimeSeries], path: &Path) -> Result<usize> {
        self.write_rows(series.iter().flat_map(|s| series_rows(s)), path)
    }

    /// Write a merged day in long form: one row per station per second.
    pub fn write_merged(
        &self,
        day: &MergedDay,
        catalog: &StationCatalog,
        path: &Path,
    ) -> Result<usize> {
        self.write_rows(merged_rows(day, catalog), path)
    }

    fn write_rows<I>(&self, rows: I, path: &Path) -> Result<usize>
    where
        I: IntoIterator<Item = ExportRow>,
    {
        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        let mut chunk = Vec::with_capacity(self.row_group_size);
        let mut written = 0;

        for row in rows {
            chunk.push(row);
            if chunk.len() == self.row_group_size {
                writer.write(&self.rows_to_batch(&chunk, schema.clone())?)?;
                written += chunk.len();
                chunk.clear();
            }
        }

        if !chunk.is_empty() {
            writer.write(&self.rows_to_batch(&chunk, schema.clone())?)?;
            written += chunk.len();
        }

        writer.close()?;
        info!("Wrote {} rows to {}", written, path.display());
        Ok(written)
    }

    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new("station", DataType::Utf8, false),
            Field::new("timestamp", DataType::Timestamp(TimeUnit::Second, None), false),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
            Field::new("observed", DataType::Boolean, false),
            Field::new("valid", DataType::Boolean, true),
            Field::new("horizontal", DataType::Float64, true),
            Field::new("declination", DataType::Float64, true),
            Field::new("vertical", DataType::Float64, true),
            Field::new("temp1", DataType::Float64, true),
            Field::new("temp2", DataType::Float64, true),
        ];

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(&self, rows: &[ExportRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let stations: Vec<&str> = rows.iter().map(|r| r.station.as_str()).collect();
        let timestamps: Vec<i64> = rows
            .iter()
            .map(|r| r.timestamp.and_utc().timestamp())
            .collect();
        let latitudes: Vec<Option<f64>> = rows.iter().map(|r| r.latitude).collect();
        let longitudes: Vec<Option<f64>> = rows.iter().map(|r| r.longitude).collect();
        let observed: Vec<bool> = rows.iter().map(|r| r.observed).collect();
        let valid: Vec<Option<bool>> = rows.iter().map(|r| r.valid).collect();
        let channel = |f: fn(&ExportRow) -> Option<f64>| -> ArrayRef {
            Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
        };

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(stations)),
                Arc::new(TimestampSecondArray::from(timestamps)),
                Arc::new(Float64Array::from(latitudes)),
                Arc::new(Float64Array::from(longitudes)),
                Arc::new(BooleanArray::from(observed)),
                Arc::new(BooleanArray::from(valid)),
                channel(|r| r.horizontal),
                channel(|r| r.declination),
                channel(|r| r.vertical),
                channel(|r| r.temp1),
                channel(|r| r.temp2),
            ],
        )?;

        Ok(batch)
    }

    /// Read up to `limit` rows back from a file written by this writer.
    pub fn read_rows(&self, path: &Path, limit: usize) -> Result<Vec<ExportRow>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut rows = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let stations = column::<StringArray>(&batch, 0, "station")?;
            let timestamps = column::<TimestampSecondArray>(&batch, 1, "timestamp")?;
            let latitudes = column::<Float64Array>(&batch, 2, "latitude")?;
            let longitudes = column::<Float64Array>(&batch, 3, "longitude")?;
            let observed = column::<BooleanArray>(&batch, 4, "observed")?;
            let valid = column::<BooleanArray>(&batch, 5, "valid")?;
            let channels = (6..11)
                .map(|i| column::<Float64Array>(&batch, i, "channel"))
                .collect::<Result<Vec<_>>>()?;

            for i in 0..batch.num_rows() {
                if rows.len() >= limit {
                    return Ok(rows);
                }

                let timestamp = DateTime::from_timestamp(timestamps.value(i), 0)
                    .ok_or_else(|| {
                        ProcessingError::Config("Invalid timestamp in Parquet file".to_string())
                    })?
                    .naive_utc();

                rows.push(ExportRow {
                    station: stations.value(i).to_string(),
                    timestamp,
                    latitude: nullable(latitudes, i),
                    longitude: nullable(longitudes, i),
                    observed: observed.value(i),
                    valid: valid.is_valid(i).then(|| valid.value(i)),
                    horizontal: nullable(channels[0], i),
                    declination: nullable(channels[1], i),
                    vertical: nullable(channels[2], i),
                    temp1: nullable(channels[3], i),
                    temp2: nullable(channels[4], i),
                });
            }
        }

        Ok(rows)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, index: usize, name: &str) -> Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::Config(format!("Invalid {} column type", name)))
}

fn nullable(array: &Float64Array, i: usize) -> Option<f64> {
    array.is_valid(i).then(|| array.value(i))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}
