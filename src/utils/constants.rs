/// EMBRACE magnetometer network: (longitude, latitude, code, active).
/// Coordinates are geographic, signed degrees.
pub const EMBRACE_STATIONS: &[(f64, f64, &str, bool)] = &[
    (-56.10, -9.87, "alf", false),
    (-48.12, -5.65, "ara", true),
    (-56.07, -15.55, "cba", true),
    (-54.62, -20.44, "cgr", true),
    (-72.10, -36.60, "chi", true),
    (-45.00, -22.70, "cxp", true),
    (-38.42, -3.88, "eus", true),
    (-51.72, -17.93, "jat", true),
    (-60.05, -2.89, "man", false),
    (-54.10, -25.30, "med", true),
    (-63.90, -8.76, "pve", false),
    (-67.75, -53.78, "rga", true),
    (-45.96, -23.21, "sjc", true),
    (-44.21, -2.59, "slz", true),
    (-53.82, -29.44, "sms", true),
    (-54.66, -2.43, "stm", true),
    (-65.23, -26.83, "tcm", true),
    (-43.65, -22.40, "vss", true),
];

/// Raw file layout
pub const HEADER_LINES: usize = 5;
pub const HEADER_COLUMN_TOKENS: usize = 10;
pub const DATA_COLUMNS: usize = 8;
pub const MAX_SAMPLES_PER_FILE: usize = 3600;

/// Archive naming
pub const ARCHIVE_EXTENSION: &str = "zip";
pub const STATION_CODE_LEN: usize = 3;

/// Soft sanity bounds (raw instrument units)
pub const DEFAULT_FIELD_MIN: f64 = -1.0e6;
pub const DEFAULT_FIELD_MAX: f64 = 1.0e6;
pub const DEFAULT_TEMPERATURE_MIN: f64 = -50.0;
pub const DEFAULT_TEMPERATURE_MAX: f64 = 100.0;

/// Batch runner defaults
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;
pub const DEFAULT_MIN_COVERAGE: f64 = 0.9;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 86_400;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
