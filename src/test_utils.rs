use crate::error::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::{CompressionMethod, ZipWriter};

/// A raw member with a valid header and `seconds` consecutive samples
/// starting at `hour:00:00`.
pub fn member_text(station: &str, day_of_year: u16, hour: u8, seconds: usize) -> String {
    let mut text = format!(
        "{} MAGNETOMETER 0112 <{:03}>\r\n\r\nHH MM SS H(Ch2) D(Ch4) Z(Ch6) T1 (Ch7) T2 (Ch8)\r\n\r\n\r\n",
        station.to_uppercase(),
        day_of_year
    );
    for i in 0..seconds {
        text.push_str(&format!(
            "{:02} {:02} {:02} {:.1} {:.1} {:.1} 25.3 24.9\r\n",
            hour,
            i / 60,
            i % 60,
            1234.5 + i as f64,
            567.8,
            910.1
        ));
    }
    text
}

/// Write a zip named `name` under `dir` with stored (uncompressed) members.
pub fn write_archive(dir: &Path, name: &str, members: &[(&str, &str)]) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(&path)?;
    let mut zip = ZipWriter::new(file);
    for (member, content) in members {
        zip.start_file(
            *member,
            zip::write::FileOptions::default().compression_method(CompressionMethod::Stored),
        )?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;

    Ok(path)
}
