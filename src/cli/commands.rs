use crate::archive::{ArchiveInspector, ArchiveProcessor, ArchiveReader};
use crate::cli::args::{Cli, Commands, OutputFormat};
use crate::config::{Settings, SettingsOverrides};
use crate::error::Result;
use crate::models::{RunSummary, StationCatalog, TimeSeries};
use crate::processors::{DataMerger, IntegrityChecker, ParallelProcessor};
use crate::readers::RecordParser;
use crate::utils::filename::{
    generate_default_parquet_filename, generate_merged_filename, NameResolver,
};
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, ParquetWriter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;

    match cli.command {
        Commands::Process {
            input_dir,
            output_file,
            output_dir,
            format,
            merge,
            century_pivot,
            default_year,
            max_workers,
            io_timeout,
            max_retries,
            compression,
            strict_merge,
            required_stations,
            station_catalog,
            summary_json,
            validate_only,
        } => {
            let overrides = SettingsOverrides {
                century_pivot,
                max_workers,
                io_timeout_secs: io_timeout,
                max_retries,
                strict_merge: strict_merge.then_some(true),
                required_stations,
                station_catalog,
                default_year,
                compression,
                min_coverage: None,
            };
            let settings = Settings::load(cli.config.as_deref(), &overrides)?;

            let options = ProcessOptions {
                input_dir,
                output_file,
                output_dir,
                format,
                merge,
                summary_json,
                validate_only,
                quiet,
            };
            process(&settings, &options).await?;
        }

        Commands::Inspect {
            input_dir,
            century_pivot,
            default_year,
            extract_to,
        } => {
            let overrides = SettingsOverrides {
                century_pivot,
                default_year,
                ..Default::default()
            };
            let settings = Settings::load(cli.config.as_deref(), &overrides)?;
            inspect(&settings, &input_dir, extract_to.as_deref())?;
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;
            println!("\n{}", file_info.summary());

            if sample > 0 {
                println!("\nSample rows (showing up to {}):", sample);
                for (i, row) in writer.read_rows(&file, sample)?.iter().enumerate() {
                    let value = |v: Option<f64>| {
                        v.map(|v| format!("{:.1}", v))
                            .unwrap_or_else(|| "-".to_string())
                    };
                    println!(
                        "{}. {} {}: H={} D={} Z={} T1={} T2={}{}",
                        i + 1,
                        row.station,
                        row.timestamp,
                        value(row.horizontal),
                        value(row.declination),
                        value(row.vertical),
                        value(row.temp1),
                        value(row.temp2),
                        if row.observed { "" } else { " (missing)" }
                    );
                }
            }
        }
    }

    Ok(())
}

struct ProcessOptions {
    input_dir: PathBuf,
    output_file: Option<PathBuf>,
    output_dir: PathBuf,
    format: OutputFormat,
    merge: bool,
    summary_json: Option<PathBuf>,
    validate_only: bool,
    quiet: bool,
}

fn build_resolver(settings: &Settings) -> Result<(Arc<StationCatalog>, NameResolver)> {
    let catalog = Arc::new(settings.load_catalog()?);
    let resolver = NameResolver::new(Arc::clone(&catalog), settings.century_pivot()?);
    Ok((catalog, resolver))
}

async fn process(settings: &Settings, options: &ProcessOptions) -> Result<()> {
    let (catalog, resolver) = build_resolver(settings)?;

    info!("Scanning {}", options.input_dir.display());
    let inspector =
        ArchiveInspector::new(resolver.clone()).with_default_year(settings.default_year);
    let spinner = ProgressReporter::new_spinner("Scanning archives...", options.quiet);
    let metadata = inspector.scan(&options.input_dir)?;
    spinner.finish_with_message(&format!("Found {} archives", metadata.entries.len()));
    println!("{}", metadata.display_summary());

    let partitions = metadata.partitions();
    let loader = ArchiveProcessor::new(ArchiveReader::new(resolver))
        .with_record_parser(RecordParser::new().with_bounds(settings.sanity_bounds()));
    let processor = ParallelProcessor::new(loader, Arc::clone(&catalog), settings.max_workers)
        .with_io_timeout(settings.io_timeout())
        .with_max_retries(settings.max_retries)
        .with_retry_backoff(settings.retry_backoff());

    let cancellation = processor.cancellation();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing files in flight");
            cancellation.cancel();
        }
    });

    let progress = ProgressReporter::new(
        partitions.len() as u64,
        "Assembling station-days...",
        options.quiet,
    );
    let result = processor
        .process_partitions(partitions, Some(&progress))
        .await;
    ctrl_c.abort();
    let result = result?;
    progress.finish_with_message(&format!("Assembled {} daily series", result.series.len()));

    let mut summary = RunSummary::default();
    summary.extend(metadata.rejected);
    summary.extend(result.summary.outcomes);
    summary.sort();

    let checker = IntegrityChecker::new().with_min_coverage(settings.min_coverage);
    let report = checker.check_integrity(&result.series, &summary);
    println!("\n{}", checker.generate_summary(&report, &summary));

    if let Some(path) = &options.summary_json {
        create_parent(path)?;
        let json = summary.to_json().map_err(std::io::Error::from)?;
        fs::write(path, json)?;
        info!("Run summary written to {}", path.display());
    }

    if options.validate_only {
        println!("Validation complete - no output written");
        return Ok(());
    }

    if result.series.is_empty() {
        println!("No series to write");
        return Ok(());
    }

    write_outputs(settings, options, &catalog, &result.series)
}

fn write_outputs(
    settings: &Settings,
    options: &ProcessOptions,
    catalog: &StationCatalog,
    series: &[TimeSeries],
) -> Result<()> {
    let parquet = ParquetWriter::new()
        .with_compression(&settings.compression)?
        .with_row_group_size(settings.row_group_size);
    let csv = CsvWriter::new(&options.output_dir);

    if options.format.parquet() {
        let path = options
            .output_file
            .clone()
            .unwrap_or_else(generate_default_parquet_filename);
        create_parent(&path)?;

        println!("Writing {} series to {}", series.len(), path.display());
        parquet.write_series(series, &path)?;
        println!("\n{}", parquet.get_file_info(&path)?.summary());
    }

    if options.format.csv() {
        let paths = csv.write_all(series)?;
        println!(
            "Wrote {} CSV files under {}",
            paths.len(),
            options.output_dir.display()
        );
    }

    if options.merge {
        let merger = DataMerger::new()
            .with_strict(settings.strict_merge)
            .with_required_stations(settings.required_stations.iter());

        for day_series in group_by_date(series) {
            let date = day_series[0].day.date();
            let merged = match merger.merge(day_series) {
                Ok(merged) => merged,
                Err(e) => {
                    warn!("Merge for {} failed: {}", date, e);
                    println!("Merge for {} failed: {}", date, e);
                    continue;
                }
            };

            if options.format.parquet() {
                let path = generate_merged_filename(&options.output_dir, date, "parquet");
                create_parent(&path)?;
                let rows = parquet.write_merged(&merged, catalog, &path)?;
                println!("Merged {} -> {} ({} rows)", date, path.display(), rows);
            }
            if options.format.csv() {
                let path = generate_merged_filename(&options.output_dir, date, "csv");
                let rows = csv.write_merged(&merged, catalog, &path)?;
                println!("Merged {} -> {} ({} rows)", date, path.display(), rows);
            }
        }
    }

    println!("Processing complete!");
    Ok(())
}

fn inspect(settings: &Settings, input_dir: &Path, extract_to: Option<&Path>) -> Result<()> {
    let (_, resolver) = build_resolver(settings)?;
    let inspector =
        ArchiveInspector::new(resolver.clone()).with_default_year(settings.default_year);
    let metadata = inspector.scan(input_dir)?;

    println!("{}", metadata.display_summary());
    for partition in metadata.partitions() {
        println!("  {}: {} hour files", partition.day, partition.len());
    }
    for rejected in &metadata.rejected {
        println!("  skipped {}: {:?}", rejected.path.display(), rejected.status);
    }

    if let Some(dir) = extract_to {
        let extraction = ArchiveReader::new(resolver).extract_to(&metadata.entries, dir)?;
        println!(
            "Extracted {} members to {} ({} skipped)",
            extraction.written.len(),
            dir.display(),
            extraction.skipped.len()
        );
    }

    Ok(())
}

/// Slices of consecutive series sharing a date. Input must be date-sorted.
fn group_by_date(series: &[TimeSeries]) -> Vec<&[TimeSeries]> {
    let mut groups = Vec::new();
    let mut start = 0;

    for i in 1..=series.len() {
        if i == series.len() || series[i].day.date() != series[start].day.date() {
            if start < i {
                groups.push(&series[start..i]);
            }
            start = i;
        }
    }

    groups
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StationDay, StationMetadata};

    fn series(station: &str, day: u16) -> TimeSeries {
        let meta = StationMetadata::new(station, -45.0, -23.0, true);
        TimeSeries::empty(StationDay::new(station, 2023, day).unwrap(), &meta)
    }

    #[test]
    fn test_group_by_date() {
        let all = vec![series("cba", 1), series("sjc", 1), series("cba", 2)];
        let groups = group_by_date(&all);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1][0].day.day_of_year(), 2);
        assert!(group_by_date(&[]).is_empty());
    }
}
