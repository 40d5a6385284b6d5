use std::io::{self, Write};

use serde::Serialize;

use crate::app::{EventLevel, ProgressEvent, ProgressSink, RunReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Human-readable size with one decimal, base 1024. Absent or zero sizes
/// print as `Unknown`.
pub fn format_size(size_bytes: Option<u64>) -> String {
    let Some(size) = size_bytes.filter(|size| *size > 0) else {
        return "Unknown".to_string();
    };
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}TB")
}

/// Prints progress lines as they happen: info on stdout, warnings on stderr.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.level {
            EventLevel::Info => println!("{}", event.message),
            EventLevel::Warn => eprintln!("{}", event.message),
        }
    }
}

impl ConsoleOutput {
    pub fn print_summary(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_summary(&mut stdout, report)
    }

    pub fn write_summary<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
        let rule = "=".repeat(60);
        writeln!(out)?;
        writeln!(out, "{rule}")?;
        writeln!(out, "Summary Report:")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "Dataset: {}", report.accession)?;
        writeln!(out, "Total files found: {}", report.stats.total)?;
        writeln!(out, "GeneLab processed files: {}", report.stats.processed)?;
        writeln!(out, "Raw data files: {}", report.raw_files)?;

        if !report.list_only {
            writeln!(out, "Files downloaded: {}", report.stats.downloaded)?;
            writeln!(out, "Failed downloads: {}", report.stats.failed)?;
            writeln!(out, "Output directory: {}", report.output_dir)?;
            if report.stats.processed > 0 {
                writeln!(
                    out,
                    "GeneLab processed files saved to subdirectories: */{}",
                    report.processed_dir_name
                )?;
            }
        }

        let failed_passes = report.passes.iter().filter(|pass| pass.error.is_some()).count();
        if failed_passes > 0 {
            writeln!(out, "Failed queries: {failed_passes}")?;
        }

        writeln!(out)?;
        writeln!(out, "Applied filters:")?;
        let filters = &report.filters;
        if let Some(value) = &filters.measurement {
            writeln!(out, "  Measurement type: {value}")?;
        }
        if let Some(value) = &filters.technology {
            writeln!(out, "  Technology type: {value}")?;
        }
        if let Some(value) = &filters.include_ext {
            writeln!(out, "  File extension (include): {value}")?;
        }
        if let Some(value) = &filters.exclude_ext {
            writeln!(out, "  File extension (exclude): {value}")?;
        }
        if filters.processed_only {
            writeln!(out, "  GeneLab processed files only")?;
        }
        if filters.is_empty() {
            writeln!(out, "  None (all files)")?;
        }
        writeln!(out, "{rule}")?;
        Ok(())
    }
}

/// Keeps stdout for the final JSON report; warnings and failures still go
/// to stderr as they happen.
pub struct JsonOutput;

impl JsonOutput {
    pub fn write_event<W: Write>(out: &mut W, event: &ProgressEvent) -> io::Result<()> {
        if event.level == EventLevel::Warn {
            writeln!(out, "{}", event.message)?;
        }
        Ok(())
    }

    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        let _ = Self::write_event(&mut io::stderr().lock(), &event);
    }
}
