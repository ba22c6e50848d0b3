// src/output.rs
use crate::error::Result;
use crate::types::{OutputConfig, SubscoutError};
use log::info;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Deterministic sink for one run: hostname per line, ascending, to
/// stdout or a file.
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn write_hostnames(&self, hostnames: &BTreeSet<String>) -> Result<()> {
        if let Some(file_path) = &self.config.file {
            self.write_to_file(file_path, hostnames)
        } else {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_lines(&mut handle, hostnames)
        }
    }

    fn write_to_file(&self, file_path: &str, hostnames: &BTreeSet<String>) -> Result<()> {
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SubscoutError::OutputError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let mut file = File::create(file_path)
            .map_err(|e| SubscoutError::OutputError(format!("Failed to create file: {}", e)))?;
        write_lines(&mut file, hostnames)?;

        info!("Results written to: {}", file_path);
        Ok(())
    }
}

fn write_lines<W: Write>(writer: &mut W, hostnames: &BTreeSet<String>) -> Result<()> {
    for hostname in hostnames {
        writeln!(writer, "{}", hostname)
            .map_err(|e| SubscoutError::OutputError(e.to_string()))?;
    }
    Ok(())
}
