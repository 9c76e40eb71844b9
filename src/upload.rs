//! Request-scoped handling of an uploaded PDF
//!
//! The upload and the generated document live in temporary files owned by
//! this call; both are removed when it returns, on success or failure.

use crate::color::ColorRule;
use crate::pipeline::{BlueTextReport, Pipeline};
use crate::{BlueTextError, OUTPUT_FILE_NAME, PDF_CONTENT_TYPE};
use std::io::Write;
use tempfile::NamedTempFile;

/// Generated document ready to be sent back as a download
#[derive(Debug)]
pub struct Download {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub report: BlueTextReport,
}

/// Run the default pipeline on one uploaded file
pub fn process_upload(file_name: &str, bytes: &[u8]) -> Result<Download, BlueTextError> {
    Pipeline::default().process_upload(file_name, bytes)
}

impl<R: ColorRule> Pipeline<R> {
    /// Validate the upload name, stage the bytes on disk and rebuild them
    pub fn process_upload(&self, file_name: &str, bytes: &[u8]) -> Result<Download, BlueTextError> {
        validate_file_name(file_name)?;

        let mut input = pdf_temp_file()?;
        input.write_all(bytes)?;
        input.flush()?;
        let output = pdf_temp_file()?;

        let mut report = self.run(input.path(), output.path())?;
        let bytes = std::fs::read(output.path())?;
        // The path dies with the temp file
        report.output = None;

        log::debug!("upload {} rebuilt into {} bytes", file_name, bytes.len());
        Ok(Download {
            file_name: OUTPUT_FILE_NAME,
            content_type: PDF_CONTENT_TYPE,
            bytes,
            report,
        })
    }
}

fn validate_file_name(file_name: &str) -> Result<(), BlueTextError> {
    if file_name.trim().is_empty() {
        return Err(BlueTextError::InvalidUpload("no file selected".into()));
    }
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(BlueTextError::InvalidUpload(format!(
            "{} is not a PDF file",
            file_name
        )));
    }
    Ok(())
}

fn pdf_temp_file() -> Result<NamedTempFile, BlueTextError> {
    Ok(tempfile::Builder::new().suffix(".pdf").tempfile()?)
}
