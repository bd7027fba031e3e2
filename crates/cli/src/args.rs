use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use hrms_core::preview::DEFAULT_PAGE_SIZE;
use hrms_core::upload::{FileCandidate, FileUpload, UploadPolicy};

#[derive(Debug, Parser)]
#[command(name = "hrms-import")]
#[command(about = "Import a spreadsheet into the HRMS through the import API")]
pub struct ImportArgs {
    /// Spreadsheet to import (csv, xlsx, xls)
    pub file: PathBuf,

    /// Entity type to import into, overriding detection
    #[arg(short, long)]
    pub entity_type: Option<String>,

    /// Map a column to a field, e.g. `--map "DOB=date_of_birth"`
    #[arg(long = "map", value_name = "HEADER=FIELD", value_parser = parse_mapping)]
    pub mappings: Vec<(String, String)>,

    /// Leave a column out of the import
    #[arg(long = "skip", value_name = "HEADER")]
    pub skip: Vec<String>,

    /// Only show preview rows with errors
    #[arg(long)]
    pub errors_only: bool,

    /// Preview rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Preview page to show
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Run the import after the preview instead of stopping at the dry run
    #[arg(short, long)]
    pub yes: bool,
}

/// Parse `HEADER=FIELD`. The header may itself contain `=`; the last one
/// splits.
pub fn parse_mapping(s: &str) -> Result<(String, String), String> {
    let (header, field) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected HEADER=FIELD, got '{s}'"))?;
    let (header, field) = (header.trim(), field.trim());
    if header.is_empty() || field.is_empty() {
        return Err(format!("expected HEADER=FIELD, got '{s}'"));
    }
    Ok((header.to_string(), field.to_string()))
}

/// MIME type sent with the upload, by extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "csv" => Some("text/csv"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Some("application/vnd.ms-excel"),
        _ => None,
    }
}

fn upload_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Validate `path` against `policy` using its metadata only, so a file that
/// is too large is rejected before it is read.
pub async fn check_file(path: &Path, policy: &UploadPolicy) -> anyhow::Result<FileCandidate> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let candidate = FileCandidate::new(upload_filename(path), meta.len());
    policy.validate(&candidate)?;
    Ok(candidate)
}

/// Build the upload for `path` from its contents.
pub fn file_upload(path: &Path, bytes: Vec<u8>) -> FileUpload {
    let upload = FileUpload::new(upload_filename(path), bytes);
    match content_type_for(path) {
        Some(content_type) => upload.with_content_type(content_type),
        None => upload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ImportArgs {
        ImportArgs::try_parse_from(std::iter::once("hrms-import").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["payroll.csv"]);
        assert_eq!(args.file, PathBuf::from("payroll.csv"));
        assert_eq!(args.entity_type, None);
        assert!(args.mappings.is_empty());
        assert!(args.skip.is_empty());
        assert!(!args.errors_only);
        assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(args.page, 1);
        assert!(!args.yes);
    }

    #[test]
    fn repeated_overrides() {
        let args = parse(&[
            "staff.xlsx",
            "--entity-type",
            "employees",
            "--map",
            "DOB=date_of_birth",
            "--map",
            "Dept = department",
            "--skip",
            "Notes",
            "--errors-only",
            "--page-size",
            "10",
            "-y",
        ]);
        assert_eq!(args.entity_type.as_deref(), Some("employees"));
        assert_eq!(
            args.mappings,
            [
                ("DOB".to_string(), "date_of_birth".to_string()),
                ("Dept".to_string(), "department".to_string()),
            ]
        );
        assert_eq!(args.skip, ["Notes"]);
        assert!(args.errors_only);
        assert_eq!(args.page_size, 10);
        assert!(args.yes);
    }

    #[test]
    fn malformed_mapping_is_rejected() {
        assert!(ImportArgs::try_parse_from(["hrms-import", "a.csv", "--map", "DOB"]).is_err());
        assert!(parse_mapping("=date_of_birth").is_err());
        assert_eq!(
            parse_mapping("a=b=c").unwrap(),
            ("a=b".to_string(), "c".to_string())
        );
    }

    #[test]
    fn file_is_required() {
        assert!(ImportArgs::try_parse_from(["hrms-import"]).is_err());
    }

    #[test]
    fn upload_uses_file_name_and_mime() {
        let upload = file_upload(Path::new("/tmp/in/Payroll.CSV"), b"a,b\n".to_vec());
        assert_eq!(upload.filename, "Payroll.CSV");
        assert_eq!(upload.content_type.as_deref(), Some("text/csv"));

        let upload = file_upload(Path::new("notes.txt"), vec![]);
        assert_eq!(upload.content_type, None);
    }

    #[tokio::test]
    async fn size_is_checked_from_metadata() {
        let dir = std::env::temp_dir().join(format!("hrms-import-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let policy = UploadPolicy::new(["csv"], 1);

        let small = dir.join("small.csv");
        tokio::fs::write(&small, b"a,b\n").await.unwrap();
        let candidate = check_file(&small, &policy).await.unwrap();
        assert_eq!(candidate, FileCandidate::new("small.csv", 4));

        let big = dir.join("big.csv");
        tokio::fs::write(&big, vec![b'x'; 1024 * 1024]).await.unwrap();
        let err = check_file(&big, &policy).await.unwrap_err();
        assert!(err.to_string().contains("File must be under 1 MB"), "{err}");

        let err = check_file(&dir.join("missing.csv"), &policy).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"), "{err}");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
