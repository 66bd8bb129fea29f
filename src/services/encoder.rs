use crate::intake::attachment::{AttachmentDescriptor, EncodeJob};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Result of one background read, routed back to the slot it was started for.
#[derive(Debug)]
pub struct EncodeMsg {
    pub slot: u64,
    pub generation: u64,
    pub index: usize,
    pub outcome: Result<AttachmentDescriptor, String>,
}

pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "rtf" => "application/rtf",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Read a file fully and wrap it as a base64 data URL.
pub fn encode_file(path: &Path) -> Result<AttachmentDescriptor> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let dataurl = format!(
        "data:{};base64,{}",
        mime_for(path),
        general_purpose::STANDARD.encode(&bytes)
    );
    Ok(AttachmentDescriptor::new(filename, dataurl, bytes.len() as u64))
}

pub fn spawn_encode(job: EncodeJob, tx: Sender<crate::ui::LoadMsg>) {
    thread::spawn(move || {
        debug!(slot = job.slot, generation = job.generation, path = %job.path.display(), "encode start");
        let outcome = encode_file(&job.path).map_err(|e| format!("{e:#}"));
        debug!(slot = job.slot, ok = outcome.is_ok(), "encode finished");
        let _ = tx.send(crate::ui::LoadMsg::Encoded(EncodeMsg {
            slot: job.slot,
            generation: job.generation,
            index: job.index,
            outcome,
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn encodes_bytes_as_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.TXT");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();
        let d = encode_file(&path).unwrap();
        assert_eq!(d.filename, "note.TXT");
        assert_eq!(d.dataurl, "data:text/plain;base64,aGVsbG8=");
        assert_eq!(d.size, 5);
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(mime_for(Path::new("scan.heic")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("cv.PDF")), "application/pdf");
    }

    #[test]
    fn missing_file_is_an_error_naming_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = encode_file(&dir.path().join("gone.pdf")).unwrap_err();
        assert!(format!("{err:#}").contains("gone.pdf"));
    }

    #[test]
    fn spawn_reports_back_on_channel() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 16]).unwrap();
        let (tx, rx) = mpsc::channel();
        spawn_encode(
            EncodeJob {
                slot: 4,
                generation: 9,
                index: 1,
                path: file.path().to_path_buf(),
            },
            tx,
        );
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            crate::ui::LoadMsg::Encoded(m) => {
                assert_eq!((m.slot, m.generation, m.index), (4, 9, 1));
                assert_eq!(m.outcome.unwrap().size, 16);
            }
            _ => panic!("expected an encode message"),
        }
    }
}
