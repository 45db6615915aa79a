//! Bundle packing: one Deflate zip with every file under a fixed folder.

use std::io::{Cursor, Write};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::Result;

/// Folder (and file stem) used inside bundles.
pub const BUNDLE_FOLDER: &str = "eviction_lab_export";

/// Pack `(extension, bytes)` entries as `eviction_lab_export/eviction_lab_export.{ext}`.
pub fn pack<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.add_directory(format!("{BUNDLE_FOLDER}/"), options)?;
    for (ext, bytes) in entries {
        zip.start_file(format!("{BUNDLE_FOLDER}/{BUNDLE_FOLDER}.{ext}"), options)?;
        zip.write_all(bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn entries_live_under_folder() {
        let bytes = pack([("csv", b"a,b\n".as_slice()), ("pdf", b"%PDF".as_slice())]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "eviction_lab_export/",
                "eviction_lab_export/eviction_lab_export.csv",
                "eviction_lab_export/eviction_lab_export.pdf",
            ]
        );
        let mut csv = String::new();
        archive
            .by_name("eviction_lab_export/eviction_lab_export.csv")
            .unwrap()
            .read_to_string(&mut csv)
            .unwrap();
        assert_eq!(csv, "a,b\n");
    }
}
