//! Zip archiving. Rollback extracts the archive back into the destination
//! and removes it.

use super::{collect_files, file_name, parse_target, require_str, Operation};
use crate::core::error::Result;
use crate::core::types::Task;
use std::io::{Read, Write};
use std::path::PathBuf;
use zip::write::SimpleFileOptions;

pub struct ZipOp {
    task: Task,
    archive: Option<PathBuf>,
    ok: bool,
}

impl ZipOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            archive: None,
            ok: true,
        }
    }

    /// Archive path once execute has run.
    pub fn archive_path(&self) -> Option<&PathBuf> {
        self.archive.as_ref()
    }
}

impl Operation for ZipOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let destination = PathBuf::from(require_str(&self.task, "destination")?);
        let rename = require_str(&self.task, "rename")?;
        let selection = parse_target(&require_str(&self.task, "target")?);
        let deflate = self.task.get_bool("deflate").unwrap_or(false);

        let archive_path = destination.join(format!("{rename}.zip"));
        let files: Vec<_> =
            super::select_files(collect_files(&destination, false)?, &selection)
                .into_iter()
                .filter(|f| f != &archive_path)
                .collect();

        let out = std::fs::File::create(&archive_path)?;
        let mut writer = zip::ZipWriter::new(out);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for file in files {
            let entry_name = if deflate {
                file_name(&file)
            } else {
                file.strip_prefix(&destination)
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| file_name(&file))
            };
            writer.start_file(entry_name, options)?;
            let mut content = Vec::new();
            std::fs::File::open(&file)?.read_to_end(&mut content)?;
            writer.write_all(&content)?;
        }
        writer.finish()?;
        self.archive = Some(archive_path);
        Ok(())
    }

    fn rollback(&mut self) {
        let Some(archive_path) = self.archive.take() else {
            return;
        };
        let destination = archive_path.parent().map(PathBuf::from).unwrap_or_default();
        let result = (|| -> Result<()> {
            let file = std::fs::File::open(&archive_path)?;
            let mut archive = zip::ZipArchive::new(file)?;
            archive.extract(&destination)?;
            std::fs::remove_file(&archive_path)?;
            Ok(())
        })();
        if let Err(e) = result {
            tracing::warn!(archive = %archive_path.display(), error = %e, "rollback could not unpack archive");
        }
    }

    fn state(&self) -> bool {
        self.ok
    }

    fn set_state(&mut self, ok: bool) {
        self.ok = ok;
    }
}
