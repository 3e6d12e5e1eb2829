use super::{encode, Emitter, PublishError};
use crate::record::Message;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tokio::sync::Mutex;

/// Appends one encoded message per line to a file
pub struct JsonlEmitter {
    file: Mutex<BufWriter<File>>,
}

impl JsonlEmitter {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        log::info!("📝 Publishing snapshots to: {}", path.display());

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[async_trait]
impl Emitter for JsonlEmitter {
    async fn publish(&self, message: &Message) -> Result<usize, PublishError> {
        let bytes = encode(message)?;
        let mut file = self.file.lock().await;
        file.write_all(&bytes)?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(bytes.len())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
