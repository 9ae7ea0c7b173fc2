use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("cannot open transcript {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
