use std::io;
use std::path::PathBuf;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    #[error("unsupported file type: '{}'", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("failed to decode '{}': {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("failed to probe '{}': {message}", .path.display())]
    Probe { path: PathBuf, message: String },

    #[error("failed to run {program} (is it installed and on PATH?): {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("audio output unavailable: {message}")]
    Audio { message: String },

    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MediaError {
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode { path: path.into(), message: message.into() }
    }

    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe { path: path.into(), message: message.into() }
    }

    pub fn audio(message: impl Into<String>) -> Self {
        Self::Audio { message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let e = MediaError::UnsupportedFileType(PathBuf::from("notes.txt"));
        assert_eq!(e.to_string(), "unsupported file type: 'notes.txt'");

        let e = MediaError::probe("clip.mp4", "no video stream found");
        assert!(e.to_string().contains("clip.mp4"));
        assert!(e.to_string().contains("no video stream found"));
    }
}
