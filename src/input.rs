//! Payload acquisition.
//!
//! The whole payload is read once, before the exchange starts, from a file or
//! from stdin.  Anything over [`MAX_PAYLOAD`] bytes is rejected here; the
//! codec refuses it as well.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::segment::MAX_PAYLOAD;

/// Where the payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read input: {0}")]
    Read(#[source] io::Error),
    #[error("input of {len} bytes exceeds the {max}-byte limit", max = MAX_PAYLOAD)]
    TooLarge { len: usize },
}

/// Read the payload from `source`.
pub async fn read_payload(source: &InputSource) -> Result<Vec<u8>, InputError> {
    let payload = match source {
        InputSource::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| InputError::Open {
                    path: path.clone(),
                    source,
                })?;
            read_limited(file).await?
        }
        InputSource::Stdin => read_limited(tokio::io::stdin()).await?,
    };
    log::debug!("[ctp] read {} payload bytes from {source:?}", payload.len());
    Ok(payload)
}

/// Read at most [`MAX_PAYLOAD`] bytes from `reader`.
///
/// Only the first `MAX_PAYLOAD + 1` bytes are buffered.  Past that the rest
/// of the input is counted and discarded so the error can report its size.
pub async fn read_limited<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<u8>, InputError> {
    let mut data = Vec::with_capacity(MAX_PAYLOAD + 1);
    let mut limited = reader.take(MAX_PAYLOAD as u64 + 1);
    limited
        .read_to_end(&mut data)
        .await
        .map_err(InputError::Read)?;
    if data.len() > MAX_PAYLOAD {
        let rest = tokio::io::copy(&mut limited.into_inner(), &mut tokio::io::sink())
            .await
            .map_err(InputError::Read)?;
        return Err(InputError::TooLarge {
            len: data.len() + rest as usize,
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_small_input() {
        let data = read_limited(&b"hello"[..]).await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn empty_input_is_allowed() {
        let data = read_limited(&b""[..]).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn exactly_max_payload_is_allowed() {
        let input = vec![7u8; MAX_PAYLOAD];
        let data = read_limited(&input[..]).await.unwrap();
        assert_eq!(data.len(), MAX_PAYLOAD);
    }

    #[tokio::test]
    async fn oversized_input_is_rejected() {
        let input = vec![7u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            read_limited(&input[..]).await,
            Err(InputError::TooLarge { len: 513 })
        ));
    }

    #[tokio::test]
    async fn too_large_reports_full_input_length() {
        let input = vec![7u8; 2000];
        let err = read_limited(&input[..]).await.unwrap_err();
        assert!(matches!(err, InputError::TooLarge { len: 2000 }));
        assert_eq!(
            err.to_string(),
            "input of 2000 bytes exceeds the 512-byte limit"
        );
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let path = PathBuf::from("/nonexistent/ctp-sender/input.bin");
        let err = read_payload(&InputSource::File(path.clone()))
            .await
            .unwrap_err();
        match err {
            InputError::Open { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Open, got {other:?}"),
        }
    }
}
