use md5::{Digest, Md5};
use std::path::Path;

/// Uppercase hex MD5 of a byte slice.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode_upper(hasher.finalize())
}

/// Streams a reader through MD5 with a fixed buffer, so memory stays bounded
/// regardless of input size. Returns uppercase hex.
pub async fn digest_reader<R: tokio::io::AsyncRead + Unpin>(
    mut reader: R,
) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = tokio::io::AsyncReadExt::read(&mut reader, &mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode_upper(hasher.finalize()))
}

/// Digest of a file's full contents.
pub async fn digest_file(path: &Path) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    digest_reader(file).await
}
