use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Serialize `value` as pretty-printed JSON and replace the file at `path` with it.
///
/// The bytes go to a sibling `.tmp` file first and are renamed over the target, so a
/// concurrent reader sees either the previous document or the new one.
pub async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}
