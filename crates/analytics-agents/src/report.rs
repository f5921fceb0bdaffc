//! Markdown report file

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::Result;

const SEPARATOR: &str = "\n\n-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-\n\n";

/// Append one answered query to the report, creating it if needed
pub async fn append_to_report(path: &Path, query: &str, answer: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(render_entry(query, answer).as_bytes()).await?;
    file.flush().await?;

    log::info!("Appended answer to {:?}", path);
    Ok(())
}

fn render_entry(query: &str, answer: &str) -> String {
    format!("**Query:** {}\n\n{}{}", query.trim(), answer.trim(), SEPARATOR)
}
