use crate::model::WorkItemList;
use crate::Result;
use std::path::Path;

/// Loads a work-item list file
pub fn load_video_list(path: &Path) -> Result<WorkItemList> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes a work-item list file, replacing any previous content
pub fn save_video_list(list: &WorkItemList, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(list)?;
    std::fs::write(path, text)?;
    tracing::info!("Saved {} videos to {}", list.len(), path.display());
    Ok(())
}
