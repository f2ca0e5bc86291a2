use std::path::Path;

use tracing::info;

use crate::error::{AppError, Result};
use crate::types::MilestoneVerdict;

/// Order verdicts closest-first: ascending `needed`, ties by display name.
/// Stable, so identical keys keep arrival order.
pub fn rank(mut verdicts: Vec<MilestoneVerdict>) -> Vec<MilestoneVerdict> {
    verdicts.sort_by(|a, b| {
        a.needed
            .cmp(&b.needed)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    verdicts
}

pub fn to_json(verdicts: &[MilestoneVerdict]) -> Result<String> {
    Ok(serde_json::to_string_pretty(verdicts)?)
}

/// Write ranked verdicts as a pretty JSON array. Written to a sibling temp
/// file first and renamed into place, so readers never see a partial file.
/// No verdicts still produces `[]`.
pub async fn write_json(path: &Path, verdicts: &[MilestoneVerdict]) -> Result<()> {
    let body = to_json(verdicts)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| {
            AppError::Output(format!("not a file path: {}", path.display()))
        })?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;

    info!(path = %path.display(), count = verdicts.len(), "results written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatType;

    fn verdict(name: &str, needed: i64) -> MilestoneVerdict {
        MilestoneVerdict {
            entity_id: name.to_lowercase(),
            display_name: name.to_string(),
            stat_type: StatType::Points,
            current_value: 1000 - needed,
            target_milestone: 1000,
            needed,
            auxiliary: None,
        }
    }

    #[test]
    fn ranks_by_needed_ascending() {
        let ranked = rank(vec![verdict("A", 300), verdict("B", 50), verdict("C", 125)]);
        let needed: Vec<i64> = ranked.iter().map(|v| v.needed).collect();
        assert_eq!(needed, vec![50, 125, 300]);
    }

    #[test]
    fn ties_break_by_display_name() {
        let ranked = rank(vec![
            verdict("Zed", 10),
            verdict("Amy", 10),
            verdict("Max", 5),
        ]);
        let names: Vec<&str> = ranked.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(names, vec!["Max", "Amy", "Zed"]);
    }

    #[test]
    fn empty_ranks_to_empty_array() {
        assert!(rank(Vec::new()).is_empty());
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[tokio::test]
    async fn write_json_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("milestones.json");

        write_json(&path, &[verdict("B", 50)]).await.unwrap();
        write_json(&path, &[]).await.unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "[]");
        assert!(!path.with_file_name("milestones.json.tmp").exists());
    }

    #[tokio::test]
    async fn written_verdicts_deserialize_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("milestones.json");
        let ranked = rank(vec![verdict("A", 300), verdict("B", 50)]);

        write_json(&path, &ranked).await.unwrap();

        let back: Vec<MilestoneVerdict> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, ranked);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("auxiliary"));
    }
}
