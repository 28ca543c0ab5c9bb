#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::generator::outlet::{DiskOutlet, Outlet, count_major_sections, heading_preview};

    const REPORT: &str = "# Report on X\n\n## 1. Introduction\n\nIntro text.\n\n## 2. Background\n\nOverview.\n\n### 2.1. History\n\nOld **things**.\n\n## 3. Conclusion\n\nDone.\n";

    #[test]
    fn test_heading_preview() {
        let headings = heading_preview(REPORT).unwrap();

        assert_eq!(
            headings,
            vec![
                "# Report on X",
                "## 1. Introduction",
                "## 2. Background",
                "### 2.1. History",
                "## 3. Conclusion",
            ]
        );
    }

    #[test]
    fn test_count_major_sections_counts_markers() {
        // `###` 同样包含 `##`
        assert_eq!(count_major_sections(REPORT), 4);
        assert_eq!(count_major_sections("no headings"), 0);
    }

    #[tokio::test]
    async fn test_disk_outlet_writes_report() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("nested").join("research_paper.md");

        DiskOutlet::new(output_path.clone()).save(REPORT).await.unwrap();

        assert_eq!(std::fs::read_to_string(&output_path).unwrap(), REPORT);
    }

    #[tokio::test]
    async fn test_disk_outlet_overwrites_existing_report() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("research_paper.md");
        std::fs::write(&output_path, "stale").unwrap();

        DiskOutlet::new(output_path.clone()).save("fresh").await.unwrap();

        assert_eq!(std::fs::read_to_string(&output_path).unwrap(), "fresh");
    }
}
