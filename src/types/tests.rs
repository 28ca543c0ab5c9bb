#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::types::content::ContentMap;
    use crate::types::document::{Document, PaperMetadata};
    use crate::types::outline::{Report, Section, SectionRole};
    use crate::types::query::{Classification, QueryMap, QueryRecord};

    #[test]
    fn test_section_role_from_title() {
        assert_eq!(SectionRole::from_title("Introduction"), SectionRole::Introduction);
        assert_eq!(SectionRole::from_title("  **Introduction to X**"), SectionRole::Introduction);
        assert_eq!(SectionRole::from_title("CONCLUSION"), SectionRole::Conclusion);
        assert_eq!(SectionRole::from_title("Conclusions and Outlook"), SectionRole::Conclusion);
        assert_eq!(SectionRole::from_title("A Brief Introduction"), SectionRole::Body);
        assert_eq!(SectionRole::from_title(""), SectionRole::Body);
        // 只看标题开头，结论字样出现在中间的章节按正文处理
        assert_eq!(SectionRole::from_title("Summary and Conclusions"), SectionRole::Body);
        assert_eq!(
            SectionRole::from_title("Challenges in the Introduction of X"),
            SectionRole::Body
        );
    }

    #[test]
    fn test_sections_excluding_roles() {
        let report = Report {
            title: "T".to_string(),
            sections: vec![
                Section::new("1.", "Introduction"),
                Section::new("2.", "Methods"),
                Section::new("3.", "Conclusion"),
            ],
        };

        let body: Vec<String> = report
            .sections_excluding(&[SectionRole::Introduction, SectionRole::Conclusion])
            .map(Section::key)
            .collect();

        assert_eq!(body, vec!["2. Methods".to_string()]);
    }

    #[test]
    fn test_classification_from_verdict() {
        assert_eq!(Classification::from_verdict("LLM"), Classification::Llm);
        assert_eq!(Classification::from_verdict(" llm\n"), Classification::Llm);
        assert_eq!(Classification::from_verdict("index"), Classification::Index);
        assert_eq!(Classification::from_verdict("LLM."), Classification::Index);
        assert_eq!(Classification::from_verdict(""), Classification::Index);
        assert_eq!(Classification::Llm.to_string(), "LLM");
        assert_eq!(
            serde_json::to_string(&Classification::Index).unwrap(),
            "\"INDEX\""
        );
    }

    #[test]
    fn test_query_map_lookup() {
        let record = |section: &str, subsection: &str| QueryRecord {
            section_key: section.to_string(),
            subsection_key: subsection.to_string(),
            query_text: format!("q {}", subsection),
            classification: Classification::Index,
        };
        let queries = QueryMap::new(vec![
            record("2. Background", "2.1. History"),
            record("2. Background", "2.2. Theory"),
            record("3. Results", "General"),
        ]);

        assert_eq!(queries.len(), 3);
        assert_eq!(
            queries.get("2. Background", "2.2. Theory").map(|r| r.query_text.as_str()),
            Some("q 2.2. Theory")
        );
        assert_eq!(
            queries.get("3. Results", "General").map(|r| r.query_text.as_str()),
            Some("q General")
        );
        assert!(queries.get("3. Results", "3.1. Missing").is_none());
    }

    #[test]
    fn test_content_map_insert_and_overwrite() {
        let mut contents = ContentMap::new();
        assert!(contents.is_empty());

        contents.insert("2. Background", "2.1. History", "first");
        contents.insert("2. Background", "2.1. History", "second");
        contents.insert("2. Background", "2.2. Theory", "theory");

        assert_eq!(contents.len(), 2);
        assert!(contents.contains_section("2. Background"));
        assert!(!contents.contains_section("3. Results"));
        assert_eq!(contents.get("2. Background", "2.1. History"), Some("second"));
    }

    #[test]
    fn test_document_text_helpers() {
        let document = Document {
            source: PathBuf::from("a.pdf"),
            pages: vec!["one".into(), "two".into(), "three".into(), "four".into()],
        };

        assert_eq!(document.full_text(), "one\n\ntwo\n\nthree\n\nfour");
        assert_eq!(document.leading_text(3), "onetwothree");
        assert!(!document.is_empty());

        let blank = Document {
            source: PathBuf::from("b.pdf"),
            pages: vec!["  ".into(), "\n".into()],
        };
        assert!(blank.is_empty());
    }

    #[test]
    fn test_paper_metadata_tolerates_missing_fields() {
        let metadata: PaperMetadata = serde_json::from_str(r#"{"ai_tags": ["nlp"]}"#).unwrap();

        assert!(metadata.author_names.is_empty());
        assert_eq!(metadata.ai_tags, vec!["nlp".to_string()]);
    }
}
