#[cfg(test)]
mod tests {
    use crate::generator::outline::parse;
    use crate::generator::planner::QueryPlanner;
    use crate::generator::testing::{SAMPLE_OUTLINE, ScriptedOracle, StaggeredOracle, long_text};
    use crate::types::query::Classification;

    fn scripted_planner_oracle() -> ScriptedOracle {
        ScriptedOracle::new("unclear")
            .reply_when("\"history query\"", "  llm \n")
            .reply_when("\"recent query\"", "INDEX")
            .reply_when("\"intro query\"", "Probably LLM")
            .reply_when("subsection '2.1. History'", "history query")
            .reply_when("subsection '3.1. Recent Work'", "  recent query  ")
            .reply_when("'1. Introduction'", "intro query")
            .reply_when("Generate a research query", "conclusion query")
    }

    #[tokio::test]
    async fn test_plan_one_record_per_leaf_in_outline_order() {
        let report = parse(SAMPLE_OUTLINE);
        let oracle = scripted_planner_oracle();

        let queries = QueryPlanner::new(&oracle, 4).plan(&report).await.unwrap();

        assert_eq!(queries.len(), 4);
        let keys: Vec<(&str, &str)> = queries
            .records()
            .iter()
            .map(|r| (r.section_key.as_str(), r.subsection_key.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("1. Introduction", "General"),
                ("2. Background", "2.1. History"),
                ("3. Latest Papers:", "3.1. Recent Work"),
                ("4. Conclusion", "General"),
            ]
        );

        // 每个叶子一次查询生成加一次分类
        assert_eq!(oracle.calls().len(), 8);
    }

    #[tokio::test]
    async fn test_plan_trims_query_and_classifies_literally() {
        let report = parse(SAMPLE_OUTLINE);
        let oracle = scripted_planner_oracle();

        let queries = QueryPlanner::new(&oracle, 2).plan(&report).await.unwrap();

        let history = queries.get("2. Background", "2.1. History").unwrap();
        assert_eq!(history.query_text, "history query");
        assert_eq!(history.classification, Classification::Llm);

        let recent = queries.get("3. Latest Papers:", "3.1. Recent Work").unwrap();
        assert_eq!(recent.query_text, "recent query");
        assert_eq!(recent.classification, Classification::Index);

        // 非精确的回答一律归为INDEX
        let intro = queries.get("1. Introduction", "General").unwrap();
        assert_eq!(intro.classification, Classification::Index);
        let conclusion = queries.get("4. Conclusion", "General").unwrap();
        assert_eq!(conclusion.classification, Classification::Index);
    }

    #[tokio::test]
    async fn test_plan_uses_general_overview_for_sections_without_subsections() {
        let report = parse("# Title\n## 1. Introduction");
        let oracle = ScriptedOracle::new("LLM");

        QueryPlanner::new(&oracle, 1).plan(&report).await.unwrap();

        let calls = oracle.calls();
        assert!(calls[0].contains("a report on Title."));
        assert!(calls[0].contains("subsection 'General overview' under the main section '1. Introduction'"));
        assert!(calls[1].starts_with("Classify the following query"));
        assert!(calls[1].trim_end().ends_with("Classification:"));
    }

    #[tokio::test]
    async fn test_plan_propagates_oracle_failure() {
        let report = parse(SAMPLE_OUTLINE);
        let oracle = ScriptedOracle::new("LLM").fail_when("3.1. Recent Work", "service unavailable");

        let result = QueryPlanner::new(&oracle, 4).plan(&report).await;

        let error = result.unwrap_err();
        assert!(format!("{:#}", error).contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_plan_empty_outline() {
        let report = parse("# Only a title");
        let oracle = ScriptedOracle::new("LLM");

        let queries = QueryPlanner::new(&oracle, 4).plan(&report).await.unwrap();

        assert!(queries.is_empty());
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_plan_keeps_outline_order_when_leaves_finish_out_of_order() {
        let report = parse(SAMPLE_OUTLINE);
        let oracle = StaggeredOracle::new(&[
            ("'1. Introduction'", 80),
            ("'2.1. History'", 60),
            ("'3.1. Recent Work'", 40),
            ("'4. Conclusion'", 20),
        ]);

        let queries = QueryPlanner::new(&oracle, 4).plan(&report).await.unwrap();

        assert_eq!(oracle.finished()[0], "'4. Conclusion'");
        let records: Vec<(&str, &str, &str)> = queries
            .records()
            .iter()
            .map(|r| {
                (
                    r.section_key.as_str(),
                    r.subsection_key.as_str(),
                    r.query_text.as_str(),
                )
            })
            .collect();
        let expected_queries = [
            long_text("'1. Introduction'"),
            long_text("'2.1. History'"),
            long_text("'3.1. Recent Work'"),
            long_text("'4. Conclusion'"),
        ];
        assert_eq!(
            records,
            vec![
                ("1. Introduction", "General", expected_queries[0].as_str()),
                ("2. Background", "2.1. History", expected_queries[1].as_str()),
                ("3. Latest Papers:", "3.1. Recent Work", expected_queries[2].as_str()),
                ("4. Conclusion", "General", expected_queries[3].as_str()),
            ]
        );
        assert!(
            queries
                .records()
                .iter()
                .all(|r| r.classification == Classification::Index)
        );
    }
}
