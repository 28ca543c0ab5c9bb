#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::config::{Config, ConfigError, PipelineConfig};
    use crate::generator::pipeline::{
        PipelineOutput, ResearchPipeline, ResearchRequest, RetryPolicy, TimingScope,
        initialize_research_pipeline,
    };
    use crate::generator::testing::SAMPLE_OUTLINE;
    use crate::generator::workflow::{ReportRunner, WorkflowOutput};

    /// 按调用序号与大纲决定返回内容的运行器
    struct ScriptedRunner<F> {
        respond: F,
        outlines: Mutex<Vec<String>>,
    }

    impl<F> ScriptedRunner<F>
    where
        F: Fn(usize, &str) -> Result<String> + Send + Sync,
    {
        fn new(respond: F) -> Self {
            Self {
                respond,
                outlines: Mutex::new(Vec::new()),
            }
        }

        fn outlines(&self) -> Vec<String> {
            self.outlines.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<F> ReportRunner for ScriptedRunner<F>
    where
        F: Fn(usize, &str) -> Result<String> + Send + Sync,
    {
        async fn run(&self, outline: &str) -> Result<WorkflowOutput> {
            let call = {
                let mut outlines = self.outlines.lock().unwrap();
                outlines.push(outline.to_string());
                outlines.len() - 1
            };
            (self.respond)(call, outline).map(|response| WorkflowOutput { response })
        }
    }

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            incomplete_delay: Duration::ZERO,
            error_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::from(&PipelineConfig::default());

        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.incomplete_delay, Duration::from_secs(5));
        assert_eq!(policy.error_delay, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_first_complete_attempt_wins() {
        let runner = ScriptedRunner::new(|_, _| Ok("# T\n\n## 4. Conclusion\n\nDone".to_string()));

        let output = ResearchPipeline::new(&runner, instant_policy(3))
            .generate(SAMPLE_OUTLINE)
            .await
            .unwrap();

        assert_eq!(
            output,
            PipelineOutput {
                response: "# T\n\n## 4. Conclusion\n\nDone".to_string(),
                outline: SAMPLE_OUTLINE.to_string(),
                success: true,
            }
        );
        assert_eq!(runner.outlines().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_consumes_exactly_max_retries_attempts() {
        let runner = ScriptedRunner::new(|call, _| {
            if call < 2 {
                Ok("# T\n\n## 1. Introduction\n\nunfinished".to_string())
            } else {
                Ok("complete report with Conclusion".to_string())
            }
        });

        let output = ResearchPipeline::new(&runner, instant_policy(3))
            .generate(SAMPLE_OUTLINE)
            .await
            .unwrap();

        assert_eq!(output.response, "complete report with Conclusion");
        assert!(output.success);
        assert_eq!(runner.outlines().len(), 3);
        assert!(runner.outlines().iter().all(|o| o == SAMPLE_OUTLINE));
    }

    #[tokio::test]
    async fn test_errors_are_retried() {
        let runner = ScriptedRunner::new(|call, _| {
            if call == 0 {
                Err(anyhow!("workflow timed out"))
            } else {
                Ok("Conclusion reached".to_string())
            }
        });

        let output = ResearchPipeline::new(&runner, instant_policy(3))
            .generate(SAMPLE_OUTLINE)
            .await
            .unwrap();

        assert_eq!(output.response, "Conclusion reached");
        assert_eq!(runner.outlines().len(), 2);
    }

    fn fallback_runner(call: usize, outline: &str) -> Result<String> {
        if call < 2 {
            return Ok("never finishes".to_string());
        }
        if outline.contains("## 1. Introduction") {
            Ok("# Research Paper Report on X\n\n## 1. Introduction\n\nIntro".to_string())
        } else if outline.contains("## 2. Background") {
            Ok("# Research Paper Report on X\n\n## 2. Background\n\nBG".to_string())
        } else if outline.contains("## 3. Latest Papers:") {
            Err(anyhow!("block failed"))
        } else {
            Ok("# Research Paper Report on X\n\n## 4. Conclusion\n\nEnd".to_string())
        }
    }

    #[tokio::test]
    async fn test_fallback_concatenates_blocks_with_stub() {
        let runner = ScriptedRunner::new(fallback_runner);

        let output = ResearchPipeline::new(&runner, instant_policy(2))
            .generate(SAMPLE_OUTLINE)
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.outline, SAMPLE_OUTLINE);
        assert_eq!(
            output.response,
            "# Research Paper Report on X\n\n## 1. Introduction\n\nIntro\n\n\
## 2. Background\n\nBG\n\n\
## 3. Latest Papers:\n\nContent generation incomplete for this section.\n\n\
## 4. Conclusion\n\nEnd"
        );

        let outlines = runner.outlines();
        // 2次整体尝试 + 引言块 + 3个章节块
        assert_eq!(outlines.len(), 6);
        assert_eq!(outlines[2], "# Research Paper Report on X\n\n## 1. Introduction\n");
        assert_eq!(
            outlines[3],
            "# Research Paper Report on X\n\n## 2. Background\n2.1. History\n"
        );
        assert_eq!(outlines[5], "# Research Paper Report on X\n\n## 4. Conclusion");
    }

    #[tokio::test]
    async fn test_zero_retries_goes_straight_to_fallback() {
        let runner = ScriptedRunner::new(|call, outline| fallback_runner(call + 2, outline));

        let output = ResearchPipeline::new(&runner, instant_policy(0))
            .generate(SAMPLE_OUTLINE)
            .await
            .unwrap();

        assert_eq!(runner.outlines().len(), 4);
        assert!(output.response.ends_with("## 4. Conclusion\n\nEnd"));
    }

    #[tokio::test]
    async fn test_fallback_block_without_section_heading_does_not_repeat_title() {
        let runner = ScriptedRunner::new(|call, outline| {
            if call == 0 {
                Ok("# Research Paper Report on X\n\n## 1. Introduction\n\nIntro".to_string())
            } else if outline.contains("## 2. Background") {
                Ok("# Research Paper Report on X\n\nBackground prose only".to_string())
            } else if outline.contains("## 3. Latest Papers:") {
                Ok("# Research Paper Report on X".to_string())
            } else {
                Ok("## 4. Conclusion\n\nEnd".to_string())
            }
        });

        let output = ResearchPipeline::new(&runner, instant_policy(0))
            .generate(SAMPLE_OUTLINE)
            .await
            .unwrap();

        assert_eq!(
            output.response,
            "# Research Paper Report on X\n\n## 1. Introduction\n\nIntro\n\n\
Background prose only\n\n\
## 4. Conclusion\n\nEnd"
        );
        assert_eq!(output.response.matches("# Research Paper Report on X").count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_intro_failure_is_fatal() {
        let runner = ScriptedRunner::new(|call, _| {
            if call < 1 {
                Ok("incomplete".to_string())
            } else {
                Err(anyhow!("provider down"))
            }
        });

        let result = ResearchPipeline::new(&runner, instant_policy(1))
            .generate(SAMPLE_OUTLINE)
            .await;

        let error = result.unwrap_err();
        assert!(format!("{:#}", error).contains("provider down"));
        // 引言块失败后不再继续生成其余章节
        assert_eq!(runner.outlines().len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_with_title_only_outline() {
        let runner = ScriptedRunner::new(|call, _| {
            if call == 0 {
                Ok("incomplete".to_string())
            } else {
                Ok("# Lonely title".to_string())
            }
        });

        let output = ResearchPipeline::new(&runner, instant_policy(1))
            .generate("# Lonely title")
            .await
            .unwrap();

        assert_eq!(output.response, "# Lonely title");
        assert_eq!(runner.outlines(), vec!["# Lonely title", "# Lonely title"]);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let mut config = Config::default();
        config.llm.api_key = String::new();
        config.index.api_key = "  ".to_string();

        let error = initialize_research_pipeline(&config, &ResearchRequest::new("topic"))
            .await
            .unwrap_err();

        assert_eq!(
            error.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingCredentials(
                "OPENAI_API_KEY, LLAMA_CLOUD_API_KEY".to_string()
            ))
        );
    }

    #[test]
    fn test_timing_scope_records_phases_in_order() {
        let mut timing = TimingScope::new();
        timing.start_phase("outline");
        timing.start_phase("corpus");
        assert!(timing.end_phase("outline").is_some());
        assert!(timing.end_phase("corpus").is_some());
        assert!(timing.end_phase("never-started").is_none());

        let phases: Vec<&str> = timing
            .get_phase_durations()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(phases, vec!["outline", "corpus"]);
        assert!(timing.generate_timing_report().contains("- corpus:"));
    }
}
