//! End-to-end tests: discovery, factory, workflow execution and teardown.

#[cfg(test)]
mod tests {
    use crate::collaborators::{
        CollaboratorKind, Collaborators, InMemoryMetrics, InMemoryProducer, Metrics, Producer,
        RequiredCollaborators, TracingLogger,
    };
    use crate::context::{ExecutionContext, MemoryResultLog};
    use crate::core::{describe_stages, StageMetadata, StageStatus};
    use crate::errors::StageError;
    use crate::loader::{LoaderConfig, StageLoader};
    use crate::observer::{LoggingObserver, MetricsObserver};
    use crate::registry::{CollaboratorHandle, StageFactory};
    use crate::stages::{Stage, StageCommand, StageTask};
    use crate::testing::{assert_children, assert_failed_by, RecordingObserver};
    use crate::workflow::WorkflowBuilder;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct ConnectTask {
        producer: Arc<dyn Producer>,
    }

    impl StageTask for ConnectTask {
        fn name(&self) -> &str {
            "connect"
        }

        fn run(&self, _ctx: &ExecutionContext) -> Result<serde_json::Value, StageError> {
            self.producer.connect();
            Ok(serde_json::json!({"connected": true}))
        }

        fn cleanup(&self, _ctx: &ExecutionContext) -> Result<(), StageError> {
            self.producer.disconnect();
            Ok(())
        }
    }

    struct SendMessagesTask {
        producer: Arc<dyn Producer>,
        metrics: Arc<dyn Metrics>,
    }

    impl StageTask for SendMessagesTask {
        fn name(&self) -> &str {
            "send_messages"
        }

        fn run(&self, ctx: &ExecutionContext) -> Result<serde_json::Value, StageError> {
            let count = ctx
                .require_param("send_messages", "num_messages")?
                .as_u64()
                .ok_or_else(|| {
                    StageError::invalid_parameter("send_messages", "num_messages", "expected an integer")
                })?;
            for i in 0..count {
                self.producer
                    .send_message(&format!("message-{i}"))
                    .map_err(|e| StageError::execution("send_messages", e.to_string()))?;
            }
            #[allow(clippy::cast_precision_loss)]
            self.metrics.record_send(count as f64);
            Ok(serde_json::json!({"sent": count}))
        }
    }

    struct VerifyTask {
        metrics: Arc<dyn Metrics>,
    }

    impl StageTask for VerifyTask {
        fn name(&self) -> &str {
            "verify"
        }

        fn run(&self, _ctx: &ExecutionContext) -> Result<serde_json::Value, StageError> {
            let sent = self.metrics.metric("pulsar.messages.sent");
            if sent > 0.0 {
                Ok(serde_json::json!({"verified": sent}))
            } else {
                Err(StageError::execution("verify", "no messages were sent"))
            }
        }
    }

    fn write_package(dir: &std::path::Path) {
        std::fs::write(dir.join("_package.json"), "{}").unwrap();
        std::fs::write(
            dir.join("connect.json"),
            r#"{"description": "Connect the producer", "requires": ["producer"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("send_messages.json"),
            r#"{"dependencies": ["connect"], "requires": ["producer", "metrics"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("verify.json"),
            r#"{"dependencies": ["send_messages"], "requires": ["metrics"]}"#,
        )
        .unwrap();
    }

    fn register_stages(factory: &mut StageFactory) {
        let required = |kinds: &[CollaboratorKind]| RequiredCollaborators::new(kinds.iter().copied());
        factory
            .register_stage(
                StageMetadata::new("connect").with_requires(required(&[CollaboratorKind::Producer])),
                |c: &Collaborators| match c.producer() {
                    Some(producer) => Stage::shared(ConnectTask {
                        producer: producer.clone(),
                    }),
                    None => unreachable!("factory validates required collaborators"),
                },
            )
            .register_stage(
                StageMetadata::new("send_messages")
                    .with_requires(required(&[CollaboratorKind::Producer, CollaboratorKind::Metrics])),
                |c: &Collaborators| match (c.producer(), c.metrics()) {
                    (Some(producer), Some(metrics)) => Stage::shared(SendMessagesTask {
                        producer: producer.clone(),
                        metrics: metrics.clone(),
                    }),
                    _ => unreachable!("factory validates required collaborators"),
                },
            )
            .register_stage(
                StageMetadata::new("verify").with_requires(required(&[CollaboratorKind::Metrics])),
                |c: &Collaborators| match c.metrics() {
                    Some(metrics) => Stage::shared(VerifyTask {
                        metrics: metrics.clone(),
                    }),
                    None => unreachable!("factory validates required collaborators"),
                },
            );
    }

    fn stem(module_id: &str) -> &str {
        module_id.rsplit('.').next().unwrap_or(module_id)
    }

    #[test]
    fn test_discovered_workflow_runs_and_tears_down() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("stages");
        std::fs::create_dir(&dir).unwrap();
        write_package(&dir);

        let producer = Arc::new(InMemoryProducer::new());
        let metrics = Arc::new(InMemoryMetrics::default());
        let mut factory = StageFactory::new();
        factory
            .register_collaborator(CollaboratorHandle::Producer(producer.clone()))
            .register_collaborator(CollaboratorHandle::Metrics(metrics.clone()))
            .register_collaborator(CollaboratorHandle::Logger(Arc::new(TracingLogger::new())));
        register_stages(&mut factory);

        let loader = StageLoader::new(LoaderConfig::default()).unwrap();
        let discovered = loader.discover(&dir).unwrap();
        let observer = Arc::new(RecordingObserver::new());
        let metrics_observer = Arc::new(MetricsObserver::new(metrics.clone()));
        let logging_observer = Arc::new(LoggingObserver::new(Arc::new(TracingLogger::new())));

        let mut builder = WorkflowBuilder::new("pulsar_suite");
        let mut plan = Vec::new();
        for stage in &discovered {
            let name = stem(&stage.module_id);
            let deps: Vec<&str> = stage.definition.dependencies.iter().map(|d| stem(d)).collect();
            let handle = factory.create_stage(name).unwrap();
            handle.add_observer(observer.clone());
            handle.add_observer(metrics_observer.clone());
            handle.add_observer(logging_observer.clone());
            builder.add_stage(handle, &deps).unwrap();
            plan.push(stage.definition.metadata(name));
        }
        assert!(describe_stages(&plan).contains("2. send_messages"));

        let workflow = builder.build();
        let results = Arc::new(MemoryResultLog::new());
        let ctx = ExecutionContext::new()
            .with_param("num_messages", serde_json::json!(3))
            .with_result_log(results.clone());

        let result = workflow.execute(&ctx);

        assert_eq!(result.status(), StageStatus::Completed);
        assert_children(&result, &["connect", "send_messages", "verify"]);
        assert_eq!(producer.sent_messages().len(), 3);
        assert!((metrics.metric("pulsar.stages.send_messages.completed") - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            observer.events().first(),
            Some(&("connect".to_string(), StageStatus::Running))
        );

        workflow.teardown(&ctx).unwrap();

        assert!(!producer.is_connected());
        assert_eq!(
            observer.statuses_for("connect").last(),
            Some(&StageStatus::Skipped)
        );
        assert_eq!(
            results.lines(),
            vec![
                "Stage verify torn down successfully",
                "Stage send_messages torn down successfully",
                "Stage connect torn down successfully",
                "Workflow pulsar_suite torn down successfully",
            ]
        );
    }

    #[test]
    fn test_missing_parameter_fails_workflow() {
        let producer = Arc::new(InMemoryProducer::new());
        let metrics = Arc::new(InMemoryMetrics::default());
        let mut factory = StageFactory::with_collaborators(
            Collaborators::new()
                .with_producer(producer.clone())
                .with_metrics(metrics),
        );
        register_stages(&mut factory);

        let mut builder = WorkflowBuilder::default();
        builder
            .add_stage(factory.create_stage("connect").unwrap(), &[])
            .unwrap()
            .add_stage(factory.create_stage("send_messages").unwrap(), &["connect"])
            .unwrap()
            .add_stage(factory.create_stage("verify").unwrap(), &["send_messages"])
            .unwrap();
        let workflow = builder.build();

        let result = workflow.execute(&ExecutionContext::new());

        assert_failed_by(&result, "send_messages");
        assert_eq!(
            result.error().map(StageError::kind),
            Some("invalid_parameter")
        );
        assert_eq!(builder.stage("verify").unwrap().status(), StageStatus::Pending);
        assert!(producer.is_connected());

        workflow.teardown(&ExecutionContext::new()).unwrap();
        assert!(!producer.is_connected());
    }
}
