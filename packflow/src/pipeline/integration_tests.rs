//! End-to-end tests for package runs.

use crate::context::PipelineContext;
use crate::errors::{PackflowError, ServiceStage};
use crate::events::StepOutcome;
use crate::framework::FrameworkRequirements;
use crate::pipeline::PackageOptions;
use crate::testing::{assert_outcomes, assert_stage_failure, MockFrameworkService, TestFixture};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_api_and_web_without_target() {
    let fixture = TestFixture::new(&["api", "web"]);
    let result = fixture.run(&PackageOptions::new()).await.unwrap();

    assert_eq!(result.results.names(), vec!["api", "web"]);
    assert_outcomes(
        &fixture.sink,
        &[("api", StepOutcome::Done), ("web", StepOutcome::Done)],
    );
}

#[tokio::test]
async fn test_api_and_web_with_target() {
    let fixture = TestFixture::new(&["api", "web"]);
    let result = fixture.run(&PackageOptions::new().with_target("api")).await.unwrap();

    assert_eq!(result.results.names(), vec!["api"]);
    assert_eq!(fixture.framework.packaged(), vec!["api".to_string()]);
    assert_outcomes(
        &fixture.sink,
        &[("api", StepOutcome::Done), ("web", StepOutcome::Skipped)],
    );
}

#[tokio::test]
async fn test_missing_target_executes_nothing() {
    let fixture = TestFixture::new(&["api", "web"]);
    let err = fixture
        .run(&PackageOptions::new().with_target("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, PackflowError::ServiceNotFound { ref name } if name == "missing"));
    assert!(fixture.framework.calls().is_empty());
    assert!(fixture.sink.is_empty());
}

#[tokio::test]
async fn test_target_runs_exactly_one_service() {
    let names = ["s1", "s2", "s3", "s4", "s5"];
    for (k, target) in names.iter().enumerate() {
        let fixture = TestFixture::new(&names);
        let result = fixture.run(&PackageOptions::new().with_target(*target)).await.unwrap();

        assert_eq!(result.results.names(), vec![*target]);
        assert_eq!(fixture.framework.packaged(), vec![(*target).to_string()]);

        let outcomes = fixture.sink.outcomes();
        assert_eq!(outcomes.len(), names.len());
        for (i, (service, outcome)) in outcomes.iter().enumerate() {
            assert_eq!(service, names[i]);
            let expected = if i == k { StepOutcome::Done } else { StepOutcome::Skipped };
            assert_eq!(*outcome, expected);
        }
    }
}

#[tokio::test]
async fn test_failure_stops_run_and_discards_results() {
    let names = ["s1", "s2", "s3", "s4"];
    for (i, failing) in names.iter().enumerate() {
        let fixture = TestFixture::with_framework(
            &names,
            MockFrameworkService::new("mock").failing_at(
                *failing,
                ServiceStage::Package,
                PackflowError::NoArtifacts {
                    dir: "target".into(),
                    extension: "jar".to_string(),
                },
            ),
        );

        let err = fixture.run(&PackageOptions::new()).await.unwrap_err();
        assert_stage_failure(&err, failing, ServiceStage::Package);

        let mut expected: Vec<(&str, StepOutcome)> =
            names[..i].iter().map(|name| (*name, StepOutcome::Done)).collect();
        expected.push((*failing, StepOutcome::Failed));
        assert_outcomes(&fixture.sink, &expected);

        assert_eq!(fixture.framework.packaged().len(), i + 1);
    }
}

#[tokio::test]
async fn test_restore_failure_is_attributed() {
    let fixture = TestFixture::with_framework(
        &["api"],
        MockFrameworkService::new("mock")
            .with_requirements(FrameworkRequirements::restore_and_build())
            .failing_at("api", ServiceStage::Restore, PackflowError::TaskAbandoned),
    );

    let err = fixture.run(&PackageOptions::new()).await.unwrap_err();
    assert_stage_failure(&err, "api", ServiceStage::Restore);
    assert_eq!(
        fixture.framework.stages_for("api"),
        vec![ServiceStage::Initialize, ServiceStage::Restore]
    );
}

#[tokio::test]
async fn test_cwd_defaults_target() {
    let fixture = TestFixture::new(&["api", "web"]);
    let cwd = fixture.project.get_service("web").unwrap().path();

    let result = fixture.run(&PackageOptions::new().with_cwd(cwd)).await.unwrap();
    assert_eq!(result.results.names(), vec!["web"]);
}

#[tokio::test]
async fn test_run_id_matches_context() {
    let fixture = TestFixture::new(&["api"]);
    let ctx = PipelineContext::new();
    let result = fixture
        .pipeline()
        .run(&ctx, &fixture.project, &PackageOptions::new())
        .await
        .unwrap();

    assert_eq!(result.run_id, ctx.run_id());
    assert!(result.duration_ms >= 0.0);
}
