//! Submission lifecycle against an in-process DocuSeal stand-in

mod common;

use chrono::Duration;
use common::{episode, gateway_fixture, today, ACZ};
use ivr_mapper::adapters::storage::{SubmissionFilter, SubmissionStore};
use ivr_mapper::core::analytics::AnalyticsQuery;
use ivr_mapper::core::submission::CallbackDisposition;
use ivr_mapper::domain::clinical::EpisodeRecord;
use ivr_mapper::domain::{IvrError, Signer, SourceFieldBag, SubmissionStatus};
use serde_json::json;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_concurrent_submissions_create_once() {
    let fixture = gateway_fixture().await;

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let gateway = fixture.gateway.clone();
        tasks.push(tokio::spawn(async move {
            gateway
                .create_or_update(episode(1), ACZ, &SourceFieldBag::new())
                .await
        }));
    }

    let mut created = 0;
    let mut ids = Vec::new();
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        if outcome.created {
            created += 1;
        }
        ids.push(outcome.submission.id.clone());
    }

    assert_eq!(created, 1);
    assert_eq!(fixture.docuseal.creates.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.docuseal.updates.load(Ordering::SeqCst), 5);
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(fixture.storage.submission_count().await, 1);
}

#[tokio::test]
async fn test_resubmission_refreshes_mapping() {
    let fixture = gateway_fixture().await;
    let first = fixture
        .gateway
        .create_or_update(episode(1), ACZ, &SourceFieldBag::new())
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.ivr_episode.status, SubmissionStatus::Pending);
    assert_eq!(first.ivr_episode.required_completeness, 100.0);

    let mut extra = SourceFieldBag::new();
    extra.set("patient_phone", "5559876543");
    let second = fixture
        .gateway
        .create_or_update(episode(1), ACZ, &extra)
        .await
        .unwrap();

    assert!(!second.created);
    assert_eq!(second.ivr_episode.id, first.ivr_episode.id);
    assert_eq!(
        second.ivr_episode.mapped_fields.get("patient_phone").map(String::as_str),
        Some("(555) 987-6543")
    );
}

#[tokio::test]
async fn test_callbacks_drive_status_forward_only() {
    let fixture = gateway_fixture().await;
    let outcome = fixture
        .gateway
        .create_or_update(episode(2), ACZ, &SourceFieldBag::new())
        .await
        .unwrap();
    let submission_id = outcome.submission.id.as_str().to_string();

    let viewed = fixture
        .gateway
        .process_callback(&json!({
            "event_type": "form.viewed",
            "timestamp": "2025-06-01T10:00:00Z",
            "data": { "submission_id": submission_id }
        }))
        .await
        .unwrap();
    assert_eq!(viewed.status, CallbackDisposition::Processed);
    assert_eq!(viewed.submission_status, Some(SubmissionStatus::Viewed));

    let completed = fixture
        .gateway
        .process_callback(&json!({
            "event_type": "submission.completed",
            "data": {
                "id": submission_id,
                "completed_at": "2025-06-01T11:30:00Z",
                "documents": [{ "name": "ivr.pdf", "url": "https://docs.example/ivr.pdf" }]
            }
        }))
        .await
        .unwrap();
    assert_eq!(completed.submission_status, Some(SubmissionStatus::Completed));

    let late = fixture
        .gateway
        .process_callback(&json!({
            "event_type": "form.started",
            "data": { "submission_id": submission_id }
        }))
        .await
        .unwrap();
    assert_eq!(late.status, CallbackDisposition::Ignored);

    let record = fixture.gateway.find(&outcome.submission.id).await.unwrap();
    assert_eq!(record.status, SubmissionStatus::Completed);
    assert!(record.completed_at.is_some());
    assert!(record.viewed_at.is_some());
    assert_eq!(
        record.signed_document_url.as_deref(),
        Some("https://docs.example/ivr.pdf")
    );
}

#[tokio::test]
async fn test_unknown_submission_callback_is_ignored() {
    let fixture = gateway_fixture().await;
    let outcome = fixture
        .gateway
        .process_callback(&json!({
            "event_type": "submission.completed",
            "data": { "id": 424242 }
        }))
        .await
        .unwrap();

    assert_eq!(outcome.status, CallbackDisposition::Ignored);
    assert_eq!(fixture.storage.submission_count().await, 0);
}

#[tokio::test]
async fn test_batch_isolates_upstream_failures() {
    let fixture = gateway_fixture().await;
    fixture.docuseal.fail_for(episode(2));

    let ids = [episode(1), episode(2), episode(3)];
    let outcome = fixture.gateway.batch_process(&ids, ACZ).await.unwrap();

    assert_eq!(outcome.summary.successful, 2);
    assert_eq!(outcome.summary.failed, 1);
    assert!(!outcome.results[1].success);
    assert!(outcome.results[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("503") || e.contains("unavailable")));

    // the failed pair keeps its unsent row for the next attempt
    assert_eq!(fixture.storage.submission_count().await, 3);
    let stored = fixture
        .storage
        .list(&SubmissionFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.iter().filter(|r| r.submission_id.is_none()).count(), 1);
    assert_eq!(fixture.docuseal.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_resubmission_reads_current_clinical_data() {
    let fixture = gateway_fixture().await;
    let first = fixture
        .gateway
        .create_or_update(episode(1), ACZ, &SourceFieldBag::new())
        .await
        .unwrap();
    assert_eq!(first.ivr_episode.mapped_fields["wound_size"], "16.12");
    assert_eq!(first.ivr_episode.mapped_fields["wound_duration"], "6");

    let mut record = EpisodeRecord::new(episode(1));
    record.patient_id = Some("p-1".to_string());
    record.provider_id = Some("dr-1".to_string());
    record.facility_id = Some("fac-1".to_string());
    record.clinical.wound_type = Some("Diabetic foot ulcer".to_string());
    record.clinical.wound_location = Some("Left heel".to_string());
    record.clinical.wound_length = Some(2.0);
    record.clinical.wound_width = Some(2.0);
    record.clinical.wound_start_date = Some(today() - Duration::weeks(10));
    record.clinical.primary_diagnosis_code = Some("E11.621".to_string());
    record.clinical.place_of_service = Some("11".to_string());
    record.clinical.hospice_status = Some(false);
    fixture.clinical.insert_episode(record).await;

    let second = fixture
        .gateway
        .create_or_update(episode(1), ACZ, &SourceFieldBag::new())
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.ivr_episode.mapped_fields["wound_size"], "4.00");
    assert_eq!(second.ivr_episode.mapped_fields["wound_duration"], "10");

    let stored = fixture
        .storage
        .find_by_submission_id(&first.submission.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.mapped_fields["wound_size"], "4.00");
}

#[tokio::test]
async fn test_upstream_failure_carries_context() {
    let fixture = gateway_fixture().await;
    fixture.docuseal.fail_for(episode(3));

    let err = fixture
        .gateway
        .create_or_update(episode(3), ACZ, &SourceFieldBag::new())
        .await
        .unwrap_err();
    match err {
        IvrError::UpstreamService(detail) => {
            assert_eq!(detail.episode_id.as_deref(), Some("3"));
            assert_eq!(detail.manufacturer.as_deref(), Some(ACZ));
            assert!(detail.retryable);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_send_refresh_and_download() {
    let fixture = gateway_fixture().await;
    let outcome = fixture
        .gateway
        .create_or_update(episode(1), ACZ, &SourceFieldBag::new())
        .await
        .unwrap();
    let id = outcome.submission.id;

    assert!(matches!(
        fixture.gateway.send_for_signing(&id, &[]).await,
        Err(IvrError::MalformedInput(_))
    ));

    let signer = Signer {
        email: "dr.lee@example.com".to_string(),
        name: "Sam Lee".to_string(),
        role: None,
    };
    let sent = fixture.gateway.send_for_signing(&id, &[signer]).await.unwrap();
    assert_eq!(sent.status, SubmissionStatus::Sent);
    assert!(sent.sent_at.is_some());
    assert_eq!(fixture.docuseal.sends.load(Ordering::SeqCst), 1);

    let refreshed = fixture.gateway.refresh_submission(&id).await.unwrap();
    assert_eq!(refreshed.status, SubmissionStatus::Viewed);

    let pdf = fixture.gateway.download_document(&id).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_analytics_over_submissions() {
    let fixture = gateway_fixture().await;
    let ids = [episode(1), episode(2)];
    let outcome = fixture.gateway.batch_process(&ids, ACZ).await.unwrap();
    let first = outcome.results[0].result.as_ref().unwrap();

    fixture
        .gateway
        .process_callback(&json!({
            "event_type": "submission.completed",
            "data": { "id": first.submission.id.as_str() }
        }))
        .await
        .unwrap();

    let report = fixture
        .analytics
        .generate(&AnalyticsQuery::parse(Some(ACZ), None, None).unwrap())
        .await
        .unwrap();
    assert_eq!(report.total_submissions, 2);
    assert_eq!(report.completion_rate, 50.0);
    assert_eq!(report.status_breakdown.get("completed"), Some(&1));
    assert_eq!(report.status_breakdown.get("pending"), Some(&1));

    let stored = fixture
        .storage
        .list(&SubmissionFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}
