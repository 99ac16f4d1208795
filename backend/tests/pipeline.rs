use async_trait::async_trait;
use backend::channel::MessageChannel;
use backend::config::IngestConfig;
use backend::error::{PipelineError, Result};
use backend::job_controller::dispatch::schedule_dispatch_job;
use backend::job_controller::state::{start_job_updater, JobsState};
use backend::pipeline::decode::decode_csv;
use backend::pipeline::dispatch::{dispatch_batch, dispatch_record};
use backend::pipeline::ingest::ingest;
use backend::pipeline::ledger;
use backend::store::{batches, records, templates, Store};
use common::model::batch::Batch;
use common::model::record::DeliveryOutcome;
use common::jobs::JobStatus;
use common::model::template::Template;
use common::requests::{CreateBatchRequest, CreateTemplateRequest, FieldRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy)]
enum Reply {
    Deliver,
    Reject,
    Fault,
}

/// Answers with the scripted replies in order, then delivers everything.
#[derive(Default)]
struct ScriptedChannel {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, String, Vec<String>)>>,
}

impl ScriptedChannel {
    fn with_replies(replies: &[Reply]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().copied().collect()),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<(String, String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageChannel for ScriptedChannel {
    async fn send(&self, address: &str, channel_template: &str, params: &[String]) -> Result<bool> {
        self.calls.lock().unwrap().push((
            address.to_string(),
            channel_template.to_string(),
            params.to_vec(),
        ));
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Deliver);
        match reply {
            Reply::Deliver => Ok(true),
            Reply::Reject => Ok(false),
            Reply::Fault => Err(PipelineError::ChannelFault("connection reset".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Holds every send until a permit is added to `gate`.
struct GatedChannel {
    gate: Semaphore,
    sends: AtomicUsize,
}

impl GatedChannel {
    fn closed() -> Self {
        Self {
            gate: Semaphore::new(0),
            sends: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MessageChannel for GatedChannel {
    async fn send(&self, _address: &str, _channel_template: &str, _params: &[String]) -> Result<bool> {
        self.gate
            .acquire()
            .await
            .map_err(|e| PipelineError::ChannelFault(e.to_string()))?
            .forget();
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn name(&self) -> &str {
        "gated"
    }
}

fn welcome_template(store: &Store) -> Template {
    let field = |name: &str, sequence| FieldRequest {
        name: name.to_string(),
        sequence,
        active: true,
    };
    templates::create(
        store,
        &CreateTemplateRequest {
            name: "Welcome".to_string(),
            channel_template: "welcome-template-id".to_string(),
            preview_text: Some("Hi {{1}}, your balance is {{2}}".to_string()),
            fields: vec![field("Name", 1), field("Amount", 2)],
        },
    )
    .unwrap()
}

fn upload(store: &Store, template: &Template, csv: &str) -> Result<Batch> {
    let dataset = decode_csv(csv.as_bytes())?;
    let new_records = ingest(template, &dataset, &IngestConfig::default())?;
    batches::create_with_records(
        store,
        &CreateBatchRequest {
            template_id: template.id,
            name: "Orientation 2024".to_string(),
            kind: "Admission".to_string(),
            description: String::new(),
        },
        None,
        &new_records,
    )
}

fn outcomes(store: &Store, batch_id: i64) -> Vec<DeliveryOutcome> {
    records::list_by_batch(store, batch_id)
        .unwrap()
        .into_iter()
        .map(|r| r.outcome)
        .collect()
}

#[tokio::test]
async fn welcome_message_is_sent_with_blank_amount() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "Name,Amount,WhatsApp No.\nAsha,,+911234567890\n",
    )
    .unwrap();
    let channel = ScriptedChannel::default();

    let report = dispatch_batch(&store, &channel, batch.id, |_, _| {}).await.unwrap();

    assert_eq!(
        channel.calls(),
        vec![(
            "+911234567890".to_string(),
            "welcome-template-id".to_string(),
            vec!["Asha".to_string(), String::new()],
        )]
    );
    assert_eq!((report.total, report.sent, report.failed), (1, 1, 0));
    assert_eq!(outcomes(&store, batch.id), vec![DeliveryOutcome::Sent]);
}

#[tokio::test]
async fn rejected_message_is_marked_failed_and_the_run_goes_on() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "Name,Amount,WhatsApp No.\nAsha,10,+911\nRavi,20,+912\nMeera,30,+913\n",
    )
    .unwrap();
    let channel = ScriptedChannel::with_replies(&[Reply::Deliver, Reply::Reject]);

    let mut progress = Vec::new();
    let report = dispatch_batch(&store, &channel, batch.id, |done, total| {
        progress.push((done, total))
    })
    .await
    .unwrap();

    assert_eq!(channel.calls().len(), 3);
    assert_eq!((report.attempted, report.sent, report.failed), (3, 2, 1));
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(
        outcomes(&store, batch.id),
        vec![DeliveryOutcome::Sent, DeliveryOutcome::Failed, DeliveryOutcome::Sent]
    );
}

#[tokio::test]
async fn channel_fault_stops_the_run_and_leaves_the_rest_pending() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "Name,Amount,WhatsApp No.\nAsha,10,+911\nRavi,20,+912\nMeera,30,+913\n",
    )
    .unwrap();
    let channel = ScriptedChannel::with_replies(&[Reply::Deliver, Reply::Fault]);

    let err = dispatch_batch(&store, &channel, batch.id, |_, _| {}).await.unwrap_err();

    assert!(matches!(err, PipelineError::ChannelFault(_)));
    assert_eq!(channel.calls().len(), 2);
    assert_eq!(
        outcomes(&store, batch.id),
        vec![DeliveryOutcome::Sent, DeliveryOutcome::Pending, DeliveryOutcome::Pending]
    );
}

#[tokio::test]
async fn record_without_contact_fails_without_calling_the_channel() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(&store, &template, "Name,Amount,WhatsApp No.\nAsha,10,\n").unwrap();
    let channel = ScriptedChannel::default();

    let report = dispatch_batch(&store, &channel, batch.id, |_, _| {}).await.unwrap();

    assert!(channel.calls().is_empty());
    assert_eq!(report.failed, 1);
    assert_eq!(outcomes(&store, batch.id), vec![DeliveryOutcome::Failed]);
}

#[tokio::test]
async fn resend_overwrites_outcomes_without_duplicating_records() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "Name,Amount,WhatsApp No.\nAsha,10,+911\nRavi,20,+912\n",
    )
    .unwrap();

    let first = ScriptedChannel::with_replies(&[Reply::Reject, Reply::Reject]);
    dispatch_batch(&store, &first, batch.id, |_, _| {}).await.unwrap();
    assert_eq!(ledger::list_failed(&store, batch.id).unwrap().len(), 2);

    let second = ScriptedChannel::default();
    let report = dispatch_batch(&store, &second, batch.id, |_, _| {}).await.unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(
        outcomes(&store, batch.id),
        vec![DeliveryOutcome::Sent, DeliveryOutcome::Sent]
    );
    assert!(ledger::list_failed(&store, batch.id).unwrap().is_empty());
    // The resend uses the template's own channel template.
    assert!(second
        .calls()
        .iter()
        .all(|(_, channel_template, _)| channel_template == "welcome-template-id"));
}

#[tokio::test]
async fn single_record_can_be_sent_again() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(&store, &template, "Name,Amount,WhatsApp No.\nAsha,10,+911\n").unwrap();
    let record = records::list_by_batch(&store, batch.id).unwrap().remove(0);

    let channel = ScriptedChannel::with_replies(&[Reply::Reject]);
    let failed = dispatch_record(&store, &channel, record.id).await.unwrap();
    assert_eq!(failed.outcome, DeliveryOutcome::Failed);

    let sent = dispatch_record(&store, &channel, record.id).await.unwrap();
    assert_eq!(sent.outcome, DeliveryOutcome::Sent);
    assert_eq!(channel.calls()[1].2, vec!["Asha".to_string(), "10".to_string()]);
}

#[test]
fn missing_columns_reject_the_upload_without_writing() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);

    let err = upload(&store, &template, "Name,Phone\nAsha,+911\n").unwrap_err();

    match err {
        PipelineError::MissingColumns(names) => {
            assert_eq!(names, vec!["Amount".to_string(), "WhatsApp No.".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(batches::list(&store, Some(template.id)).unwrap().is_empty());
}

#[test]
fn ledger_labels_values_by_field_name() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "WhatsApp No.,Amount,Name,Email\n+911,10,Asha,asha@example.in\n",
    )
    .unwrap();

    let enriched = ledger::find_by_batch(&store, batch.id).unwrap();

    assert_eq!(enriched.len(), 1);
    let record = &enriched[0];
    assert_eq!(record.batch_name, "Orientation 2024");
    assert_eq!(record.template_name, "Welcome");
    assert_eq!(record.values_by_name.get("Name").map(String::as_str), Some("Asha"));
    assert_eq!(record.values_by_name.get("Amount").map(String::as_str), Some("10"));
    assert_eq!(record.email.as_deref(), Some("asha@example.in"));
    assert_eq!(record.outcome, DeliveryOutcome::Pending);
}

#[test]
fn deleting_a_batch_removes_its_records() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "Name,Amount,WhatsApp No.\nAsha,10,+911\nRavi,20,+912\n",
    )
    .unwrap();
    let record_ids: Vec<i64> = records::list_by_batch(&store, batch.id)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();

    batches::delete(&store, batch.id).unwrap();

    assert!(matches!(
        batches::get(&store, batch.id),
        Err(PipelineError::NotFound { .. })
    ));
    for id in record_ids {
        assert!(matches!(records::get(&store, id), Err(PipelineError::NotFound { .. })));
    }
    // With no batch left the template can go too.
    templates::delete(&store, template.id).unwrap();
}

#[tokio::test]
async fn a_batch_in_flight_cannot_be_dispatched_again() {
    let store = Store::open_in_memory().unwrap();
    let template = welcome_template(&store);
    let batch = upload(
        &store,
        &template,
        "Name,Amount,WhatsApp No.\nAsha,10,+911\nRavi,20,+912\nMeera,30,+913\n",
    )
    .unwrap();
    let (jobs, rx) = JobsState::new(16);
    tokio::spawn(start_job_updater(jobs.jobs.clone(), rx));
    let channel = Arc::new(GatedChannel::closed());

    let first = schedule_dispatch_job(&jobs, store.clone(), channel.clone(), batch.id)
        .await
        .unwrap();
    let second = schedule_dispatch_job(&jobs, store.clone(), channel.clone(), batch.id).await;
    assert!(matches!(second, Err(PipelineError::InvalidInput(_))));

    channel.gate.add_permits(3);
    let mut status = None;
    for _ in 0..500 {
        status = jobs.status(&first).await;
        if matches!(status, Some(JobStatus::Completed(_))) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(matches!(status, Some(JobStatus::Completed(_))), "{status:?}");
    assert_eq!(channel.sends.load(Ordering::SeqCst), 3);
    assert!(!jobs.is_dispatching(batch.id));

    // Once the run is over the batch can be resent.
    channel.gate.add_permits(3);
    schedule_dispatch_job(&jobs, store.clone(), channel.clone(), batch.id)
        .await
        .unwrap();
}
