use super::*;
use async_trait::async_trait;
use tm_core::RelationshipType;

/// Records every statement; fails any whose SQL contains `fail_on`.
#[derive(Default)]
struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingExecutor {
    fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Default::default()
        }
    }

    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(DbError::ExecutionError(format!("refused: {fragment}")));
            }
        }
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

fn service(executor: Arc<RecordingExecutor>) -> MigrationService {
    let log = Arc::new(MigrationLog::open_memory().unwrap());
    MigrationService::new(log, executor, Reconciler::default())
}

#[tokio::test]
async fn test_generate_persists_batch_once() {
    let svc = service(Arc::new(RecordingExecutor::default()));
    let tenant = Uuid::new_v4();
    let classes = [Classification::new(tenant, "Orders")];

    let first = svc.generate(tenant, &classes, &[]).await.unwrap();
    assert_eq!(first.len(), 2);
    let second = svc.generate(tenant, &classes, &[]).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(svc.log().history(tenant).unwrap().len(), 2);
}

#[tokio::test]
async fn test_plan_does_not_persist() {
    let svc = service(Arc::new(RecordingExecutor::default()));
    let tenant = Uuid::new_v4();
    let plan = svc
        .plan(tenant, &[Classification::new(tenant, "Orders")], &[])
        .unwrap();
    assert_eq!(plan.len(), 2);
    assert!(svc.log().history(tenant).unwrap().is_empty());
}

#[tokio::test]
async fn test_execute_pending_runs_in_sequence_order() {
    let executor = Arc::new(RecordingExecutor::default());
    let svc = service(executor.clone());
    let tenant = Uuid::new_v4();
    let orders = Classification::new(tenant, "Orders");
    let items = Classification::new(tenant, "Items");
    let rels = [Relationship::new(
        tenant,
        orders.id,
        items.id,
        RelationshipType::OneToMany,
    )];
    svc.generate(tenant, &[orders, items], &rels).await.unwrap();

    let report = svc.execute_pending(tenant).await.unwrap();
    assert!(report.is_success());
    let sequences: Vec<i64> = report.applied.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, [1, 2, 3, 4]);
    assert!(report.applied.iter().all(|r| r.is_applied()));

    let statements = executor.statements();
    assert!(statements[0].starts_with("CREATE SCHEMA"));
    assert!(statements[3].contains("FOREIGN KEY"));
    assert!(svc.log().pending(tenant).unwrap().is_empty());
}

#[tokio::test]
async fn test_execution_stops_at_first_failure() {
    let executor = Arc::new(RecordingExecutor::failing_on("\"items\""));
    let svc = service(executor.clone());
    let tenant = Uuid::new_v4();
    let classes = [
        Classification::new(tenant, "Orders"),
        Classification::new(tenant, "Items"),
        Classification::new(tenant, "Customers"),
    ];
    svc.generate(tenant, &classes, &[]).await.unwrap();

    let report = svc.execute_pending(tenant).await.unwrap();
    assert!(!report.is_success());
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.skipped, 1);
    let failure = report.failure.unwrap();
    assert_eq!(failure.record.sequence, 3);
    assert!(matches!(failure.error, DbError::ExecutionError(_)));

    let pending: Vec<i64> = svc
        .log()
        .pending(tenant)
        .unwrap()
        .iter()
        .map(|r| r.sequence)
        .collect();
    assert_eq!(pending, [3, 4]);
    assert_eq!(executor.statements().len(), 2);
}

#[tokio::test]
async fn test_failed_run_resumes_where_it_stopped() {
    let log = Arc::new(MigrationLog::open_memory().unwrap());
    let tenant = Uuid::new_v4();
    let classes = [
        Classification::new(tenant, "Orders"),
        Classification::new(tenant, "Items"),
    ];

    let failing = MigrationService::new(
        log.clone(),
        Arc::new(RecordingExecutor::failing_on("\"items\"")),
        Reconciler::default(),
    );
    let report = failing.sync(tenant, &classes, &[]).await.unwrap();
    assert_eq!(report.applied.len(), 2);

    let healthy = Arc::new(RecordingExecutor::default());
    let svc = MigrationService::new(log, healthy.clone(), Reconciler::default());
    let report = svc.sync(tenant, &classes, &[]).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.applied.len(), 1);
    assert!(healthy.statements()[0].contains("\"items\""));
}

#[tokio::test]
async fn test_concurrent_generate_for_one_tenant() {
    let svc = Arc::new(service(Arc::new(RecordingExecutor::default())));
    let tenant = Uuid::new_v4();
    let classes = vec![Classification::new(tenant, "Orders")];

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            let classes = classes.clone();
            tokio::spawn(async move { svc.generate(tenant, &classes, &[]).await })
        })
        .collect();
    let mut written = 0;
    for handle in handles {
        written += handle.await.unwrap().unwrap().len();
    }

    assert_eq!(written, 2);
    assert_eq!(svc.log().history(tenant).unwrap().len(), 2);
}

#[tokio::test]
async fn test_tenant_errors_are_wrapped() {
    let svc = service(Arc::new(RecordingExecutor::default()));
    let err = svc
        .generate(Uuid::nil(), &[Classification::new(Uuid::nil(), "Orders")], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(_)));
    assert!(err.to_string().starts_with("[E001]"));
}
