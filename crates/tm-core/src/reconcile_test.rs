use super::*;
use crate::model::RelationshipType;

const TENANT: &str = "7b21599b-3518-401e-a70a-5fe28d4000e3";
const SCHEMA: &str = "tenant_7b21599b_3518_401e_a70a_5fe28d4000e3";

fn tenant() -> Uuid {
    Uuid::parse_str(TENANT).unwrap()
}

fn class(name: &str) -> Classification {
    Classification::new(tenant(), name)
}

fn rel(from: &Classification, to: &Classification, kind: RelationshipType) -> Relationship {
    Relationship::new(tenant(), from.id, to.id, kind)
}

fn record(name: &str, sequence: i64) -> MigrationRecord {
    NewMigration {
        tenant_id: tenant(),
        name: name.to_string(),
        sql: String::new(),
        sequence,
    }
    .into_record()
}

fn names(batch: &[NewMigration]) -> Vec<String> {
    batch.iter().map(|m| m.name.clone()).collect()
}

fn sequences(batch: &[NewMigration]) -> Vec<i64> {
    batch.iter().map(|m| m.sequence).collect()
}

fn apply(history: &mut Vec<MigrationRecord>, batch: Vec<NewMigration>) {
    history.extend(batch.into_iter().map(NewMigration::into_record));
}

/// Reconcile against `history`, append the batch to it and return the batch.
fn step(
    history: &mut Vec<MigrationRecord>,
    classes: &[Classification],
    rels: &[Relationship],
) -> Vec<NewMigration> {
    let batch = reconcile(classes, rels, history).unwrap();
    apply(history, batch.clone());
    batch
}

fn s(rest: &str) -> String {
    rest.replace("{S}", SCHEMA)
}

#[test]
fn test_first_classification_creates_schema_and_table() {
    let batch = reconcile(&[class("Robot Specs")], &[], &[]).unwrap();
    assert_eq!(
        names(&batch),
        [s("create schema {S}"), s("create table {S}_robot_specs")]
    );
    assert_eq!(sequences(&batch), [1, 2]);
    assert!(batch.iter().all(|m| m.tenant_id == tenant()));
    assert_eq!(batch[0].sql, s(r#"CREATE SCHEMA IF NOT EXISTS "{S}";"#));
    assert!(batch[1]
        .sql
        .starts_with(&s(r#"CREATE TABLE IF NOT EXISTS "{S}"."robot_specs" ("#)));
}

#[test]
fn test_rerun_with_same_model_is_empty() {
    let classes = [class("Robot Specs")];
    let mut history = Vec::new();
    step(&mut history, &classes, &[]);
    assert!(reconcile(&classes, &[], &history).unwrap().is_empty());
}

#[test]
fn test_removed_classification_drops_table() {
    let mut history = Vec::new();
    step(&mut history, &[class("Robot Specs")], &[]);

    let batch = reconcile(&[], &[], &history).unwrap();
    assert_eq!(names(&batch), [s("drop table {S}_robot_specs")]);
    assert_eq!(sequences(&batch), [3]);
    assert_eq!(
        batch[0].sql,
        s(r#"DROP TABLE IF EXISTS "{S}"."robot_specs" CASCADE;"#)
    );
}

#[test]
fn test_many_to_many_creates_join_table_after_tables() {
    let orders = class("Orders");
    let items = class("Items");
    let rels = [rel(&orders, &items, RelationshipType::ManyToMany)];
    let batch = reconcile(&[orders, items], &rels, &[]).unwrap();

    assert_eq!(
        names(&batch),
        [
            s("create schema {S}"),
            s("create table {S}_orders"),
            s("create table {S}_items"),
            s("rel many_to_many {S}_orders_items"),
        ]
    );
    assert_eq!(sequences(&batch), [1, 2, 3, 4]);
    let join = &batch[3].sql;
    assert!(join.contains(&s(r#"CREATE TABLE IF NOT EXISTS "{S}"."orders_items_join""#)));
    assert!(join.contains(r#"PRIMARY KEY ("orders_id", "items_id")"#));
    assert!(join.contains(&s(r#"REFERENCES "{S}"."orders" (id) ON DELETE CASCADE"#)));
    assert!(join.contains(&s(r#"REFERENCES "{S}"."items" (id) ON DELETE CASCADE"#)));
}

#[test]
fn test_long_name_yields_bounded_identifier() {
    let raw = format!("9 {}", "Quarterly report: revenue & costs (draft)! ".repeat(5));
    assert!(raw.len() >= 200);
    let batch = reconcile(&[class(&raw)], &[], &[]).unwrap();
    let prefix = s("create table {S}_");
    let table = batch[1].name.strip_prefix(&prefix).unwrap();

    assert!(table.len() <= 63);
    assert!(table.starts_with("t_9_quarterly_report"));
    assert!(table
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
}

#[test]
fn test_output_is_deterministic() {
    let orders = class("Orders");
    let items = class("Items");
    let classes = [orders.clone(), items.clone()];
    let rels = [
        rel(&orders, &items, RelationshipType::OneToMany),
        rel(&items, &orders, RelationshipType::ManyToMany),
    ];
    let history = [record(&s("create schema {S}"), 1)];
    let first = reconcile(&classes, &rels, &history).unwrap();
    let second = reconcile(&classes, &rels, &history).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_full_model_is_idempotent() {
    let a = class("Orders");
    let b = class("Items");
    let c = class("Customers");
    let classes = [a.clone(), b.clone(), c.clone()];
    let rels = [
        rel(&a, &b, RelationshipType::ManyToMany),
        rel(&c, &a, RelationshipType::OneToMany),
        rel(&c, &b, RelationshipType::OneToOne),
    ];
    let mut history = Vec::new();
    step(&mut history, &classes, &rels);
    assert_eq!(history.len(), 7);
    assert!(reconcile(&classes, &rels, &history).unwrap().is_empty());
}

#[test]
fn test_names_unique_across_batch_and_history() {
    let orders = class("Orders");
    let items = class("Items");
    let rels = [rel(&orders, &items, RelationshipType::OneToMany)];
    let mut history = Vec::new();
    step(&mut history, &[orders.clone(), items.clone()], &rels);
    step(&mut history, &[orders.clone()], &[]);
    step(&mut history, &[orders.clone(), items.clone()], &rels);

    let all: HashSet<&str> = history.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(all.len(), history.len());
    let seqs: Vec<i64> = history.iter().map(|m| m.sequence).collect();
    assert_eq!(seqs, (1..=history.len() as i64).collect::<Vec<_>>());
}

#[test]
fn test_removed_table_drops_its_relationships() {
    let orders = class("Orders");
    let items = class("Items");
    let rels = [rel(&orders, &items, RelationshipType::ManyToMany)];
    let mut history = Vec::new();
    step(&mut history, &[orders.clone(), items], &rels);

    let batch = reconcile(&[orders], &[], &history).unwrap();
    assert_eq!(
        names(&batch),
        [
            s("drop table {S}_items"),
            s("drop rel many_to_many {S}_orders_items"),
        ]
    );
    assert_eq!(sequences(&batch), [5, 6]);
    assert_eq!(
        batch[1].sql,
        s(r#"DROP TABLE IF EXISTS "{S}"."orders_items_join" CASCADE;"#)
    );
}

#[test]
fn test_removed_foreign_key_drops_column() {
    let orders = class("Orders");
    let items = class("Items");
    let classes = [orders.clone(), items.clone()];
    let rels = [rel(&orders, &items, RelationshipType::OneToMany)];
    let mut history = Vec::new();
    step(&mut history, &classes, &rels);

    let batch = reconcile(&classes, &[], &history).unwrap();
    assert_eq!(names(&batch), [s("drop rel one_to_many {S}_orders_items")]);
    assert_eq!(
        batch[0].sql,
        s(r#"ALTER TABLE IF EXISTS "{S}"."items" DROP COLUMN IF EXISTS "orders_id" CASCADE;"#)
    );
}

#[test]
fn test_recreated_table_gets_generation_suffix() {
    let classes = [class("Robot Specs")];
    let mut history = Vec::new();
    step(&mut history, &classes, &[]);
    step(&mut history, &[], &[]);

    let batch = reconcile(&classes, &[], &history).unwrap();
    assert_eq!(names(&batch), [s("create table {S}_robot_specs #2")]);
    assert_eq!(sequences(&batch), [4]);
    apply(&mut history, batch);

    assert!(reconcile(&classes, &[], &history).unwrap().is_empty());
    let batch = reconcile(&[], &[], &history).unwrap();
    assert_eq!(names(&batch), [s("drop table {S}_robot_specs #2")]);
}

#[test]
fn test_legacy_history_is_honored() {
    let history = [
        record(&s("create_schema_{S}"), 1),
        record(&s("create_table_{S}_orders"), 2),
        record(&s("create_table_{S}_items"), 3),
        record(&s("rel_one_to_many_{S}_orders_items"), 4),
    ];
    let orders = class("Orders");
    let items = class("Items");
    let rels = [rel(&orders, &items, RelationshipType::OneToMany)];
    let classes = [orders, items, class("Customers")];

    let batch = reconcile(&classes, &rels, &history).unwrap();
    assert_eq!(names(&batch), [s("create table {S}_customers")]);
    assert_eq!(sequences(&batch), [5]);
}

#[test]
fn test_table_dropped_outside_relationship_tracking() {
    let history = [
        record(&s("create schema {S}"), 1),
        record(&s("create table {S}_orders"), 2),
        record(&s("create table {S}_items"), 3),
        record(&s("rel one_to_many {S}_orders_items"), 4),
        record(&s("drop table {S}_items"), 5),
    ];
    let orders = class("Orders");
    let items = class("Items");
    let rels = [rel(&orders, &items, RelationshipType::OneToMany)];

    let batch = reconcile(&[orders, items], &rels, &history).unwrap();
    assert_eq!(
        names(&batch),
        [
            s("create table {S}_items #2"),
            s("drop rel one_to_many {S}_orders_items"),
            s("rel one_to_many {S}_orders_items #2"),
        ]
    );
}

#[test]
fn test_cardinality_change_replaces_relationship() {
    let orders = class("Orders");
    let items = class("Items");
    let classes = [orders.clone(), items.clone()];
    let mut history = Vec::new();
    step(
        &mut history,
        &classes,
        &[rel(&orders, &items, RelationshipType::OneToMany)],
    );

    let batch = reconcile(
        &classes,
        &[rel(&orders, &items, RelationshipType::OneToOne)],
        &history,
    )
    .unwrap();
    assert_eq!(
        names(&batch),
        [
            s("drop rel one_to_many {S}_orders_items"),
            s("rel one_to_one {S}_orders_items"),
        ]
    );
    assert!(batch[1].sql.contains(r#"UNIQUE ("orders_id")"#));
}

#[test]
fn test_many_to_one_is_stored_as_one_to_many() {
    let orders = class("Orders");
    let items = class("Items");
    let rels = [rel(&items, &orders, RelationshipType::ManyToOne)];
    let batch = reconcile(&[orders, items], &rels, &[]).unwrap();

    let last = batch.last().unwrap();
    assert_eq!(last.name, s("rel one_to_many {S}_orders_items"));
    assert!(last.sql.starts_with(&s(
        r#"ALTER TABLE "{S}"."items" ADD COLUMN IF NOT EXISTS "orders_id" UUID;"#
    )));
    assert!(last.sql.contains(&s(r#"REFERENCES "{S}"."orders" (id)"#)));
}

#[test]
fn test_self_referencing_many_to_many() {
    let parts = class("Parts");
    let rels = [rel(&parts, &parts, RelationshipType::ManyToMany)];
    let batch = reconcile(&[parts], &rels, &[]).unwrap();
    let join = &batch[2];
    assert_eq!(join.name, s("rel many_to_many {S}_parts_parts"));
    assert!(join
        .sql
        .contains(r#"PRIMARY KEY ("from_parts_id", "to_parts_id")"#));
}

#[test]
fn test_dangling_relationship_is_skipped() {
    let orders = class("Orders");
    let ghost = class("Ghost");
    let rels = [rel(&orders, &ghost, RelationshipType::OneToMany)];
    let batch = reconcile(&[orders], &rels, &[]).unwrap();
    assert_eq!(
        names(&batch),
        [s("create schema {S}"), s("create table {S}_orders")]
    );
}

#[test]
fn test_normalized_name_collision_keeps_first() {
    let batch = reconcile(&[class("Robot Specs"), class("robot-specs")], &[], &[]).unwrap();
    assert_eq!(
        names(&batch),
        [s("create schema {S}"), s("create table {S}_robot_specs")]
    );
}

#[test]
fn test_identifiers_stay_within_limit() {
    let a = class(&"Extremely Verbose Classification Name ".repeat(3));
    let b = class(&"Another Remarkably Long Category Title ".repeat(3));
    let rels = [
        rel(&a, &b, RelationshipType::ManyToMany),
        rel(&a, &b, RelationshipType::OneToOne),
    ];
    let batch = reconcile(&[a, b], &rels, &[]).unwrap();
    assert_eq!(batch.len(), 5);
    for migration in &batch {
        for ident in migration.sql.split('"').skip(1).step_by(2) {
            assert!(ident.len() <= 63, "{} exceeds the limit", ident);
        }
    }
}

#[test]
fn test_empty_inputs_yield_nothing() {
    assert!(reconcile(&[], &[], &[]).unwrap().is_empty());
}

#[test]
fn test_nil_tenant_is_rejected() {
    let err = reconcile(&[Classification::new(Uuid::nil(), "Orders")], &[], &[]).unwrap_err();
    assert!(matches!(err, CoreError::MissingTenant { count: 1 }));
}

#[test]
fn test_mixed_tenants_are_rejected() {
    let other = Classification::new(Uuid::new_v4(), "Items");
    let err = reconcile(&[class("Orders"), other], &[], &[]).unwrap_err();
    assert!(matches!(err, CoreError::TenantMismatch { .. }));

    let mut foreign = record("create schema tenant_other", 1);
    foreign.tenant_id = Uuid::new_v4();
    let err = reconcile(&[class("Orders")], &[], &[foreign]).unwrap_err();
    assert!(err.to_string().starts_with("[E002]"));
}

#[test]
fn test_custom_naming_rules() {
    let reconciler = Reconciler::new(NamingConfig {
        schema_prefix: "org_".to_string(),
        ..NamingConfig::default()
    });
    let batch = reconciler.reconcile(&[class("Orders")], &[], &[]).unwrap();
    assert_eq!(
        batch[1].name,
        format!("create table org_{}_orders", TENANT.replace('-', "_"))
    );
}

#[test]
fn test_look_alike_relationship_names_converge() {
    let order = class("Order");
    let order_line = class("Order Line");
    let line_item = class("Line Item");
    let item = class("Item");
    let classes = [order.clone(), order_line.clone(), line_item.clone(), item.clone()];
    let rels = [
        rel(&order, &line_item, RelationshipType::OneToMany),
        rel(&order_line, &item, RelationshipType::OneToMany),
    ];
    let mut history = Vec::new();

    let batch = step(&mut history, &classes, &rels);
    let rel_names: Vec<String> = names(&batch)
        .into_iter()
        .filter(|n| n.starts_with("rel "))
        .collect();
    assert_eq!(rel_names, [s("rel one_to_many {S}_order_line_item")]);
    let fk = batch.last().unwrap();
    assert!(fk.sql.starts_with(&s(
        r#"ALTER TABLE "{S}"."line_item" ADD COLUMN IF NOT EXISTS "order_id" UUID;"#
    )));

    assert!(step(&mut history, &classes, &rels).is_empty());
    assert!(step(&mut history, &classes, &rels).is_empty());
}

#[test]
fn test_new_look_alike_tables_leave_existing_relationship_alone() {
    let order_line = class("Order Line");
    let item = class("Item");
    let rels = [rel(&order_line, &item, RelationshipType::OneToMany)];
    let mut history = Vec::new();
    step(&mut history, &[order_line.clone(), item.clone()], &rels);

    let classes = [order_line, item, class("Order"), class("Line Item")];
    let batch = step(&mut history, &classes, &rels);
    assert_eq!(
        names(&batch),
        [s("create table {S}_order"), s("create table {S}_line_item")]
    );
    assert!(step(&mut history, &classes, &rels).is_empty());
}

#[test]
fn test_foreign_keys_sharing_a_column_keep_first() {
    let orders = class("Orders");
    let items = class("Items");
    let classes = [orders.clone(), items.clone()];
    let both = [
        rel(&orders, &items, RelationshipType::OneToOne),
        rel(&orders, &items, RelationshipType::OneToMany),
    ];
    let mut history = Vec::new();

    let batch = step(&mut history, &classes, &both);
    let rel_names: Vec<String> = names(&batch)
        .into_iter()
        .filter(|n| n.starts_with("rel "))
        .collect();
    assert_eq!(rel_names, [s("rel one_to_one {S}_orders_items")]);
    assert!(step(&mut history, &classes, &both).is_empty());

    // Removing the surviving one-to-one frees the column for the other.
    let rest = [rel(&orders, &items, RelationshipType::OneToMany)];
    let batch = step(&mut history, &classes, &rest);
    assert_eq!(
        names(&batch),
        [
            s("drop rel one_to_one {S}_orders_items"),
            s("rel one_to_many {S}_orders_items"),
        ]
    );
    assert!(batch[0].sql.contains(r#"DROP COLUMN IF EXISTS "orders_id""#));
    assert!(step(&mut history, &classes, &rest).is_empty());
}
