//! Integration tests for the model queries against an in-memory database.

use chrono::NaiveDate;
use db::{
    DBService,
    models::{
        activity::{ActivityEvent, ActivityKind},
        contract::{Contract, ContractStatus},
        payment::{CreatePayment, Payment, PaymentMode, PaymentStatus},
        tenant::{CreateTenant, Tenant, TenantStatus, UpdateTenant},
        unit::{CreateUnit, Unit, UnitStatus},
    },
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tenant_input(email: &str) -> CreateTenant {
    CreateTenant {
        first_name: "Maria".into(),
        last_name: "Santos".into(),
        email: email.into(),
        contact_number: "09171234567".into(),
        branch: "cainta".into(),
        occupation: Some("Nurse".into()),
        emergency_contact_name: None,
        emergency_contact_number: None,
        profile_id: None,
    }
}

async fn setup() -> (DBService, Tenant, Unit) {
    let db = DBService::new_in_memory().await.unwrap();
    let tenant = Tenant::create(&db.pool, Uuid::new_v4(), &tenant_input("maria@example.com"))
        .await
        .unwrap();
    let unit = Unit::create(
        &db.pool,
        Uuid::new_v4(),
        &CreateUnit {
            unit_number: "101".into(),
            unit_type: "Studio".into(),
            monthly_rent_cents: 850_000,
            branch: "cainta".into(),
        },
    )
    .await
    .unwrap();
    (db, tenant, unit)
}

#[tokio::test]
async fn tenant_with_unit_reflects_active_contract() {
    let (db, tenant, unit) = setup().await;

    let listed = Tenant::list_with_unit(&db.pool, Some("cainta")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].unit_id.is_none());

    Contract::create(&db.pool, Uuid::new_v4(), tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
        .await
        .unwrap();

    let with_unit = Tenant::find_with_unit(&db.pool, tenant.id).await.unwrap().unwrap();
    assert_eq!(with_unit.unit_id, Some(unit.id));
    assert_eq!(with_unit.unit_number.as_deref(), Some("101"));
    assert_eq!(with_unit.monthly_rent_cents, Some(850_000));
    assert_eq!(with_unit.full_name(), "Maria Santos");

    assert!(Tenant::list_with_unit(&db.pool, Some("sampaloc")).await.unwrap().is_empty());
    assert_eq!(Tenant::list_with_unit(&db.pool, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn second_active_contract_on_unit_is_rejected() {
    let (db, tenant, unit) = setup().await;
    let other = Tenant::create(&db.pool, Uuid::new_v4(), &tenant_input("other@example.com"))
        .await
        .unwrap();

    Contract::create(&db.pool, Uuid::new_v4(), tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
        .await
        .unwrap();
    let second =
        Contract::create(&db.pool, Uuid::new_v4(), other.id, unit.id, date(2025, 2, 1), date(2025, 12, 31))
            .await;
    assert!(second.is_err());
}

#[tokio::test]
async fn inactive_contracts_do_not_block_the_unit() {
    let (db, tenant, unit) = setup().await;
    let first =
        Contract::create(&db.pool, Uuid::new_v4(), tenant.id, unit.id, date(2024, 1, 1), date(2024, 12, 31))
            .await
            .unwrap();
    Contract::set_status(&db.pool, first.id, ContractStatus::Inactive).await.unwrap();

    Contract::create(&db.pool, Uuid::new_v4(), tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
        .await
        .unwrap();

    assert_eq!(Contract::list_by_tenant(&db.pool, tenant.id).await.unwrap().len(), 2);
    let active = Contract::find_active_by_unit(&db.pool, unit.id).await.unwrap().unwrap();
    assert_eq!(active.start_date, date(2025, 1, 1));
}

#[tokio::test]
async fn update_tenant_keeps_unset_fields() {
    let (db, tenant, _) = setup().await;
    let updated = Tenant::update(
        &db.pool,
        tenant.id,
        &UpdateTenant {
            contact_number: Some("09998887777".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.contact_number, "09998887777");
    assert_eq!(updated.occupation.as_deref(), Some("Nurse"));

    Tenant::set_status(&db.pool, tenant.id, TenantStatus::Inactive).await.unwrap();
    let reloaded = Tenant::find_by_id(&db.pool, tenant.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, TenantStatus::Inactive);
}

#[tokio::test]
async fn review_only_moves_pending_payments() {
    let (db, tenant, unit) = setup().await;
    let contract =
        Contract::create(&db.pool, Uuid::new_v4(), tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
            .await
            .unwrap();
    let payment = Payment::create(
        &db.pool,
        Uuid::new_v4(),
        &CreatePayment {
            tenant_id: tenant.id,
            contract_id: contract.id,
            amount_cents: 850_000,
            payment_date: date(2025, 2, 3),
            payment_mode: PaymentMode::Gcash,
            status: PaymentStatus::Pending,
            receipt_path: None,
            notes: None,
            reviewed_by: None,
        },
    )
    .await
    .unwrap();
    assert!(payment.reviewed_at.is_none());
    assert_eq!(Payment::count_pending(&db.pool, Some("cainta")).await.unwrap(), 1);

    let reviewer = Uuid::new_v4();
    let confirmed = Payment::review_if_pending(&db.pool, payment.id, PaymentStatus::Confirmed, reviewer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, PaymentStatus::Confirmed);
    assert_eq!(confirmed.reviewed_by, Some(reviewer));
    assert!(confirmed.reviewed_at.is_some());

    let again = Payment::review_if_pending(&db.pool, payment.id, PaymentStatus::Rejected, reviewer)
        .await
        .unwrap();
    assert!(again.is_none());

    let dates = Payment::confirmed_dates_for_tenant(&db.pool, tenant.id).await.unwrap();
    assert_eq!(dates, vec![date(2025, 2, 3)]);
}

#[tokio::test]
async fn unit_status_counts_and_filters() {
    let (db, _, unit) = setup().await;
    Unit::set_status(&db.pool, unit.id, UnitStatus::Maintenance).await.unwrap();

    let counts = Unit::status_counts(&db.pool, Some("cainta")).await.unwrap();
    assert_eq!(counts.maintenance, 1);
    assert_eq!(counts.available, 0);

    let in_maintenance = Unit::list(&db.pool, None, Some(UnitStatus::Maintenance)).await.unwrap();
    assert_eq!(in_maintenance.len(), 1);
    assert!(Unit::list(&db.pool, None, Some(UnitStatus::Occupied)).await.unwrap().is_empty());
}

#[tokio::test]
async fn activity_feed_includes_new_tenants() {
    let (db, tenant, _) = setup().await;
    let events = ActivityEvent::recent_for_branch(&db.pool, "cainta", 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ActivityKind::NewTenant);
    assert_eq!(events[0].reference_id, tenant.id);
}
