//! Loan ledger tests

use chrono::{Duration, Utc};
use custodia_server::{
    error::AppError,
    models::audit::{AuditAction, AuditEntity, AuditQuery},
    models::device::DeviceStatus,
    models::loan::{LoanQuery, LoanState, OpenLoan},
};

use crate::common::{create_device, create_supervisor, pool, services, unique_id};

fn all_loans_of(device_id: &str) -> LoanQuery {
    LoanQuery {
        device_id: Some(device_id.to_string()),
        state: Some(LoanState::All),
        ..Default::default()
    }
}

fn open_loans_of(device_id: &str) -> LoanQuery {
    LoanQuery {
        state: Some(LoanState::Open),
        ..all_loans_of(device_id)
    }
}

fn open_request(device_id: &str, supervisor_id: &str) -> OpenLoan {
    OpenLoan {
        device_id: device_id.to_string(),
        supervisor_id: supervisor_id.to_string(),
        location: None,
        notes: None,
    }
}

#[tokio::test]
#[ignore]
async fn test_lend_second_lend_and_return() {
    let services = services().await;
    let d1 = create_device(&services, "D1").await;
    let s1 = create_supervisor(&services, "S1").await;
    let s2 = create_supervisor(&services, "S2").await;

    let loan = services
        .loans
        .open_loan(open_request(&d1.id, &s1.id))
        .await
        .expect("First loan should open");
    assert!(loan.is_open());
    let device = services.devices.get_device(&d1.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::InUse);

    let second = services.loans.open_loan(open_request(&d1.id, &s2.id)).await;
    assert!(matches!(second, Err(AppError::InvalidState(_))));
    let device = services.devices.get_device(&d1.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::InUse);

    // The rejected lend wrote nothing
    let (rows, total) = services.loans.list_loans(&all_loans_of(&d1.id)).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, loan.id);
    assert_eq!(rows[0].supervisor_id, s1.id);
    assert!(rows[0].return_date.is_none());

    let closed = services.loans.close_loan(&loan.id).await.expect("Loan should close");
    assert!(closed.return_date.is_some());
    let device = services.devices.get_device(&d1.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Available);

    // Closing twice finds no open loan
    let again = services.loans.close_loan(&loan.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    // The returned device can be lent again
    let reopened = services
        .loans
        .open_loan(open_request(&d1.id, &s2.id))
        .await
        .expect("Returned device should be lendable");
    assert_ne!(reopened.id, loan.id);
    let device = services.devices.get_device(&d1.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::InUse);

    let (open, total) = services.loans.list_loans(&open_loans_of(&d1.id)).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(open[0].id, reopened.id);
    assert_eq!(open[0].supervisor_id, s2.id);

    services.loans.close_loan(&reopened.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_concurrent_lends_leave_one_open_loan() {
    let services = services().await;
    let device = create_device(&services, "RACE").await;
    let s1 = create_supervisor(&services, "R1").await;
    let s2 = create_supervisor(&services, "R2").await;

    let (a, b) = tokio::join!(
        services.loans.open_loan(open_request(&device.id, &s1.id)),
        services.loans.open_loan(open_request(&device.id, &s2.id)),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(AppError::InvalidState(_))));

    let (_, open) = services.loans.list_loans(&open_loans_of(&device.id)).await.unwrap();
    assert_eq!(open, 1);
}

#[tokio::test]
#[ignore]
async fn test_unknown_device_or_supervisor() {
    let services = services().await;
    let device = create_device(&services, "NF").await;
    let supervisor = create_supervisor(&services, "NF").await;

    let missing_device = services
        .loans
        .open_loan(open_request(&unique_id("GHOST"), &supervisor.id))
        .await;
    assert!(matches!(missing_device, Err(AppError::NotFound(_))));

    let missing_supervisor = services
        .loans
        .open_loan(open_request(&device.id, &unique_id("GHOST")))
        .await;
    assert!(matches!(missing_supervisor, Err(AppError::NotFound(_))));

    let device = services.devices.get_device(&device.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Available);
}

#[tokio::test]
#[ignore]
async fn test_device_in_maintenance_cannot_be_lent() {
    let services = services().await;
    let device = create_device(&services, "MNT").await;
    let supervisor = create_supervisor(&services, "MNT").await;

    services.devices.start_maintenance(&device.id).await.unwrap();
    let result = services.loans.open_loan(open_request(&device.id, &supervisor.id)).await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    let (_, total) = services.loans.list_loans(&all_loans_of(&device.id)).await.unwrap();
    assert_eq!(total, 0);
    let device = services.devices.get_device(&device.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Maintenance);

    let device = services.devices.finish_maintenance(&device.id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Available);
    assert!(device.last_maintenance_date.is_some());
}

#[tokio::test]
#[ignore]
async fn test_return_by_scanned_device() {
    let services = services().await;
    let device = create_device(&services, "SCAN").await;
    let supervisor = create_supervisor(&services, "SCAN").await;

    let loan = services
        .loans
        .open_loan(OpenLoan {
            location: Some("Lab 3".to_string()),
            ..open_request(&device.id, &supervisor.id)
        })
        .await
        .unwrap();

    let details = services.loans.get_loan(&loan.id).await.unwrap();
    assert_eq!(details.location.as_deref(), Some("Lab 3"));
    assert_eq!(details.device_name, device.name);

    let closed = services.loans.close_loan_by_device(&device.id).await.unwrap();
    assert_eq!(closed.id, loan.id);

    let none_open = services.loans.close_loan_by_device(&device.id).await;
    assert!(matches!(none_open, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_backdated_loan_is_overdue() {
    let pool = pool().await;
    let services = services().await;
    let device = create_device(&services, "OLD").await;
    let supervisor = create_supervisor(&services, "OLD").await;

    let loan = services
        .loans
        .open_loan(open_request(&device.id, &supervisor.id))
        .await
        .unwrap();

    sqlx::query("UPDATE loans SET loan_date = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::days(8))
        .bind(&loan.id)
        .execute(&pool)
        .await
        .unwrap();

    let details = services.loans.get_loan(&loan.id).await.unwrap();
    assert!(details.is_overdue);

    let overdue = services.loans.list_overdue_loans().await.unwrap();
    assert!(overdue.iter().any(|l| l.id == loan.id));

    let query = LoanQuery {
        supervisor_id: Some(supervisor.id.clone()),
        overdue: Some(true),
        ..Default::default()
    };
    let (rows, total) = services.loans.list_loans(&query).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, loan.id);

    services.loans.close_loan(&loan.id).await.unwrap();
    let details = services.loans.get_loan(&loan.id).await.unwrap();
    assert!(!details.is_overdue);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_reflects_open_loan() {
    let services = services().await;
    let device = create_device(&services, "DASH").await;
    let supervisor = create_supervisor(&services, "DASH").await;

    let loan = services
        .loans
        .open_loan(open_request(&device.id, &supervisor.id))
        .await
        .unwrap();

    let metrics = services.dashboard.metrics().await;
    assert!(metrics.errors.is_empty());
    assert!(metrics.open_loans >= 1);
    assert!(metrics.by_status.in_use >= 1);
    assert_eq!(metrics.total_devices, metrics.by_status.total());
    assert!(!metrics.recent_activity.is_empty());
    assert!(metrics.alerts.iter().any(|a| a.title == "Active loans"));

    services.loans.close_loan(&loan.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_loan_writes_are_audited() {
    let services = services().await;
    let device = create_device(&services, "AUD").await;
    let supervisor = create_supervisor(&services, "AUD").await;

    let loan = services
        .loans
        .open_loan(open_request(&device.id, &supervisor.id))
        .await
        .unwrap();
    services.loans.close_loan(&loan.id).await.unwrap();

    let (entries, total) = services
        .supervisors
        .list_audit(&supervisor.id, &AuditQuery::default())
        .await
        .unwrap();
    // create supervisor, lend, return
    assert_eq!(total, 3);
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Return, AuditAction::Lend, AuditAction::Create]
    );

    let returned = &entries[0];
    assert_eq!(returned.entity, AuditEntity::Loan);
    assert_eq!(returned.record_id, loan.id);
    let before = returned.previous_data.as_ref().unwrap();
    let after = returned.new_data.as_ref().unwrap();
    assert!(before["return_date"].is_null());
    assert!(after["return_date"].is_string());

    // A rejected write leaves no entry
    services.devices.start_maintenance(&device.id).await.unwrap();
    let rejected = services.loans.open_loan(open_request(&device.id, &supervisor.id)).await;
    assert!(rejected.is_err());
    let (_, total) = services
        .supervisors
        .list_audit(&supervisor.id, &AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 3);
}
