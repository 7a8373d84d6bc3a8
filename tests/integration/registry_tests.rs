//! Device and supervisor registry tests

use custodia_server::{
    error::AppError,
    models::audit::{AuditAction, AuditEntity, AuditQuery},
    models::device::{CreateDevice, DeviceQuery, DeviceStatus, UpdateDevice},
    models::loan::OpenLoan,
    models::supervisor::{CreateSupervisor, PermissionLevel, SupervisorQuery, UpdateSupervisor},
};

use crate::common::{create_device, create_supervisor, services, unique_id};

#[tokio::test]
#[ignore]
async fn test_duplicate_supervisor_email() {
    let services = services().await;
    let existing = create_supervisor(&services, "DUP").await;

    let result = services
        .supervisors
        .create_supervisor(CreateSupervisor {
            id: unique_id("DUP"),
            name: "Someone else".to_string(),
            email: existing.email.to_uppercase(),
            phone: None,
            permission_level: Some(PermissionLevel::Admin),
        })
        .await;
    assert!(matches!(result, Err(AppError::DuplicateKey(_))));
}

#[tokio::test]
#[ignore]
async fn test_invalid_email_is_rejected_before_write() {
    let services = services().await;
    let id = unique_id("BAD");

    let result = services
        .supervisors
        .create_supervisor(CreateSupervisor {
            id: id.clone(),
            name: "Bad Email".to_string(),
            email: "not-an-email".to_string(),
            phone: None,
            permission_level: None,
        })
        .await;
    assert!(matches!(result, Err(AppError::InvalidFormat(_))));

    let lookup = services.supervisors.get_supervisor(&id).await;
    assert!(matches!(lookup, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_supervisor_list_counts_open_loans() {
    let services = services().await;
    let device = create_device(&services, "CNT").await;
    let supervisor = create_supervisor(&services, "CNT").await;

    services
        .loans
        .open_loan(OpenLoan {
            device_id: device.id.clone(),
            supervisor_id: supervisor.id.clone(),
            location: None,
            notes: None,
        })
        .await
        .unwrap();

    let query = SupervisorQuery {
        name: Some(supervisor.email.clone()),
        ..Default::default()
    };
    let (rows, total) = services.supervisors.list_supervisors(&query).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].open_loans, 1);

    // Loan history blocks deletion of both sides
    let delete_supervisor = services.supervisors.delete_supervisor(&supervisor.id).await;
    assert!(matches!(delete_supervisor, Err(AppError::InvalidState(_))));
    let delete_device = services.devices.delete_device(&device.id).await;
    assert!(matches!(delete_device, Err(AppError::InvalidState(_))));

    services.loans.close_loan_by_device(&device.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_update_supervisor_permission_level() {
    let services = services().await;
    let supervisor = create_supervisor(&services, "UPD").await;
    assert_eq!(supervisor.permission_level, PermissionLevel::Basic);

    let updated = services
        .supervisors
        .update_supervisor(
            &supervisor.id,
            UpdateSupervisor {
                permission_level: Some(PermissionLevel::Advanced),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.permission_level, PermissionLevel::Advanced);
    assert_eq!(updated.email, supervisor.email);
    assert_eq!(updated.phone, supervisor.phone);

    let cleared = services
        .supervisors
        .update_supervisor(
            &supervisor.id,
            UpdateSupervisor {
                phone: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.phone.is_none());
    assert_eq!(cleared.permission_level, PermissionLevel::Advanced);
}

#[tokio::test]
#[ignore]
async fn test_device_cannot_be_created_in_use() {
    let services = services().await;
    let result = services
        .devices
        .create_device(CreateDevice {
            id: unique_id("USE"),
            name: "Projector".to_string(),
            category: None,
            status: Some(DeviceStatus::InUse),
            last_maintenance_date: None,
            location: None,
            supervisor_id: None,
        })
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_device_id() {
    let services = services().await;
    let device = create_device(&services, "TWIN").await;

    let result = services
        .devices
        .create_device(CreateDevice {
            id: device.id.clone(),
            name: "Twin".to_string(),
            category: None,
            status: None,
            last_maintenance_date: None,
            location: None,
            supervisor_id: None,
        })
        .await;
    assert!(matches!(result, Err(AppError::DuplicateKey(_))));
}

#[tokio::test]
#[ignore]
async fn test_location_change_is_recorded() {
    let services = services().await;
    let device = create_device(&services, "MOVE").await;
    let supervisor = create_supervisor(&services, "MOVE").await;

    let updated = services
        .devices
        .update_device(
            &device.id,
            UpdateDevice {
                location: Some(Some("Lab 1".to_string())),
                supervisor_id: Some(Some(supervisor.id.clone())),
                moved_by: Some(supervisor.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.location.as_deref(), Some("Lab 1"));
    assert_eq!(updated.supervisor_name.as_deref(), Some(supervisor.name.as_str()));

    let movements = services.devices.list_movements(&device.id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].previous_location.as_deref(), Some("Store room"));
    assert_eq!(movements[0].new_location, "Lab 1");

    // Deleting the supervisor clears the weak reference
    services.supervisors.delete_supervisor(&supervisor.id).await.unwrap();
    let device = services.devices.get_device(&device.id).await.unwrap();
    assert!(device.supervisor_id.is_none());

    services.devices.delete_device(&device.id).await.unwrap();
    let gone = services.devices.get_device(&device.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_device_fields_can_be_cleared() {
    let services = services().await;
    let device = create_device(&services, "CLR").await;
    let supervisor = create_supervisor(&services, "CLR").await;

    let assigned = services
        .devices
        .update_device(
            &device.id,
            UpdateDevice {
                supervisor_id: Some(Some(supervisor.id.clone())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(assigned.supervisor_id.as_deref(), Some(supervisor.id.as_str()));

    let cleared = services
        .devices
        .update_device(
            &device.id,
            UpdateDevice {
                supervisor_id: Some(None),
                category: Some(None),
                location: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.supervisor_id.is_none());
    assert!(cleared.supervisor_name.is_none());
    assert!(cleared.category.is_none());
    assert!(cleared.location.is_none());
    assert_eq!(cleared.name, device.name);

    // Clearing the location is not a move
    let movements = services.devices.list_movements(&device.id).await.unwrap();
    assert!(movements.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_search_treats_wildcards_literally() {
    let services = services().await;
    let device = create_device(&services, "LIKE").await;

    let exact = DeviceQuery {
        name: Some(device.id.to_lowercase()),
        ..Default::default()
    };
    let (rows, total) = services.devices.list_devices(&exact).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, device.id);

    // `_` would match the dash if it were a wildcard
    let underscored = DeviceQuery {
        name: Some(device.id.replace('-', "_")),
        ..Default::default()
    };
    let (_, total) = services.devices.list_devices(&underscored).await.unwrap();
    assert_eq!(total, 0);

    let supervisor = create_supervisor(&services, "LIKE").await;
    let wildcard = SupervisorQuery {
        name: Some(supervisor.email.replace('@', "%")),
        ..Default::default()
    };
    let (_, total) = services.supervisors.list_supervisors(&wildcard).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
#[ignore]
async fn test_registry_writes_are_audited() {
    let services = services().await;
    let supervisor = create_supervisor(&services, "TRAIL").await;
    let device = create_device(&services, "TRAIL").await;

    services
        .devices
        .update_device(
            &device.id,
            UpdateDevice {
                location: Some(Some("Lab 4".to_string())),
                moved_by: Some(supervisor.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    services
        .supervisors
        .update_supervisor(
            &supervisor.id,
            UpdateSupervisor {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    services.supervisors.delete_supervisor(&supervisor.id).await.unwrap();

    // The trail survives the supervisor
    let (entries, total) = services
        .supervisors
        .list_audit(&supervisor.id, &AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 4);
    let trail: Vec<(AuditEntity, AuditAction)> =
        entries.iter().map(|e| (e.entity, e.action)).collect();
    assert_eq!(
        trail,
        vec![
            (AuditEntity::Supervisor, AuditAction::Delete),
            (AuditEntity::Supervisor, AuditAction::Update),
            (AuditEntity::Device, AuditAction::Update),
            (AuditEntity::Supervisor, AuditAction::Create),
        ]
    );

    let renamed = &entries[1];
    assert_eq!(renamed.previous_data.as_ref().unwrap()["name"], supervisor.name.as_str());
    assert_eq!(renamed.new_data.as_ref().unwrap()["name"], "Renamed");
    assert!(entries[0].new_data.is_none());

    let moved = &entries[2];
    assert_eq!(moved.record_id, device.id);
    assert_eq!(moved.new_data.as_ref().unwrap()["location"], "Lab 4");
}
