mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{at, TestApp};
use rstest::rstest;
use workshop_api::{
    entities::maintenance::MaintenanceKind,
    services::{
        articles::UpdateArticleInput,
        clients::{CreateClientInput, UpdateClientInput},
        maintenance::{CreateMaintenanceInput, UpdateMaintenanceInput},
        orders::{CreateOrderInput, UpdateOrderInput},
        sales::{CreateSaleInput, UpdateSaleInput},
        technicians::{CreateTechnicianInput, UpdateTechnicianInput},
    },
    ServiceError,
};

fn client_input(id: i64, email: Option<&str>) -> CreateClientInput {
    CreateClientInput {
        id,
        name: "Luis".into(),
        surname: "Mejia".into(),
        email: email.map(str::to_string),
        contact: Some(3_104_567_890),
        address: None,
    }
}

#[tokio::test]
async fn duplicate_client_id_is_conflict() {
    let app = TestApp::new().await;
    app.services
        .clients
        .create(client_input(123_456, None))
        .await
        .unwrap();

    let err = app
        .services
        .clients
        .create(client_input(123_456, None))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn duplicate_email_is_conflict_on_create_and_update() {
    let app = TestApp::new().await;
    app.services
        .clients
        .create(client_input(123_456, Some("luis@example.com")))
        .await
        .unwrap();

    let err = app
        .services
        .clients
        .create(client_input(654_321, Some("luis@example.com")))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    app.services
        .clients
        .create(client_input(654_321, Some("other@example.com")))
        .await
        .unwrap();
    let err = app
        .services
        .clients
        .update(
            654_321,
            UpdateClientInput {
                email: Some("luis@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    // Re-submitting the client's own email is not a conflict.
    let unchanged = app
        .services
        .clients
        .update(
            123_456,
            UpdateClientInput {
                email: Some("luis@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged.email.as_deref(), Some("luis@example.com"));
}

#[rstest]
#[case(client_input(99_999, None))]
#[case(CreateClientInput { contact: Some(12345), ..client_input(123_456, None) })]
#[case(CreateClientInput { email: Some("not-an-email".into()), ..client_input(123_456, None) })]
#[case(CreateClientInput { name: String::new(), ..client_input(123_456, None) })]
#[tokio::test]
async fn invalid_client_payloads_are_rejected(#[case] input: CreateClientInput) {
    let app = TestApp::new().await;
    let err = app.services.clients.create(input).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert_matches!(app.services.clients.list().await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let app = TestApp::new().await;
    assert_matches!(app.services.clients.get(123_456).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.orders.get(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.technicians.get(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.articles.get(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.maintenance.get(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.sales.get(1).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn empty_collections_list_as_not_found() {
    let app = TestApp::new().await;
    assert_matches!(app.services.clients.list().await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.orders.list().await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.technicians.list().await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.articles.list().await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.maintenance.list().await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.sales.list().await, Err(ServiceError::NotFound(_)));

    app.client(123_456, "Ana", "Rojas").await;
    assert_eq!(app.services.clients.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn children_require_existing_parents() {
    let app = TestApp::new().await;

    let err = app
        .services
        .orders
        .create(CreateOrderInput {
            opened_at: None,
            client_id: 123_456,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .maintenance
        .create(CreateMaintenanceInput {
            kind: MaintenanceKind::Preventive,
            description: "Filter change".into(),
            opened_at: at(2024, 1, 1),
            price: 10.0,
            order_id: 42,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .sales
        .create(CreateSaleInput {
            sold_at: at(2024, 1, 1),
            order_id: 42,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn order_defaults_open_timestamp_to_now() {
    let app = TestApp::new().await;
    app.client(123_456, "Ana", "Rojas").await;

    let before = chrono::Utc::now() - Duration::seconds(5);
    let order = app
        .services
        .orders
        .create(CreateOrderInput {
            opened_at: None,
            client_id: 123_456,
        })
        .await
        .unwrap();
    assert!(order.opened_at >= before);
    assert_eq!(order.client_id, 123_456);
}

#[tokio::test]
async fn duplicate_technician_and_article_ids_conflict() {
    let app = TestApp::new().await;
    app.technician(7, "Carlos", "Perez").await;
    app.article(3, "Aspas AC", 58000.0, true).await;

    let err = app
        .services
        .technicians
        .create(CreateTechnicianInput {
            id: 7,
            name: "Other".into(),
            surname: "Person".into(),
            specialty: "Electrical".into(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let err = app
        .services
        .articles
        .create(workshop_api::services::articles::CreateArticleInput {
            id: 3,
            name: "Duplicate".into(),
            description: None,
            price: 1.0,
            in_stock: false,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn empty_and_matching_updates_return_record_unchanged() {
    let app = TestApp::new().await;
    let client = app.client(123_456, "Ana", "Rojas").await;
    let technician = app.technician(7, "Carlos", "Perez").await;
    let article = app.article(3, "Aspas AC", 58000.0, true).await;

    let same = app
        .services
        .clients
        .update(123_456, UpdateClientInput::default())
        .await
        .unwrap();
    assert_eq!(same, client);

    let same = app
        .services
        .clients
        .update(
            123_456,
            UpdateClientInput {
                name: Some("Ana".into()),
                surname: Some("Rojas".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same, client);

    let same = app
        .services
        .technicians
        .update(
            7,
            UpdateTechnicianInput {
                specialty: Some(technician.specialty.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same, technician);

    let same = app
        .services
        .articles
        .update(
            3,
            UpdateArticleInput {
                price: Some(58000.0),
                in_stock: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same, article);
}

#[tokio::test]
async fn partial_update_changes_only_supplied_fields() {
    let app = TestApp::new().await;
    app.client(123_456, "Ana", "Rojas").await;

    let updated = app
        .services
        .clients
        .update(
            123_456,
            UpdateClientInput {
                surname: Some("Gomez".into()),
                address: Some("Calle 10 # 4-21".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Ana");
    assert_eq!(updated.surname, "Gomez");
    assert_eq!(updated.address.as_deref(), Some("Calle 10 # 4-21"));
    assert_eq!(app.services.clients.get(123_456).await.unwrap(), updated);
}

#[tokio::test]
async fn changing_parent_reference_validates_new_parent() {
    let app = TestApp::new().await;
    let order = app.seeded_order().await;
    let job = app.maintenance(order.id, "Compressor").await;
    let sale = app.sale(order.id).await;

    let err = app
        .services
        .maintenance
        .update(
            job.id,
            UpdateMaintenanceInput {
                order_id: Some(999),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .sales
        .update(
            sale.id,
            UpdateSaleInput {
                order_id: Some(999),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .orders
        .update(
            order.id,
            UpdateOrderInput {
                client_id: Some(999_999),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // Nothing was written by the rejected updates.
    assert_eq!(app.services.maintenance.get(job.id).await.unwrap(), job);
    assert_eq!(app.services.sales.get(sale.id).await.unwrap(), sale);

    let second = app.order(order.client_id).await;
    let moved = app
        .services
        .maintenance
        .update(
            job.id,
            UpdateMaintenanceInput {
                order_id: Some(second.id),
                closed_at: Some(at(2024, 3, 9)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.order_id, second.id);
    assert_eq!(moved.closed_at, Some(at(2024, 3, 9)));
}

#[tokio::test]
async fn client_with_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let order = app.seeded_order().await;

    let err = app.services.clients.delete(order.client_id).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
    assert!(app.services.clients.get(order.client_id).await.is_ok());

    app.services.orders.delete(order.id).await.unwrap();
    app.services.clients.delete(order.client_id).await.unwrap();
    assert_matches!(
        app.services.clients.get(order.client_id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn referenced_records_cannot_be_deleted() {
    let app = TestApp::new().await;
    let order = app.seeded_order().await;
    let job = app.maintenance(order.id, "Compressor").await;
    let sale = app.sale(order.id).await;
    app.technician(7, "Carlos", "Perez").await;
    app.article(3, "Aspas AC", 58000.0, true).await;

    app.services
        .maintenance_technicians
        .assign(job.id, 7)
        .await
        .unwrap();
    app.services
        .sale_articles
        .assign(workshop_api::services::sale_articles::AssignArticleInput {
            sale_id: sale.id,
            article_id: 3,
            quantity: 1,
        })
        .await
        .unwrap();

    assert_matches!(app.services.technicians.delete(7).await, Err(ServiceError::Conflict(_)));
    assert_matches!(app.services.articles.delete(3).await, Err(ServiceError::Conflict(_)));
    assert_matches!(app.services.maintenance.delete(job.id).await, Err(ServiceError::Conflict(_)));
    assert_matches!(app.services.sales.delete(sale.id).await, Err(ServiceError::Conflict(_)));

    // Every guarded record survives.
    assert!(app.services.technicians.get(7).await.is_ok());
    assert!(app.services.articles.get(3).await.is_ok());
    assert!(app.services.maintenance.get(job.id).await.is_ok());
    assert!(app.services.sales.get(sale.id).await.is_ok());

    app.services
        .maintenance_technicians
        .remove(job.id, 7)
        .await
        .unwrap();
    app.services.sale_articles.remove(sale.id, 3).await.unwrap();

    app.services.technicians.delete(7).await.unwrap();
    app.services.articles.delete(3).await.unwrap();
    app.services.maintenance.delete(job.id).await.unwrap();
    app.services.sales.delete(sale.id).await.unwrap();
}

#[tokio::test]
async fn deleting_missing_records_is_not_found() {
    let app = TestApp::new().await;
    assert_matches!(app.services.clients.delete(123_456).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.orders.delete(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.technicians.delete(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.articles.delete(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.maintenance.delete(1).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.services.sales.delete(1).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn reversed_date_ranges_are_invalid_input() {
    let app = TestApp::new().await;
    let start = at(2024, 3, 10);
    let end = at(2024, 3, 1);

    assert_matches!(
        app.services.orders.list_in_range(start, end).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        app.services.maintenance.list_in_range(start, end).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        app.services.sales.list_in_range(start, end).await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn date_range_listings() {
    let app = TestApp::new().await;
    let order = app.seeded_order().await;
    let job = app.maintenance(order.id, "Compressor").await;
    let sale = app.sale(order.id).await;

    let orders = app
        .services
        .orders
        .list_in_range(at(2024, 2, 28), at(2024, 3, 1))
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order.id, order.id);

    let sales = app
        .services
        .sales
        .list_in_range(at(2024, 3, 3), at(2024, 3, 4))
        .await
        .unwrap();
    assert_eq!(sales, vec![sale]);

    assert_matches!(
        app.services
            .sales
            .list_in_range(at(2025, 1, 1), at(2025, 2, 1))
            .await,
        Err(ServiceError::NotFound(_))
    );

    // Matched on the close timestamp alone.
    app.services
        .maintenance
        .update(
            job.id,
            UpdateMaintenanceInput {
                closed_at: Some(at(2024, 4, 15)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let jobs = app
        .services
        .maintenance
        .list_in_range(at(2024, 4, 1), at(2024, 4, 30))
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, job.id);
}

#[tokio::test]
async fn maintenance_listings_by_kind_and_order() {
    let app = TestApp::new().await;
    let order = app.seeded_order().await;
    let job = app.maintenance(order.id, "Compressor").await;

    let corrective = app
        .services
        .maintenance
        .list_by_kind(MaintenanceKind::Corrective)
        .await
        .unwrap();
    assert_eq!(corrective, vec![job.clone()]);
    assert_matches!(
        app.services
            .maintenance
            .list_by_kind(MaintenanceKind::Preventive)
            .await,
        Err(ServiceError::NotFound(_))
    );

    assert_eq!(
        app.services.maintenance.list_for_order(order.id).await.unwrap(),
        vec![job]
    );
    assert_matches!(
        app.services.maintenance.list_for_order(999).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn articles_by_availability() {
    let app = TestApp::new().await;
    app.article(1, "Splitter 3 inch", 11000.0, true).await;
    app.article(2, "Fusible 5A", 2500.0, false).await;

    let available = app.services.articles.list_by_availability(true).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, 1);

    let unavailable = app.services.articles.list_by_availability(false).await.unwrap();
    assert_eq!(unavailable[0].id, 2);

    app.services
        .articles
        .update(
            2,
            UpdateArticleInput {
                in_stock: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_matches!(
        app.services.articles.list_by_availability(false).await,
        Err(ServiceError::NotFound(_))
    );
}
