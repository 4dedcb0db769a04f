#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use workshop_api::{
    config::AppConfig,
    db,
    entities::{article, client, maintenance, order, sale, technician},
    entities::maintenance::MaintenanceKind,
    services::{
        articles::CreateArticleInput, clients::CreateClientInput,
        maintenance::CreateMaintenanceInput, orders::CreateOrderInput, sales::CreateSaleInput,
        technicians::CreateTechnicianInput, AppServices,
    },
};

/// Services backed by a fresh in-memory SQLite database.
pub struct TestApp {
    pub services: AppServices,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.auto_migrate = true;

        let pool = db::connect(&cfg)
            .await
            .expect("failed to create test database");

        Self {
            services: AppServices::from_config(Arc::new(pool), &cfg),
        }
    }

    pub async fn client(&self, id: i64, name: &str, surname: &str) -> client::Model {
        self.services
            .clients
            .create(CreateClientInput {
                id,
                name: name.to_string(),
                surname: surname.to_string(),
                email: None,
                contact: None,
                address: None,
            })
            .await
            .expect("create client")
    }

    pub async fn order(&self, client_id: i64) -> order::Model {
        self.services
            .orders
            .create(CreateOrderInput {
                opened_at: Some(at(2024, 3, 1)),
                client_id,
            })
            .await
            .expect("create order")
    }

    pub async fn order_at(&self, client_id: i64, opened_at: DateTime<Utc>) -> order::Model {
        self.services
            .orders
            .create(CreateOrderInput {
                opened_at: Some(opened_at),
                client_id,
            })
            .await
            .expect("create order")
    }

    pub async fn technician(&self, id: i32, name: &str, surname: &str) -> technician::Model {
        self.services
            .technicians
            .create(CreateTechnicianInput {
                id,
                name: name.to_string(),
                surname: surname.to_string(),
                specialty: "Refrigeration".to_string(),
            })
            .await
            .expect("create technician")
    }

    pub async fn article(&self, id: i32, name: &str, price: f64, in_stock: bool) -> article::Model {
        self.services
            .articles
            .create(CreateArticleInput {
                id,
                name: name.to_string(),
                description: None,
                price,
                in_stock,
            })
            .await
            .expect("create article")
    }

    pub async fn maintenance(&self, order_id: i32, description: &str) -> maintenance::Model {
        self.services
            .maintenance
            .create(CreateMaintenanceInput {
                kind: MaintenanceKind::Corrective,
                description: description.to_string(),
                opened_at: at(2024, 3, 2),
                price: 45000.0,
                order_id,
            })
            .await
            .expect("create maintenance")
    }

    pub async fn sale(&self, order_id: i32) -> sale::Model {
        self.services
            .sales
            .create(CreateSaleInput {
                sold_at: at(2024, 3, 3),
                order_id,
            })
            .await
            .expect("create sale")
    }

    /// A client with one order, returning the order.
    pub async fn seeded_order(&self) -> order::Model {
        self.client(1_020_304, "Ana", "Rojas").await;
        self.order(1_020_304).await
    }
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid date")
}
