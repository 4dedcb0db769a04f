use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{client, order},
    errors::ServiceError,
    services::{
        non_empty,
        search::{self, Page, SearchLimits, SearchParams, Searchable},
        stage,
    },
};

/// Input for creating a client
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientInput {
    #[validate(range(min = 100000))]
    pub id: i64,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub surname: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(range(min = 3000000000))]
    pub contact: Option<i64>,
    pub address: Option<String>,
}

/// Partial update; only supplied fields are considered
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateClientInput {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub surname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(range(min = 3000000000))]
    pub contact: Option<i64>,
    pub address: Option<String>,
}

impl UpdateClientInput {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.surname.is_none()
            && self.email.is_none()
            && self.contact.is_none()
            && self.address.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ClientSortField {
    #[default]
    Name,
    Surname,
    Email,
}

impl Searchable for client::Model {
    type SortField = ClientSortField;

    fn search_text(&self) -> Vec<&str> {
        vec![
            &self.name,
            &self.surname,
            self.email.as_deref().unwrap_or(""),
        ]
    }

    fn sort_text(&self, field: ClientSortField) -> &str {
        match field {
            ClientSortField::Name => &self.name,
            ClientSortField::Surname => &self.surname,
            ClientSortField::Email => self.email.as_deref().unwrap_or(""),
        }
    }
}

/// Loads a client or reports it missing.
pub(crate) async fn require<C: ConnectionTrait>(
    conn: &C,
    client_id: i64,
) -> Result<client::Model, ServiceError> {
    client::Entity::find_by_id(client_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Client {} does not exist", client_id)))
}

async fn ensure_email_free<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    except: Option<i64>,
) -> Result<(), ServiceError> {
    let mut query = client::Entity::find().filter(client::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(client::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        warn!(email, "email already registered");
        return Err(ServiceError::Conflict(format!(
            "Email {} is already registered to another client",
            email
        )));
    }
    Ok(())
}

/// Service for managing clients
#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
    limits: SearchLimits,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            limits: SearchLimits::default(),
        }
    }

    pub fn with_search_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Creates a new client
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateClientInput) -> Result<client::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;

        if client::Entity::find_by_id(input.id).one(&txn).await?.is_some() {
            warn!(client_id = input.id, "client already exists");
            return Err(ServiceError::Conflict(format!(
                "Client {} already exists",
                input.id
            )));
        }
        if let Some(email) = input.email.as_deref() {
            ensure_email_free(&txn, email, None).await?;
        }

        let client_id = input.id;
        let created = client::ActiveModel {
            id: Set(input.id),
            name: Set(input.name),
            surname: Set(input.surname),
            email: Set(input.email),
            contact: Set(input.contact),
            address: Set(input.address),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(
                e,
                format!("Client {} or its email is already registered", client_id),
            )
        })?;

        txn.commit().await?;
        info!(client_id, "client created");
        Ok(created)
    }

    /// Gets a client by id
    #[instrument(skip(self))]
    pub async fn get(&self, client_id: i64) -> Result<client::Model, ServiceError> {
        require(&*self.db_pool, client_id).await
    }

    /// Lists every client
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<client::Model>, ServiceError> {
        let clients = client::Entity::find()
            .order_by_asc(client::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(clients, || "No clients found".to_string())
    }

    /// Searches clients by name, surname or email
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        params: SearchParams<ClientSortField>,
    ) -> Result<Page<client::Model>, ServiceError> {
        let snapshot = client::Entity::find()
            .order_by_asc(client::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(search::search(snapshot, &params, &self.limits))
    }

    /// Lists the orders opened for a client
    #[instrument(skip(self))]
    pub async fn list_orders(&self, client_id: i64) -> Result<Vec<order::Model>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let client = require(&txn, client_id).await?;
        let orders = client
            .find_related(order::Entity)
            .order_by_asc(order::Column::Id)
            .all(&txn)
            .await?;
        txn.commit().await?;
        non_empty(orders, || format!("Client {} has no orders", client_id))
    }

    /// Applies the supplied fields that differ from the stored client
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        client_id: i64,
        input: UpdateClientInput,
    ) -> Result<client::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = require(&txn, client_id).await?;

        if input.is_empty() {
            return Ok(current);
        }

        let mut active = current.clone().into_active_model();
        let mut changed = false;
        changed |= stage(input.name, &current.name, |v| active.name = Set(v));
        changed |= stage(input.surname, &current.surname, |v| active.surname = Set(v));
        if let Some(email) = input.email.as_deref() {
            if current.email.as_deref() != Some(email) {
                ensure_email_free(&txn, email, Some(client_id)).await?;
            }
        }
        changed |= stage(input.email.map(Some), &current.email, |v| active.email = Set(v));
        changed |= stage(input.contact.map(Some), &current.contact, |v| {
            active.contact = Set(v)
        });
        changed |= stage(input.address.map(Some), &current.address, |v| {
            active.address = Set(v)
        });

        if !changed {
            debug!(client_id, "update carried no changes");
            return Ok(current);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| {
                ServiceError::from_write(e, format!("Email of client {} is taken", client_id))
            })?;
        txn.commit().await?;
        info!(client_id, "client updated");
        Ok(updated)
    }

    /// Deletes a client that has no orders
    #[instrument(skip(self))]
    pub async fn delete(&self, client_id: i64) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let client = require(&txn, client_id).await?;

        let orders = client.find_related(order::Entity).count(&txn).await?;
        if orders > 0 {
            warn!(client_id, orders, "client still has orders");
            return Err(ServiceError::Conflict(format!(
                "Client {} has {} order(s) and cannot be deleted",
                client_id, orders
            )));
        }

        client.delete(&txn).await?;
        txn.commit().await?;
        info!(client_id, "client deleted");
        Ok(())
    }
}
