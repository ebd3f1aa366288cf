//! HTTP handlers for customers, due sells and due collections

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::customer::{
    CreateCustomerInput, CreateDueCollectionInput, CreateDueSellInput, Customer,
    CustomerAccount, CustomerFilter, CustomerService, DueCollection, DueSell, UpdateCustomerInput,
};
use crate::AppState;

/// List customers
pub async fn list_customers(State(state): State<AppState>) -> AppResult<Json<Vec<Customer>>> {
    let service = CustomerService::new(state.db);
    let customers = service.list_customers().await?;
    Ok(Json(customers))
}

/// Create a customer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    input.validate()?;
    let service = CustomerService::new(state.db);
    let customer = service.create_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// Get a customer with their balance
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerAccount>> {
    let service = CustomerService::new(state.db);
    let account = service.get_customer(customer_id).await?;
    Ok(Json(account))
}

/// Update a customer
pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<Json<Customer>> {
    input.validate()?;
    let service = CustomerService::new(state.db);
    let customer = service.update_customer(customer_id, input).await?;
    Ok(Json(customer))
}

/// Delete a customer
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CustomerService::new(state.db);
    service.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List due sells
pub async fn list_due_sells(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> AppResult<Json<Vec<DueSell>>> {
    let service = CustomerService::new(state.db);
    let due_sells = service.list_due_sells(filter).await?;
    Ok(Json(due_sells))
}

/// Record a due sell
pub async fn create_due_sell(
    State(state): State<AppState>,
    Json(input): Json<CreateDueSellInput>,
) -> AppResult<(StatusCode, Json<DueSell>)> {
    input.validate()?;
    let service = CustomerService::new(state.db);
    let due_sell = service.create_due_sell(input).await?;
    Ok((StatusCode::CREATED, Json(due_sell)))
}

/// List due collections
pub async fn list_due_collections(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> AppResult<Json<Vec<DueCollection>>> {
    let service = CustomerService::new(state.db);
    let collections = service.list_due_collections(filter).await?;
    Ok(Json(collections))
}

/// Record a due collection
pub async fn create_due_collection(
    State(state): State<AppState>,
    Json(input): Json<CreateDueCollectionInput>,
) -> AppResult<(StatusCode, Json<DueCollection>)> {
    input.validate()?;
    let service = CustomerService::new(state.db);
    let collection = service.create_due_collection(input).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}
