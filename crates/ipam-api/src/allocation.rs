//! Available-resource endpoints
//!
//! `GET` lists free units of a parent, `POST` allocates one unit per
//! submitted item.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use ipam_alloc_core::{Allocator, AsnPicker, IpPicker, PrefixSplitter, VlanPicker};
use ipam_shared_types::{ObjectId, ParentRef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::error::ApiError;
use crate::payload::{Batch, RequestBody};

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    /// Maximum number of units, `0` for all
    pub limit: Option<usize>,
}

pub struct AllocationAPI;

impl AllocationAPI {
    pub fn router() -> Router<Arc<AppContext>> {
        Router::new()
            .route(
                "/api/ipam/prefixes/:id/available-prefixes",
                get(list_available_prefixes).post(create_available_prefixes),
            )
            .route(
                "/api/ipam/prefixes/:id/available-ips",
                get(list_prefix_ips).post(create_prefix_ips),
            )
            .route(
                "/api/ipam/ip-ranges/:id/available-ips",
                get(list_range_ips).post(create_range_ips),
            )
            .route(
                "/api/ipam/asn-ranges/:id/available-asns",
                get(list_available_asns).post(create_available_asns),
            )
            .route(
                "/api/ipam/vlan-groups/:id/available-vlans",
                get(list_available_vlans).post(create_available_vlans),
            )
            .route("/health", get(health_check))
    }
}

async fn list<A>(
    context: &AppContext,
    parent: ParentRef,
    query: LimitQuery,
) -> Result<Json<Vec<A::Unit>>, ApiError>
where
    A: Allocator,
    A::Unit: Serialize,
{
    let units = context
        .service
        .list_available::<A>(parent, query.limit)
        .await?;
    Ok(Json(units))
}

async fn create<A>(context: &AppContext, parent: ParentRef, body: Value) -> Result<Response, ApiError>
where
    A: Allocator,
    A::Request: RequestBody,
    A::Record: Serialize,
{
    let batch = Batch::<A::Request>::from_value(body)?;
    let created = context.service.allocate::<A>(parent, batch.requests()).await?;
    Ok(batch.respond(created))
}

pub async fn list_available_prefixes(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ipam_shared_types::AvailablePrefix>>, ApiError> {
    list::<PrefixSplitter>(&context, ParentRef::prefix(id), query).await
}

pub async fn create_available_prefixes(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    create::<PrefixSplitter>(&context, ParentRef::prefix(id), body).await
}

pub async fn list_prefix_ips(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ipam_shared_types::AvailableIp>>, ApiError> {
    list::<IpPicker>(&context, ParentRef::prefix(id), query).await
}

pub async fn create_prefix_ips(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    create::<IpPicker>(&context, ParentRef::prefix(id), body).await
}

pub async fn list_range_ips(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ipam_shared_types::AvailableIp>>, ApiError> {
    list::<IpPicker>(&context, ParentRef::ip_range(id), query).await
}

pub async fn create_range_ips(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    create::<IpPicker>(&context, ParentRef::ip_range(id), body).await
}

pub async fn list_available_asns(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ipam_shared_types::AvailableAsn>>, ApiError> {
    list::<AsnPicker>(&context, ParentRef::asn_range(id), query).await
}

pub async fn create_available_asns(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    create::<AsnPicker>(&context, ParentRef::asn_range(id), body).await
}

pub async fn list_available_vlans(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ipam_shared_types::AvailableVlan>>, ApiError> {
    list::<VlanPicker>(&context, ParentRef::vlan_group(id), query).await
}

pub async fn create_available_vlans(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<ObjectId>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    create::<VlanPicker>(&context, ParentRef::vlan_group(id), body).await
}

/// Health check endpoint
pub async fn health_check(State(context): State<Arc<AppContext>>) -> Json<Value> {
    let now = Utc::now();
    Json(json!({
        "status": "ok",
        "timestamp": now.to_rfc3339(),
        "uptime_seconds": (now - context.started).num_seconds(),
    }))
}
