//! Route handlers
//!
//! Each handler runs one workflow and renders its outcome. Validation
//! failures answer 400 before the control plane is contacted.

use crate::AppState;
use crate::api::{
    self, ApiResult, CreateResourceGroup, CreateVirtualMachine, CreateVirtualNetwork,
    CreatedVirtualMachineView, Rejection, ResourceGroupView, VirtualMachineView, VirtualNetworkView,
};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use infraflow_cloud::Outcome;

type Reply<T> = Result<ApiResult<T>, Rejection>;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn create_resource_group(
    State(state): State<AppState>,
    payload: Result<Json<CreateResourceGroup>, JsonRejection>,
) -> Reply<ResourceGroupView> {
    let request = api::accept(payload)?;
    let (cancel, _guard) = state.request_token();

    let result = state
        .provisioner
        .create_resource_group(&request.name, &request.location, &cancel)
        .await
        .map(Some);
    Ok(ApiResult(
        Outcome::from_create(result).map(ResourceGroupView::from),
    ))
}

pub async fn get_resource_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ResourceGroupView> {
    let (cancel, _guard) = state.request_token();
    let result = state.provisioner.get_resource_group(&name, &cancel).await;
    ApiResult(Outcome::from_lookup(result).map(ResourceGroupView::from))
}

pub async fn delete_resource_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    let (cancel, _guard) = state.request_token();
    let result = state.provisioner.delete_resource_group(&name, &cancel).await;
    ApiResult(Outcome::from_delete(result))
}

pub async fn create_virtual_machine(
    State(state): State<AppState>,
    Path(resource_group): Path<String>,
    payload: Result<Json<CreateVirtualMachine>, JsonRejection>,
) -> Reply<CreatedVirtualMachineView> {
    let request = api::accept(payload)?;
    let (cancel, _guard) = state.request_token();

    let result = state
        .provisioner
        .create_virtual_machine(
            &resource_group,
            &request.virtual_network_name,
            &request.virtual_machine_name,
            &cancel,
        )
        .await;
    Ok(ApiResult(
        Outcome::from_create(result).map(CreatedVirtualMachineView::from),
    ))
}

pub async fn get_virtual_machine(
    State(state): State<AppState>,
    Path((resource_group, name)): Path<(String, String)>,
) -> ApiResult<VirtualMachineView> {
    let (cancel, _guard) = state.request_token();
    let result = state
        .provisioner
        .get_virtual_machine(&resource_group, &name, &cancel)
        .await;
    ApiResult(Outcome::from_lookup(result).map(VirtualMachineView::from))
}

pub async fn create_virtual_network(
    State(state): State<AppState>,
    Path(resource_group): Path<String>,
    payload: Result<Json<CreateVirtualNetwork>, JsonRejection>,
) -> Reply<VirtualNetworkView> {
    let request = api::accept(payload)?;
    let (cancel, _guard) = state.request_token();

    let result = state
        .provisioner
        .create_virtual_network(&resource_group, &request.name, &cancel)
        .await;
    Ok(ApiResult(
        Outcome::from_create(result).map(VirtualNetworkView::from),
    ))
}

pub async fn get_virtual_network(
    State(state): State<AppState>,
    Path((resource_group, name)): Path<(String, String)>,
) -> ApiResult<VirtualNetworkView> {
    let (cancel, _guard) = state.request_token();
    let result = state
        .provisioner
        .get_virtual_network(&resource_group, &name, &cancel)
        .await;
    ApiResult(Outcome::from_lookup(result).map(VirtualNetworkView::from))
}
