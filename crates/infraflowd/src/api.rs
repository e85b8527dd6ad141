//! Request and response bodies, and rendering of outcomes as HTTP responses

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::response::{IntoResponse, Response};
use infraflow_cloud::{Outcome, ResourceGroup, VirtualMachine, VirtualNetwork};
use serde::{Deserialize, Serialize};

// ============ Requests ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVirtualMachine {
    #[serde(default)]
    pub virtual_machine_name: String,
    #[serde(default)]
    pub virtual_network_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVirtualNetwork {
    #[serde(default)]
    pub name: String,
}

/// Field checks run before any workflow starts
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("The {field} field is required."));
    }
    Ok(())
}

impl Validate for CreateResourceGroup {
    fn validate(&self) -> Result<(), String> {
        required("name", &self.name)?;
        required("location", &self.location)
    }
}

impl Validate for CreateVirtualMachine {
    fn validate(&self) -> Result<(), String> {
        required("virtualMachineName", &self.virtual_machine_name)?;
        required("virtualNetworkName", &self.virtual_network_name)
    }
}

impl Validate for CreateVirtualNetwork {
    fn validate(&self) -> Result<(), String> {
        required("name", &self.name)
    }
}

/// A request refused before any workflow ran
pub struct Rejection(ApiResult<()>);

impl Rejection {
    fn new(detail: impl Into<String>) -> Self {
        Self(ApiResult(Outcome::invalid(detail)))
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Unwrap and validate a JSON body
pub fn accept<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Rejection> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return Err(Rejection::new(rejection.body_text())),
    };
    request.validate().map_err(Rejection::new)?;
    Ok(request)
}

// ============ Responses ============

/// A response body that may name the resource it describes
pub trait View: Serialize {
    /// Value for the `Location` header of a 201
    fn location(&self) -> Option<&str> {
        None
    }
}

impl View for () {}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResourceGroupView {
    pub id: String,
    pub name: String,
    pub location: String,
    pub state: Option<String>,
}

impl From<ResourceGroup> for ResourceGroupView {
    fn from(group: ResourceGroup) -> Self {
        Self {
            id: group.id.to_string(),
            name: group.name,
            location: group.location,
            state: group.provisioning_state,
        }
    }
}

impl View for ResourceGroupView {
    fn location(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VirtualNetworkView {
    pub id: String,
    pub location: Option<String>,
}

impl From<VirtualNetwork> for VirtualNetworkView {
    fn from(vnet: VirtualNetwork) -> Self {
        Self {
            id: vnet.id.to_string(),
            location: vnet.location,
        }
    }
}

impl View for VirtualNetworkView {
    fn location(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CreatedVirtualMachineView {
    pub id: String,
}

impl From<VirtualMachine> for CreatedVirtualMachineView {
    fn from(vm: VirtualMachine) -> Self {
        Self {
            id: vm.id.to_string(),
        }
    }
}

impl View for CreatedVirtualMachineView {
    fn location(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VirtualMachineView {
    pub id: String,
    pub location: Option<String>,
}

impl From<VirtualMachine> for VirtualMachineView {
    fn from(vm: VirtualMachine) -> Self {
        Self {
            id: vm.id.to_string(),
            location: vm.location,
        }
    }
}

impl View for VirtualMachineView {}

/// RFC 7807 problem details
#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, detail: Option<String>) -> Self {
        Self {
            kind: "about:blank",
            title: status.canonical_reason().unwrap_or("Error"),
            status: status.as_u16(),
            detail,
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_REQUEST);
        (
            status,
            [(CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

/// An [`Outcome`] rendered as an HTTP response
pub struct ApiResult<T>(pub Outcome<T>);

impl<T: View> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
        match self.0 {
            Outcome::Created(view) => {
                let location = view.location().map(str::to_string);
                let mut response = (status, Json(view)).into_response();
                if let Some(value) = location.and_then(|l| l.parse().ok()) {
                    response.headers_mut().insert(LOCATION, value);
                }
                response
            }
            Outcome::Found(view) => (status, Json(view)).into_response(),
            Outcome::Deleted => status.into_response(),
            Outcome::NotFound | Outcome::Unauthorized => Problem::new(status, None).into_response(),
            Outcome::Conflict(detail) | Outcome::BadRequest(detail) => {
                Problem::new(status, Some(detail)).into_response()
            }
        }
    }
}
