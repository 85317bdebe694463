//! Backend resource catalogue and the account/ticket workflow endpoints.
//!
//! Record payloads are opaque JSON; only the paths and the envelopes the
//! admin workflows send are modelled here.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Value, json};

use crate::net::api::{ApiClient, ApiError};
use crate::net::types::RequestOptions;

/// Conventional REST collections, each at `/api/<segment>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Equipment,
    EquipmentTypes,
    Materials,
    MaterialTypes,
    Suppliers,
    Warehouses,
    Units,
    Incidents,
    MaintenancePlans,
    MaintenanceTickets,
    Inventory,
    Permissions,
}

impl Resource {
    pub const ALL: [Self; 12] = [
        Self::Equipment,
        Self::EquipmentTypes,
        Self::Materials,
        Self::MaterialTypes,
        Self::Suppliers,
        Self::Warehouses,
        Self::Units,
        Self::Incidents,
        Self::MaintenancePlans,
        Self::MaintenanceTickets,
        Self::Inventory,
        Self::Permissions,
    ];

    /// Backend path segment (server-defined names).
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Equipment => "ThietBi",
            Self::EquipmentTypes => "LoaiThietBi",
            Self::Materials => "VatTu",
            Self::MaterialTypes => "LoaiVatTu",
            Self::Suppliers => "NhaCungCap",
            Self::Warehouses => "Kho",
            Self::Units => "DonViTinh",
            Self::Incidents => "LichSuSuCo",
            Self::MaintenancePlans => "Kehoachbaotri",
            Self::MaintenanceTickets => "PhieuBaoTri",
            Self::Inventory => "TonKho",
            Self::Permissions => "PhanQuyen",
        }
    }

    /// Kebab-case name used on the command line.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Equipment => "equipment",
            Self::EquipmentTypes => "equipment-types",
            Self::Materials => "materials",
            Self::MaterialTypes => "material-types",
            Self::Suppliers => "suppliers",
            Self::Warehouses => "warehouses",
            Self::Units => "units",
            Self::Incidents => "incidents",
            Self::MaintenancePlans => "maintenance-plans",
            Self::MaintenanceTickets => "maintenance-tickets",
            Self::Inventory => "inventory",
            Self::Permissions => "permissions",
        }
    }

    #[must_use]
    pub fn collection_path(self) -> String {
        format!("/api/{}", self.segment())
    }

    #[must_use]
    pub fn item_path(self, id: &str) -> String {
        format!("/api/{}/{id}", self.segment())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource '{0}'")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    /// Accepts the slug or the backend segment, case-insensitively.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.slug().eq_ignore_ascii_case(raw) || r.segment().eq_ignore_ascii_case(raw))
            .ok_or_else(|| UnknownResource(raw.to_owned()))
    }
}

// =============================================================================
// CRUD
// =============================================================================

pub async fn list(api: &ApiClient, resource: Resource) -> Result<Value, ApiError> {
    api.get(&resource.collection_path(), RequestOptions::default()).await
}

pub async fn create(api: &ApiClient, resource: Resource, record: &Value) -> Result<Value, ApiError> {
    api.post(&resource.collection_path(), record, RequestOptions::default()).await
}

pub async fn update(api: &ApiClient, resource: Resource, id: &str, record: &Value) -> Result<Value, ApiError> {
    api.put(&resource.item_path(id), record, RequestOptions::default()).await
}

pub async fn delete(api: &ApiClient, resource: Resource, id: &str) -> Result<Value, ApiError> {
    api.delete(&resource.item_path(id), RequestOptions::default()).await
}

// =============================================================================
// ACCOUNTS
// =============================================================================

pub const PENDING_ACCOUNTS_PATH: &str = "/api/Auth/pending";
pub const ACCOUNTS_PATH: &str = "/api/Auth/users";
pub const PROFILE_PATH: &str = "/api/Auth/profile";

/// Permission code pre-filled when approving an account that has none.
pub const DEFAULT_APPROVAL_PERMISSION_CODE: i64 = 3;

/// Body of `PUT /api/Auth/{id}/approve`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Approval {
    #[serde(rename = "maQuyen")]
    pub permission_code: i64,
    #[serde(rename = "maNV")]
    pub employee_number: i64,
    #[serde(rename = "hoTen")]
    pub full_name: String,
    pub email: String,
    #[serde(rename = "soDienThoai")]
    pub phone: String,
    #[serde(rename = "phongBan")]
    pub department: String,
    #[serde(rename = "chucVu")]
    pub position: String,
    #[serde(rename = "trangThai")]
    pub active_status: bool,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

impl Approval {
    /// Pre-fill from a pending-account record the way the dashboard does.
    #[must_use]
    pub fn from_pending(pending: &Value) -> Self {
        let text = |key: &str| pending.get(key).and_then(Value::as_str).unwrap_or_default().to_owned();
        Self {
            permission_code: pending
                .get("maQuyen")
                .and_then(Value::as_i64)
                .filter(|code| *code != 0)
                .unwrap_or(DEFAULT_APPROVAL_PERMISSION_CODE),
            employee_number: pending.get("maNV").and_then(Value::as_i64).unwrap_or(0),
            full_name: text("tenDangNhap"),
            email: text("email"),
            phone: text("soDienThoai"),
            department: text("phongBan"),
            position: text("chucVu"),
            active_status: true,
            is_active: true,
        }
    }
}

pub async fn pending_accounts(api: &ApiClient) -> Result<Value, ApiError> {
    api.get(PENDING_ACCOUNTS_PATH, RequestOptions::default()).await
}

pub async fn list_accounts(api: &ApiClient) -> Result<Value, ApiError> {
    api.get(ACCOUNTS_PATH, RequestOptions::default()).await
}

pub async fn approve_account(api: &ApiClient, account_id: &str, approval: &Approval) -> Result<Value, ApiError> {
    api.put(&format!("/api/Auth/{account_id}/approve"), approval, RequestOptions::default())
        .await
}

/// Update the logged-in user's own profile.
pub async fn update_profile(api: &ApiClient, profile: &Value) -> Result<Value, ApiError> {
    api.put(PROFILE_PATH, profile, RequestOptions::default()).await
}

fn account_path(account_id: &str) -> String {
    format!("/api/Auth/{account_id}")
}

/// Fetch one account by user number (`maND`).
pub async fn get_account(api: &ApiClient, account_id: &str) -> Result<Value, ApiError> {
    api.get(&account_path(account_id), RequestOptions::default()).await
}

pub async fn delete_account(api: &ApiClient, account_id: &str) -> Result<Value, ApiError> {
    api.delete(&account_path(account_id), RequestOptions::default()).await
}

/// Turn down a pending registration. The backend has no separate reject
/// route; the pending account is deleted.
pub async fn reject_account(api: &ApiClient, account_id: &str) -> Result<Value, ApiError> {
    delete_account(api, account_id).await
}

/// Body of `POST /api/Auth/admin/create`: an account created already approved.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    #[serde(rename = "tenDangNhap")]
    pub username: String,
    #[serde(rename = "matKhau")]
    pub password: String,
    #[serde(rename = "maNV")]
    pub employee_number: i64,
    #[serde(rename = "maQuyen")]
    pub permission_code: i64,
    pub email: String,
    #[serde(rename = "soDienThoai")]
    pub phone: String,
    #[serde(rename = "phongBan")]
    pub department: String,
    #[serde(rename = "chucVu")]
    pub position: String,
    #[serde(rename = "trangThai")]
    pub active_status: bool,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

impl NewAccount {
    /// Active account with no employee link, permission code 0 and blank contact details.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            employee_number: 0,
            permission_code: 0,
            email: String::new(),
            phone: String::new(),
            department: String::new(),
            position: String::new(),
            active_status: true,
            is_active: true,
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("employee_number", &self.employee_number)
            .field("permission_code", &self.permission_code)
            .finish_non_exhaustive()
    }
}

pub const CREATE_ACCOUNT_PATH: &str = "/api/Auth/admin/create";

pub async fn create_account(api: &ApiClient, account: &NewAccount) -> Result<Value, ApiError> {
    api.post(CREATE_ACCOUNT_PATH, account, RequestOptions::default()).await
}

/// Body of `PUT /api/Auth/nhanvien/{id}`; unset fields are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EmployeeUpdate {
    #[serde(rename = "hoTen", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "soDienThoai", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "phongBan", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(rename = "chucVu", skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Update an employee's details. `employee_id` is the `maNV`, or the `maND`
/// for accounts without an employee record.
pub async fn update_employee(api: &ApiClient, employee_id: &str, update: &EmployeeUpdate) -> Result<Value, ApiError> {
    api.put(&format!("/api/Auth/nhanvien/{employee_id}"), update, RequestOptions::default())
        .await
}

// =============================================================================
// MAINTENANCE TICKETS
// =============================================================================

/// Numeric ids go out as numbers, anything else as a string.
fn id_value(id: &str) -> Value {
    id.parse::<i64>().map_or_else(|_| Value::String(id.to_owned()), Value::from)
}

pub async fn approve_ticket(api: &ApiClient, ticket_id: &str, note: &str) -> Result<Value, ApiError> {
    let path = format!("{}/duyet", Resource::MaintenanceTickets.item_path(ticket_id));
    let body = json!({ "maPhieu": id_value(ticket_id), "ghiChu": note });
    api.post(&path, &body, RequestOptions::default()).await
}

pub async fn reject_ticket(api: &ApiClient, ticket_id: &str, reason: &str) -> Result<Value, ApiError> {
    let path = format!("{}/tuchoi", Resource::MaintenanceTickets.item_path(ticket_id));
    let body = json!({ "maPhieu": id_value(ticket_id), "lyDoTuChoi": reason });
    api.post(&path, &body, RequestOptions::default()).await
}

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;
