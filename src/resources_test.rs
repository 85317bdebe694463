use super::*;
use crate::test_support::{MockBackend, memory_client};

#[test]
fn paths_use_backend_segments() {
    assert_eq!(Resource::Equipment.collection_path(), "/api/ThietBi");
    assert_eq!(Resource::Inventory.item_path("17"), "/api/TonKho/17");
    assert_eq!(Resource::MaintenancePlans.collection_path(), "/api/Kehoachbaotri");
}

#[test]
fn from_str_accepts_slug_and_segment() {
    assert_eq!("warehouses".parse::<Resource>().unwrap(), Resource::Warehouses);
    assert_eq!("Kho".parse::<Resource>().unwrap(), Resource::Warehouses);
    assert_eq!("MATERIAL-TYPES".parse::<Resource>().unwrap(), Resource::MaterialTypes);
    assert_eq!("boats".parse::<Resource>().unwrap_err(), UnknownResource("boats".into()));
}

#[test]
fn slugs_and_segments_are_unique() {
    let mut slugs: Vec<_> = Resource::ALL.iter().map(|r| r.slug()).collect();
    let mut segments: Vec<_> = Resource::ALL.iter().map(|r| r.segment()).collect();
    slugs.sort_unstable();
    slugs.dedup();
    segments.sort_unstable();
    segments.dedup();
    assert_eq!(slugs.len(), Resource::ALL.len());
    assert_eq!(segments.len(), Resource::ALL.len());
}

#[test]
fn display_is_slug() {
    assert_eq!(Resource::MaintenanceTickets.to_string(), "maintenance-tickets");
}

#[test]
fn approval_from_pending_defaults() {
    let pending = serde_json::json!({"maND": 4, "tenDangNhap": "new1", "email": "new1@bilco.local", "maQuyen": null});
    let approval = Approval::from_pending(&pending);
    assert_eq!(approval.permission_code, DEFAULT_APPROVAL_PERMISSION_CODE);
    assert_eq!(approval.employee_number, 0);
    assert_eq!(approval.full_name, "new1");
    assert_eq!(approval.email, "new1@bilco.local");
    assert!(approval.active_status && approval.is_active);

    let json = serde_json::to_value(&approval).unwrap();
    assert_eq!(json["maQuyen"], 3);
    assert_eq!(json["trangThai"], true);
}

#[test]
fn approval_keeps_existing_permission_code() {
    let pending = serde_json::json!({"maQuyen": 2, "maNV": 15});
    let approval = Approval::from_pending(&pending);
    assert_eq!(approval.permission_code, 2);
    assert_eq!(approval.employee_number, 15);
}

#[test]
fn id_value_numeric_or_text() {
    assert_eq!(id_value("12"), serde_json::json!(12));
    assert_eq!(id_value("PB-12"), serde_json::json!("PB-12"));
}

#[tokio::test]
async fn crud_calls_hit_expected_routes() {
    let mock = MockBackend::new();
    mock.respond("GET", "/api/Kho", 200, "[]")
        .respond("POST", "/api/Kho", 201, r#"{"maKho": 1}"#)
        .respond("PUT", "/api/Kho/1", 204, "")
        .respond("DELETE", "/api/Kho/1", 200, "");
    let base = mock.serve().await;
    let (_, api) = memory_client(&base);

    assert_eq!(list(&api, Resource::Warehouses).await.unwrap(), serde_json::json!([]));
    let record = serde_json::json!({"tenKho": "Kho A"});
    assert_eq!(create(&api, Resource::Warehouses, &record).await.unwrap()["maKho"], 1);
    assert_eq!(update(&api, Resource::Warehouses, "1", &record).await.unwrap(), serde_json::json!({}));
    assert_eq!(delete(&api, Resource::Warehouses, "1").await.unwrap(), serde_json::json!({}));

    let methods: Vec<_> = mock.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["GET", "POST", "PUT", "DELETE"]);
}

#[tokio::test]
async fn ticket_rejection_sends_reason() {
    let mock = MockBackend::new();
    mock.respond("POST", "/api/PhieuBaoTri/8/tuchoi", 200, "{}");
    let base = mock.serve().await;
    let (_, api) = memory_client(&base);

    reject_ticket(&api, "8", "thieu vat tu").await.unwrap();

    let body: Value = serde_json::from_str(&mock.last_request().body).unwrap();
    assert_eq!(body, serde_json::json!({"maPhieu": 8, "lyDoTuChoi": "thieu vat tu"}));
}

#[tokio::test]
async fn approve_account_puts_to_account_route() {
    let mock = MockBackend::new();
    mock.respond("PUT", "/api/Auth/4/approve", 204, "");
    let base = mock.serve().await;
    let (_, api) = memory_client(&base);

    let approval = Approval::from_pending(&serde_json::json!({"tenDangNhap": "new1"}));
    approve_account(&api, "4", &approval).await.unwrap();

    let req = mock.last_request();
    assert_eq!(req.path, "/api/Auth/4/approve");
    let body: Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body["hoTen"], "new1");
}

#[tokio::test]
async fn get_and_reject_account_use_account_route() {
    let mock = MockBackend::new();
    mock.respond("GET", "/api/Auth/4", 200, r#"{"maND": 4, "tenDangNhap": "new1"}"#)
        .respond("DELETE", "/api/Auth/4", 204, "");
    let base = mock.serve().await;
    let (_, api) = memory_client(&base);

    assert_eq!(get_account(&api, "4").await.unwrap()["tenDangNhap"], "new1");
    assert_eq!(reject_account(&api, "4").await.unwrap(), serde_json::json!({}));

    let calls: Vec<_> = mock.requests().into_iter().map(|r| (r.method, r.path)).collect();
    assert_eq!(
        calls,
        vec![("GET".to_owned(), "/api/Auth/4".to_owned()), ("DELETE".to_owned(), "/api/Auth/4".to_owned())]
    );
}

#[tokio::test]
async fn create_account_posts_active_account() {
    let mock = MockBackend::new();
    mock.respond("POST", CREATE_ACCOUNT_PATH, 200, r#"{"maND": 9}"#);
    let base = mock.serve().await;
    let (_, api) = memory_client(&base);

    let mut account = NewAccount::new("kythuat2", "pw");
    account.permission_code = 2;
    account.email = "kt2@bilco.vn".into();
    assert_eq!(create_account(&api, &account).await.unwrap()["maND"], 9);

    let body: Value = serde_json::from_str(&mock.last_request().body).unwrap();
    assert_eq!(body["tenDangNhap"], "kythuat2");
    assert_eq!(body["matKhau"], "pw");
    assert_eq!(body["maNV"], 0);
    assert_eq!(body["maQuyen"], 2);
    assert_eq!(body["email"], "kt2@bilco.vn");
    assert_eq!(body["trangThai"], true);
    assert_eq!(body["isActive"], true);
}

#[test]
fn new_account_debug_hides_password() {
    let rendered = format!("{:?}", NewAccount::new("kythuat2", "hunter2"));
    assert!(rendered.contains("kythuat2"));
    assert!(!rendered.contains("hunter2"));
}

#[tokio::test]
async fn update_employee_sends_only_set_fields() {
    let mock = MockBackend::new();
    mock.respond("PUT", "/api/Auth/nhanvien/15", 204, "");
    let base = mock.serve().await;
    let (_, api) = memory_client(&base);

    let update = EmployeeUpdate { full_name: Some("Tran Van B".into()), position: Some("Ky thuat".into()), ..Default::default() };
    assert_eq!(update_employee(&api, "15", &update).await.unwrap(), serde_json::json!({}));

    let req = mock.last_request();
    assert_eq!(req.path, "/api/Auth/nhanvien/15");
    let body: Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body, serde_json::json!({"hoTen": "Tran Van B", "chucVu": "Ky thuat"}));
}
