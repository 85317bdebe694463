use super::*;

fn session(role: Role) -> Session {
    Session {
        user_id: "1".into(),
        username: "u".into(),
        role,
        employee_number: None,
        full_name: None,
        email: None,
        phone: None,
        department: None,
        position: None,
    }
}

#[test]
fn normalize_strips_query_and_trailing_slash() {
    assert_eq!(normalize("/admin/units/?tab=2"), "/admin/units");
    assert_eq!(normalize("/plays#top"), "/plays");
    assert_eq!(normalize(""), "/");
    assert_eq!(normalize("///"), "/");
}

#[test]
fn access_levels() {
    assert_eq!(access_for("/company"), Some(Access::Public));
    assert_eq!(access_for("/profile"), Some(Access::Authenticated));
    assert_eq!(access_for("/admin/api-stats"), Some(Access::Admin));
    assert_eq!(access_for("/nowhere"), None);
}

#[test]
fn public_routes_render_for_everyone() {
    let user = session(Role::User);
    assert_eq!(resolve("/login", None), RouteDecision::Render);
    assert_eq!(resolve("/register", Some(&user)), RouteDecision::Render);
    assert_eq!(resolve("/company", None), RouteDecision::Render);
}

#[test]
fn anonymous_is_sent_to_login() {
    assert_eq!(resolve("/", None), RouteDecision::Redirect(LOGIN_PATH));
    assert_eq!(resolve("/reports", None), RouteDecision::Redirect(LOGIN_PATH));
    assert_eq!(resolve("/admin/equipment", None), RouteDecision::Redirect(LOGIN_PATH));
    assert_eq!(resolve("/unknown", None), RouteDecision::Redirect(LOGIN_PATH));
}

#[test]
fn user_is_kept_out_of_admin() {
    let user = session(Role::User);
    assert_eq!(resolve("/admin", Some(&user)), RouteDecision::Redirect(HOME_PATH));
    assert_eq!(resolve("/admin/permissions", Some(&user)), RouteDecision::Redirect(HOME_PATH));
    assert_eq!(resolve("/maintenance", Some(&user)), RouteDecision::Render);
    assert_eq!(resolve("/", Some(&user)), RouteDecision::Render);
}

#[test]
fn admin_home_redirects_to_admin_dashboard() {
    let admin = session(Role::Admin);
    assert_eq!(resolve("/", Some(&admin)), RouteDecision::Redirect(ADMIN_HOME_PATH));
    assert_eq!(resolve("/admin/inventory", Some(&admin)), RouteDecision::Render);
    assert_eq!(resolve("/plays", Some(&admin)), RouteDecision::Render);
}

#[test]
fn unknown_path_when_authenticated_goes_home() {
    let user = session(Role::User);
    assert_eq!(resolve("/does-not-exist", Some(&user)), RouteDecision::Redirect(HOME_PATH));
}

#[test]
fn landing_follows_redirect_chain() {
    let admin = session(Role::Admin);
    let user = session(Role::User);
    assert_eq!(landing("/does-not-exist", Some(&admin)), ADMIN_HOME_PATH);
    assert_eq!(landing("/", Some(&user)), HOME_PATH);
    assert_eq!(landing("/admin/units", Some(&user)), HOME_PATH);
    assert_eq!(landing("/admin", None), LOGIN_PATH);
    assert_eq!(landing("/reports", Some(&user)), "/reports");
}
