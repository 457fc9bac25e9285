use super::*;

#[test]
fn http_status_mapping() {
    assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
    assert_eq!(AppError::auth("auth", "no").http_status(), 401);
    assert_eq!(AppError::forbidden("forbidden", "admins only").http_status(), 403);
    assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
    assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
    assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
}

#[test]
fn directory_errors_map_to_app_errors() {
    let e: AppError = DirectoryError::UserNotFound("alice".into()).into();
    assert_eq!(e.http_status(), 404);
    let e: AppError = DirectoryError::NamespaceAlreadyExists("ns".into()).into();
    assert_eq!(e.http_status(), 409);
    let e: AppError = DirectoryError::Validation(ValidationError::PasswordLength).into();
    assert_eq!(e.http_status(), 400);
    assert!(e.message().contains("at least 8"));
    let e: AppError = DirectoryError::WrongPassword.into();
    assert_eq!(e.http_status(), 401);
}

#[test]
fn internal_errors_hide_detail() {
    let e: AppError = DirectoryError::Store(StoreError::Closed).into();
    assert_eq!(e.http_status(), 500);
    assert_eq!(e.message(), "internal server error");
}

#[test]
fn classification_helpers() {
    assert!(DirectoryError::UserNotFound("a".into()).is_not_found());
    assert!(DirectoryError::NamespaceNotFound("a".into()).is_not_found());
    assert!(!DirectoryError::WrongPassword.is_not_found());
    assert!(DirectoryError::Store(StoreError::Closed).is_internal());
    assert!(!DirectoryError::WrongPassword.is_internal());
}
