use crate::common::error::AppError;

// ---
// Helper: traduz violações de restrição do Postgres em erros de domínio
// ---
/// Converte `sqlx::Error` em `AppError`, tratando chave duplicada e chave
/// estrangeira inexistente. Os demais erros viram `DatabaseError`.
pub(crate) fn map_constraint_error(
    e: sqlx::Error,
    on_unique: impl FnOnce(Option<&str>) -> AppError,
    on_foreign_key: impl FnOnce(Option<&str>) -> AppError,
) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return on_unique(db_err.constraint());
        }
        if db_err.is_foreign_key_violation() {
            return on_foreign_key(db_err.constraint());
        }
    }
    e.into()
}

/// Campos de texto vindos de formulários: string vazia conta como ausente.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
