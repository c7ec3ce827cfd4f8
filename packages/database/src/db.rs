//! Database connection utilities.

use switchy_database::Database;
use switchy_database_connection::Credentials;

use crate::DbError;

/// Opens a connection to the `PostgreSQL` database at `url`.
///
/// The returned handle is opened once at startup and shared by every
/// query issued against that store.
///
/// # Errors
///
/// Returns [`DbError::Connection`] if the URL cannot be parsed or the
/// connection fails.
pub async fn connect(url: &str) -> Result<Box<dyn Database>, DbError> {
    // Strip query parameters (e.g., ?sslmode=require) that the Credentials
    // parser doesn't understand. TLS is handled by the native-tls connector.
    let url_base = url.split('?').next().unwrap_or(url);

    let creds = Credentials::from_url(url_base).map_err(|e| DbError::Connection {
        message: format!("Invalid database URL: {e}"),
    })?;

    let db = switchy_database_connection::init_postgres_raw_native_tls(creds)
        .await
        .map_err(|e| DbError::Connection {
            message: e.to_string(),
        })?;

    Ok(db)
}
