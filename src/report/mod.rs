mod users_connected;

pub use users_connected::{connected_users_sql, render_report, DbDialect, SessionRow};
