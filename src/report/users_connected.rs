//! "Users connected" report: everyone who logged in during the last hour.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How far back a login still counts as connected.
pub const SESSION_WINDOW_SECS: u32 = 3600;

const USER_PAGE: &str = "index.php?sec=gusuarios&amp;sec2=godmode/users/configure_user&amp;id=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbDialect {
    Mysql,
    Postgresql,
    Oracle,
}

/// One `tsesion` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id_usuario: String,
    pub ip_origen: String,
    pub fecha: String,
    #[serde(default)]
    pub accion: String,
}

pub fn connected_users_sql(dialect: DbDialect) -> String {
    const SELECT: &str = "SELECT id_usuario, ip_origen, fecha, accion FROM tsesion";
    let w = SESSION_WINDOW_SECS;
    match dialect {
        DbDialect::Mysql => format!(
            "{} WHERE descripcion = 'Logged in' AND utimestamp > (UNIX_TIMESTAMP(NOW()) - {}) \
             GROUP BY id_usuario, ip_origen, accion",
            SELECT, w
        ),
        DbDialect::Postgresql => format!(
            "{} WHERE descripcion = 'Logged in' AND utimestamp > (ceil(date_part('epoch', CURRENT_TIMESTAMP)) - {}) \
             GROUP BY id_usuario, ip_origen, accion",
            SELECT, w
        ),
        DbDialect::Oracle => format!(
            "{} WHERE to_char(descripcion) = 'Logged in' AND utimestamp > \
             (ceil((sysdate - to_date('19700101000000','YYYYMMDDHH24MISS')) * (86400)) - {}) \
             GROUP BY id_usuario, ip_origen, fecha, accion",
            SELECT, w
        ),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Query-string form of a user id for the user page link.
fn query_value(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// HTML for the report page. Viewers without user-management rights get
/// nothing.
pub fn render_report(rows: &[SessionRow], can_manage_users: bool) -> String {
    if !can_manage_users {
        debug!("users connected report hidden without user management rights");
        return String::new();
    }

    let mut html = String::from("<h2>Users connected</h2>\n");
    if rows.is_empty() {
        html.push_str("<div class='nf'>No other users connected</div>\n");
        return html;
    }

    html.push_str("<table cellpadding=\"4\" cellspacing=\"4\" width=\"600\" class=\"databox\">\n");
    html.push_str("<thead><tr><th>User</th><th>IP</th><th>Date</th></tr></thead>\n<tbody>\n");
    for (i, row) in rows.iter().enumerate() {
        let class = if i % 2 == 0 { "rowPair" } else { "rowOdd" };
        html.push_str(&format!(
            "<tr class=\"{}\"><td><a href=\"{}{}\">{}</a></td><td>{}</td><td>{}</td></tr>\n",
            class,
            USER_PAGE,
            query_value(&row.id_usuario),
            escape(&row.id_usuario),
            escape(&row.ip_origen),
            escape(&row.fecha)
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}
