//! `postgres/init-databases.sh` rendering.
//!
//! The official image runs every script in `/docker-entrypoint-initdb.d`
//! once, when the data directory is first initialized. Passwords are read
//! from the container environment, which the assembler fills from `.env`.

use std::collections::HashSet;
use std::fmt::Write as _;

use stackforge_compose::DatabaseRequirement;

const HEADER: &str = "#!/bin/bash
# Creates one database and role per service on the first PostgreSQL start.
set -euo pipefail

psql -v ON_ERROR_STOP=1 --username \"$POSTGRES_USER\" --dbname \"$POSTGRES_DB\" <<EOSQL
";

/// Renders the init script, or `None` when no service needs a database.
#[must_use]
pub fn render_init_script(databases: &[DatabaseRequirement]) -> Option<String> {
    if databases.is_empty() {
        return None;
    }
    let mut script = String::from(HEADER);
    let mut users = HashSet::new();
    for db in databases {
        let _ = writeln!(script, "-- {} ({})", db.service_name, db.service_id);
        if users.insert(db.user.as_str()) {
            let _ = writeln!(
                script,
                "CREATE USER \"{}\" WITH PASSWORD '${{{}}}';",
                db.user, db.password_var
            );
        }
        let _ = writeln!(
            script,
            "CREATE DATABASE \"{}\" OWNER \"{}\";",
            db.database, db.user
        );
        let _ = writeln!(
            script,
            "GRANT ALL PRIVILEGES ON DATABASE \"{}\" TO \"{}\";",
            db.database, db.user
        );
    }
    script.push_str("EOSQL\n");
    tracing::debug!(databases = databases.len(), "rendered postgres init script");
    Some(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(service: &str, database: &str, user: &str, var: &str) -> DatabaseRequirement {
        DatabaseRequirement {
            service_id: service.into(),
            service_name: service.into(),
            database: database.into(),
            user: user.into(),
            password_var: var.into(),
        }
    }

    #[test]
    fn nothing_to_create_renders_nothing() {
        assert!(render_init_script(&[]).is_none());
    }

    #[test]
    fn each_database_gets_a_role_and_grant() {
        let script = render_init_script(&[
            requirement("n8n", "n8n", "n8n", "N8N_DB_PASSWORD"),
            requirement("outline", "outline", "outline", "OUTLINE_DB_PASSWORD"),
        ])
        .expect("script");
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("CREATE USER \"n8n\" WITH PASSWORD '${N8N_DB_PASSWORD}';\n"));
        assert!(script.contains("CREATE DATABASE \"n8n\" OWNER \"n8n\";\n"));
        assert!(script.contains("GRANT ALL PRIVILEGES ON DATABASE \"outline\" TO \"outline\";\n"));
        assert!(script.ends_with("EOSQL\n"));
    }

    #[test]
    fn shared_role_is_created_once() {
        let script = render_init_script(&[
            requirement("a", "a", "app", "APP_DB_PASSWORD"),
            requirement("b", "b", "app", "APP_DB_PASSWORD"),
        ])
        .expect("script");
        assert_eq!(script.matches("CREATE USER").count(), 1);
        assert_eq!(script.matches("CREATE DATABASE").count(), 2);
    }
}
