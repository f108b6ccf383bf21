use sqlx::{postgres::PgArguments, postgres::PgRow, query::QueryAs, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub enum SqlxBinds {
    String(String),
    Uuid(Uuid),
}

pub fn binds_query_as<'a, T: for<'r> sqlx::FromRow<'r, PgRow>>(
    stmt: &'a str,
    binds: Vec<SqlxBinds>,
) -> QueryAs<'a, Postgres, T, PgArguments> {
    let mut q: QueryAs<'_, Postgres, T, PgArguments> = sqlx::query_as(stmt);
    for bind in binds.iter() {
        q = match bind {
            SqlxBinds::String(val) => q.bind(val.clone()),
            SqlxBinds::Uuid(val) => q.bind(*val),
        };
    }
    q
}

pub fn query_builder(
    select: Option<String>,
    table_name: &str,
    wheres: &[String],
    order_by: Vec<String>,
    limit: Option<u32>,
) -> String {
    // Select
    let mut stmt = "SELECT ".to_string();
    if let Some(val) = select {
        stmt.push_str(&val);
    } else {
        stmt.push('*');
    }

    // From
    stmt.push_str(format!(" FROM {}", table_name).as_str());

    // Where
    if !wheres.is_empty() {
        stmt.push_str(" WHERE");
        for (idx, item) in wheres.iter().enumerate() {
            stmt.push_str(format!(" {}", item).as_str());
            if idx < wheres.len() - 1 {
                stmt.push_str(" AND");
            }
        }
    }

    // order by
    if !order_by.is_empty() {
        stmt.push_str(" ORDER BY");
        for (idx, item) in order_by.iter().enumerate() {
            stmt.push_str(format!(" {}", item).as_str());
            if idx < order_by.len() - 1 {
                stmt.push(',');
            }
        }
    }

    // Limit
    if let Some(limit) = limit {
        stmt.push_str(format!(" LIMIT {}", limit).as_str());
    }
    stmt
}

/// Escape `%`, `_` and `\` so the value matches literally inside a LIKE pattern.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let stmt = query_builder(None, "public.user_profile", &[], vec![], None);
        assert_eq!(stmt, "SELECT * FROM public.user_profile");

        let stmt = query_builder(
            Some("id, name".to_string()),
            "public.user_profile",
            &["name ILIKE $1".to_string(), "manager_id = $2".to_string()],
            vec!["id ASC".to_string(), "name DESC".to_string()],
            Some(1),
        );
        assert_eq!(
            stmt,
            "SELECT id, name FROM public.user_profile WHERE name ILIKE $1 AND manager_id = $2 ORDER BY id ASC, name DESC LIMIT 1"
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("jo"), "jo");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
