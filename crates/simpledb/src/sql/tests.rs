use super::*;
use crate::article::Article;
use crate::client::{GenericClient, RowStream};
use crate::error::{DbError, DbResult};
use crate::param::Param;
use crate::value::Value;
use std::sync::Mutex;
use tokio_postgres::types::ToSql;

/// Records every statement and answers with no rows.
#[derive(Default)]
struct RecordingClient {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    affected: u64,
}

impl RecordingClient {
    fn affecting(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        let params = params.iter().map(|p| format!("{p:?}")).collect();
        self.calls.lock().unwrap().push((sql.to_string(), params));
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenericClient for RecordingClient {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        self.record(sql, params);
        Ok(RowStream::empty())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.record(sql, params);
        Ok(self.affected)
    }
}

async fn try_connect() -> Option<tokio_postgres::Client> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

// ==================== Accumulation ====================

#[test]
fn append_separates_fragments_with_a_space() {
    let mut q = Sql::new();
    q.append("SELECT *", ())
        .append("FROM article", ())
        .append("WHERE id = ?", 1)
        .append("AND title = ?", "title1");

    assert_eq!(
        q.to_sql(),
        "SELECT * FROM article WHERE id = $1 AND title = $2 "
    );
    assert_eq!(
        q.raw_sql(),
        "SELECT * FROM article WHERE id = ? AND title = ? "
    );
    assert_eq!(
        q.params(),
        &[Param::Int(1), Param::Text("title1".to_string())]
    );
}

#[test]
fn append_keeps_parameter_order_across_calls() {
    let mut q = sql("UPDATE article", ());
    q.append("SET title = ?", "new")
        .append("WHERE id IN (?, ?, ?, ?)", [0, 1, 2, 3]);

    assert_eq!(
        q.to_sql(),
        "UPDATE article SET title = $1 WHERE id IN ($2, $3, $4, $5) "
    );
    assert_eq!(q.placeholder_count(), 5);
    assert_eq!(q.params()[0], Param::Text("new".to_string()));
    assert_eq!(q.params()[4], Param::Int(3));
}

#[test]
fn quoted_question_mark_is_not_a_placeholder() {
    let mut q = Sql::new();
    q.append("SELECT 'why?' AS q WHERE 1 = ?", 1);
    assert_eq!(q.to_sql(), "SELECT 'why?' AS q WHERE 1 = $1 ");
    assert_eq!(q.placeholder_count(), 1);
}

#[test]
fn append_in_expands_one_marker_per_value() {
    let mut q = sql("DELETE FROM article", ());
    q.append_in("WHERE id IN (?)", [0, 1, 3]).unwrap();

    assert_eq!(q.to_sql(), "DELETE FROM article WHERE id IN ($1, $2, $3)");
    assert_eq!(
        q.params(),
        &[Param::Int(0), Param::Int(1), Param::Int(3)]
    );
}

#[test]
fn append_in_replaces_everything_between_first_and_last_marker() {
    let mut q = Sql::new();
    q.append_in("id IN (?, ?)", vec![7_i64, 8, 9]).unwrap();
    assert_eq!(q.raw_sql(), "id IN (?, ?, ?)");
    assert_eq!(q.placeholder_count(), 3);
}

#[test]
fn append_in_numbering_continues_after_earlier_params() {
    let mut q = sql("SELECT * FROM article WHERE title = ?", "t");
    q.append_in("AND id IN (?)", [1, 2]).unwrap();
    q.append(" ORDER BY id", ());

    assert_eq!(
        q.to_sql(),
        "SELECT * FROM article WHERE title = $1 AND id IN ($2, $3) ORDER BY id "
    );
}

#[test]
fn append_in_without_values_matches_nothing() {
    let mut q = Sql::new();
    q.append_in("WHERE id IN (?)", Vec::<i32>::new()).unwrap();
    assert_eq!(q.to_sql(), "WHERE id IN (NULL)");
    assert!(q.params().is_empty());
}

#[test]
fn append_in_leaves_quoted_question_marks_alone() {
    let mut q = Sql::new();
    q.append_in("WHERE title IN ('why?', ?)", ["a", "b"]).unwrap();
    assert_eq!(q.to_sql(), "WHERE title IN ('why?', $1, $2)");
    assert_eq!(q.placeholder_count(), 2);

    let mut q = Sql::new();
    q.append_in("WHERE id IN (?) -- ids?", [1]).unwrap();
    assert_eq!(q.to_sql(), "WHERE id IN ($1) -- ids?");
}

#[test]
fn append_in_with_only_quoted_markers_is_rejected() {
    let mut q = Sql::new();
    let err = q.append_in("WHERE title = 'why?'", ["a"]).unwrap_err();
    assert!(err.is_validation());
    assert!(q.params().is_empty());
}

#[test]
fn append_in_without_marker_is_rejected() {
    let mut q = Sql::new();
    let err = q.append_in("WHERE id IN (1, 2)", [1, 2]).unwrap_err();
    assert!(err.is_validation());
    assert!(q.params().is_empty());
    assert_eq!(q.to_sql(), "");
}

#[test]
fn mixed_parameter_tuple() {
    let mut q = Sql::new();
    q.append(
        "INSERT INTO article (title, body, \"isBlind\") VALUES (?, ?, ?)",
        ("title7", String::from("body7"), true),
    );
    assert_eq!(
        q.params(),
        &[
            Param::Text("title7".to_string()),
            Param::Text("body7".to_string()),
            Param::Bool(true)
        ]
    );
}

// ==================== Execution (no database) ====================

#[tokio::test]
async fn placeholder_mismatch_fails_before_any_round_trip() {
    let client = RecordingClient::default();

    let mut q = Sql::new();
    q.append("DELETE FROM article WHERE id IN (?, ?)", [1]);
    let err = q.delete(&client).await.unwrap_err();

    assert!(matches!(err, DbError::Validation(_)));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn too_many_params_also_fail() {
    let client = RecordingClient::default();

    let mut q = Sql::new();
    q.append("SELECT id FROM article", 1);
    assert!(q.select_longs(&client).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn empty_builder_is_rejected() {
    let client = RecordingClient::default();
    assert!(Sql::new().update(&client).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn update_and_delete_return_affected_count() {
    let client = RecordingClient::affecting(3);

    let mut q = Sql::new();
    q.append("UPDATE article", ())
        .append("SET title = ?", "new")
        .append("WHERE id IN (?, ?, ?, ?)", [0, 1, 2, 3]);
    assert_eq!(q.update(&client).await.unwrap(), 3);

    let mut q = Sql::new();
    q.append("DELETE FROM article WHERE id = ?", 1_i64);
    assert_eq!(q.delete(&client).await.unwrap(), 3);

    let calls = client.calls();
    assert_eq!(
        calls[0].0,
        "UPDATE article SET title = $1 WHERE id IN ($2, $3, $4, $5) "
    );
    assert_eq!(calls[0].1, vec!["Text(\"new\")", "Int(0)", "Int(1)", "Int(2)", "Int(3)"]);
    assert_eq!(calls[1].1, vec!["Long(1)"]);
}

#[tokio::test]
async fn insert_asks_for_the_generated_id() {
    let client = RecordingClient::default();

    let mut q = Sql::new();
    q.append("INSERT INTO article (title) VALUES (?)", "t");
    let key = q.insert(&client).await.unwrap();

    // No row came back: nothing was inserted.
    assert_eq!(key, NO_KEY);
    assert_eq!(
        client.calls()[0].0,
        "INSERT INTO article (title) VALUES ($1) RETURNING \"id\" "
    );
}

#[tokio::test]
async fn insert_keeps_an_explicit_returning_clause() {
    let client = RecordingClient::default();

    let mut q = Sql::new();
    q.append("INSERT INTO tag (name) VALUES (?) RETURNING tag_id", "rust");
    q.insert(&client).await.unwrap();

    let mut q = Sql::new();
    q.append("INSERT INTO tag (name) VALUES (?)", "rust");
    q.insert_returning(&client, "tag_id").await.unwrap();

    let calls = client.calls();
    assert_eq!(calls[0].0, "INSERT INTO tag (name) VALUES ($1) RETURNING tag_id ");
    assert_eq!(
        calls[1].0,
        "INSERT INTO tag (name) VALUES ($1) RETURNING \"tag_id\" "
    );
}

#[tokio::test]
async fn insert_places_returning_ahead_of_trailing_comments() {
    let client = RecordingClient::default();

    sql("INSERT INTO article (title) VALUES (?) -- new row", "t")
        .insert(&client)
        .await
        .unwrap();
    sql("INSERT INTO article (title) VALUES (?) /* no returning here */", "t")
        .insert(&client)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(
        calls[0].0,
        "INSERT INTO article (title) VALUES ($1) RETURNING \"id\" -- new row "
    );
    assert_eq!(
        calls[1].0,
        "INSERT INTO article (title) VALUES ($1) RETURNING \"id\" /* no returning here */ "
    );
}

#[tokio::test]
async fn insert_places_returning_ahead_of_a_semicolon() {
    let client = RecordingClient::default();

    sql("INSERT INTO article (title) VALUES (?);", "t")
        .insert(&client)
        .await
        .unwrap();

    assert_eq!(
        client.calls()[0].0,
        "INSERT INTO article (title) VALUES ($1) RETURNING \"id\"; "
    );
}

#[tokio::test]
async fn insert_of_two_statements_fails_before_any_round_trip() {
    let client = RecordingClient::default();

    let err = sql("INSERT INTO article (title) VALUES (?); DELETE FROM article", "t")
        .insert(&client)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn query_drains_the_cursor() {
    let client = RecordingClient::default();
    let q = sql("SELECT * FROM article WHERE id = ?", 7_i64);

    let rows = client.query(&q.to_sql(), &q.params_ref()).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(
        client.calls(),
        vec![("SELECT * FROM article WHERE id = $1 ".to_string(), vec!["Long(7)".to_string()])]
    );
}

#[tokio::test]
async fn empty_results_are_not_errors() {
    let client = RecordingClient::default();
    let select = || sql("SELECT * FROM article WHERE id = ?", 0);

    assert!(select().select_rows(&client).await.unwrap().is_empty());
    assert!(select().select_rows_as::<Article>(&client).await.unwrap().is_empty());
    assert!(select().select_row(&client).await.unwrap().is_empty());
    assert!(select().select_row_as::<Article>(&client).await.unwrap().is_none());
    assert!(select().select_first_row(&client).await.unwrap().is_empty());
    assert_eq!(select().select_long(&client).await.unwrap(), NO_KEY);
    assert_eq!(select().select_long_column(&client, "id").await.unwrap(), NO_KEY);
    assert!(select().select_longs(&client).await.unwrap().is_empty());
    assert_eq!(select().select_string(&client).await.unwrap(), None);
    assert_eq!(select().select_boolean(&client).await.unwrap(), None);
    assert_eq!(select().select_datetime(&client).await.unwrap(), None);
}

#[tokio::test]
async fn every_select_binds_its_parameters() {
    let client = RecordingClient::default();

    sql("SELECT * FROM article WHERE id = ?", 2)
        .select_rows(&client)
        .await
        .unwrap();
    sql("SELECT title FROM article WHERE id = ?", 2)
        .select_string(&client)
        .await
        .unwrap();
    sql("SELECT COUNT(*) FROM article WHERE \"isBlind\" = ?", true)
        .select_long(&client)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].1, vec!["Int(2)"]);
    assert_eq!(calls[1].1, vec!["Int(2)"]);
    assert_eq!(calls[2].1, vec!["Bool(true)"]);
}

// ==================== Execution (database) ====================

#[tokio::test]
async fn select_row_keeps_the_last_row() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let q = || sql("SELECT n FROM (VALUES (1), (2), (3)) AS t(n) WHERE n >= ? ORDER BY n", 1);

    let last = q().select_row(&client).await.unwrap();
    assert_eq!(last.get("n"), Some(&Value::Int(3)));

    let first = q().select_first_row(&client).await.unwrap();
    assert_eq!(first.get("n"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn scalar_selects_unwrap_single_values() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let n = sql("SELECT COUNT(*) FROM (VALUES (1), (2)) AS t(n) WHERE n > ?", 0)
        .select_long(&client)
        .await
        .unwrap();
    assert_eq!(n, 2);

    let b = sql("SELECT 1 = 1", ()).select_boolean(&client).await.unwrap();
    assert_eq!(b, Some(true));

    let s = sql("SELECT 'hello' AS title", ())
        .select_string(&client)
        .await
        .unwrap();
    assert_eq!(s.as_deref(), Some("hello"));

    let now = sql("SELECT NOW()", ()).select_datetime(&client).await.unwrap();
    assert!(now.is_some());

    let ns = sql("SELECT n FROM (VALUES (3), (1), (2)) AS t(n)", ())
        .select_longs(&client)
        .await
        .unwrap();
    assert_eq!(ns, vec![3, 1, 2]);

    let ns = sql("SELECT n FROM (VALUES (1::int8), (NULL), (3)) AS t(n)", ())
        .select_longs(&client)
        .await
        .unwrap();
    assert_eq!(ns, vec![1, NO_KEY, 3]);
}

#[tokio::test]
async fn scalar_type_mismatch_is_a_decode_error() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let err = sql("SELECT 'x' AS title", ())
        .select_long(&client)
        .await
        .unwrap_err();
    assert!(err.is_decode());

    let err = sql("SELECT 1 AS n", ())
        .select_string(&client)
        .await
        .unwrap_err();
    assert!(err.is_decode());
}
