// PostgreSQLスキーマカタログ
//
// pg_catalog を照会して件数情報・DDL・権限を取得し、
// 同じ接続上でDDLとGRANTを実行します。

use crate::adapters::schema_catalog::SchemaCatalog;
use crate::adapters::sql_generator::postgres::PostgresSqlGenerator;
use crate::adapters::sql_generator::{
    ColumnDefinition, ConstraintDefinition, IdentityKind, SqlGenerator, TableDefinition,
};
use crate::core::catalog::{
    ComparisonRow, GrantRecord, ObjectCardinality, ObjectKind, RoutineKind,
};
use crate::core::error::{DatabaseError, StatementFailure};
use crate::core::run_parameters::SchemaName;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, Connection, Decode, Row, Type};
use tracing::debug;

/// DDL抽出関数が完全修飾名を出力するようにするセッション設定
const SESSION_STATEMENTS: &[&str] = &[
    "SET search_path TO pg_catalog",
    "SET check_function_bodies TO off",
];

const TABLE_CARDINALITY_SQL: &str = r#"
SELECT c.relname::text AS table_name,
       COUNT(a.attnum)::bigint AS column_count
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_attribute a
       ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
WHERE n.nspname = $1
  AND c.relkind IN ('r', 'p')
  AND NOT c.relispartition
GROUP BY c.relname
ORDER BY c.relname
"#;

const INDEX_CARDINALITY_SQL: &str = r#"
SELECT t.relname::text AS table_name,
       i.relname::text AS index_name,
       ix.indnatts::bigint AS column_count
FROM pg_index ix
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_namespace n ON n.oid = i.relnamespace
WHERE n.nspname = $1
  AND t.relkind IN ('r', 'p')
  AND NOT t.relispartition
ORDER BY t.relname, i.relname
"#;

const ROUTINE_CARDINALITY_SQL: &str = r#"
SELECT p.proname::text AS routine_name,
       CASE p.prokind WHEN 'p' THEN 'PROCEDURE' ELSE 'FUNCTION' END AS routine_type,
       pg_get_function_identity_arguments(p.oid)::text AS signature,
       COALESCE(array_length(string_to_array(p.prosrc, E'\n'), 1), 0)::bigint AS line_count
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE n.nspname = $1
  AND p.prokind IN ('f', 'p')
  AND NOT EXISTS (
      SELECT 1 FROM pg_depend d
      WHERE d.classid = 'pg_proc'::regclass AND d.objid = p.oid AND d.deptype = 'e'
  )
ORDER BY p.proname, signature
"#;

const TABLE_COLUMNS_SQL: &str = r#"
SELECT a.attname::text AS column_name,
       format_type(a.atttypid, a.atttypmod)::text AS data_type,
       a.attnotnull AS not_null,
       pg_get_expr(d.adbin, d.adrelid)::text AS default_expression,
       a.attidentity::text AS identity,
       a.attgenerated::text AS generated,
       EXISTS (
           SELECT 1 FROM pg_depend dep
           JOIN pg_class s ON s.oid = dep.objid
           WHERE dep.classid = 'pg_class'::regclass
             AND dep.refclassid = 'pg_class'::regclass
             AND dep.refobjid = c.oid
             AND dep.refobjsubid = a.attnum
             AND dep.deptype = 'a'
             AND s.relkind = 'S'
       ) AS owns_sequence,
       pg_get_partkeydef(c.oid)::text AS partition_key
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
WHERE n.nspname = $1
  AND c.relname = $2
  AND c.relkind IN ('r', 'p')
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum
"#;

const TABLE_CONSTRAINTS_SQL: &str = r#"
SELECT con.conname::text AS constraint_name,
       pg_get_constraintdef(con.oid)::text AS definition
FROM pg_constraint con
JOIN pg_class c ON c.oid = con.conrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1
  AND c.relname = $2
  AND con.contype IN ('p', 'u', 'c')
ORDER BY CASE con.contype WHEN 'p' THEN 0 WHEN 'u' THEN 1 ELSE 2 END, con.conname
"#;

const INDEX_DDL_SQL: &str = r#"
SELECT pg_get_indexdef(i.oid)::text
FROM pg_class i
JOIN pg_namespace n ON n.oid = i.relnamespace
WHERE n.nspname = $1
  AND i.relname = $2
  AND i.relkind IN ('i', 'I')
"#;

const ROUTINE_DDL_SQL: &str = r#"
SELECT pg_get_functiondef(p.oid)::text
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE n.nspname = $1
  AND p.proname = $2
  AND pg_get_function_identity_arguments(p.oid) = $3
"#;

/// 同期対象のテーブル（パーティション親を含み、子は除く）に付与された権限のみを対象とする
const OBJECT_GRANTS_SQL: &str = r#"
SELECT n.nspname::text AS schema_name,
       c.relname::text AS object_name,
       CASE WHEN acl.grantee = 0 THEN 'PUBLIC' ELSE pg_get_userbyid(acl.grantee)::text END AS grantee,
       acl.privilege_type::text AS privilege,
       acl.is_grantable AS grantable
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
CROSS JOIN LATERAL aclexplode(c.relacl) acl
WHERE n.nspname = $1
  AND c.relkind IN ('r', 'p')
  AND NOT c.relispartition
  AND acl.grantee <> c.relowner
ORDER BY c.relname, grantee, privilege
"#;

/// 列が所有するシーケンスを既定値に持つ場合の、対応するserial型
const SERIAL_TYPES: &[(&str, &str)] = &[
    ("smallint", "smallserial"),
    ("integer", "serial"),
    ("bigint", "bigserial"),
];

/// PostgreSQLのSQLSTATE: undefined_table
const UNDEFINED_TABLE: &str = "42P01";
/// PostgreSQLのSQLSTATE: undefined_object
const UNDEFINED_OBJECT: &str = "42704";

/// PostgreSQLスキーマカタログ
///
/// 1本の接続を保持し、全ステージをこの接続上で実行します。
pub struct PostgresCatalog {
    conn: AnyConnection,
    generator: PostgresSqlGenerator,
}

impl PostgresCatalog {
    /// 接続済みのコネクションからカタログを作成
    pub fn new(conn: AnyConnection) -> Self {
        Self {
            conn,
            generator: PostgresSqlGenerator::new(),
        }
    }

    async fn fetch_table_definition(
        &mut self,
        owner: &SchemaName,
        table: &str,
    ) -> Result<TableDefinition, StatementFailure> {
        let rows = sqlx::query(TABLE_COLUMNS_SQL)
            .bind(owner.as_str())
            .bind(table)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| statement_failure(&e))?;

        if rows.is_empty() {
            return Err(StatementFailure::new(
                UNDEFINED_TABLE,
                format!("table {}.{} was not found in the catalog", owner, table),
            ));
        }

        let partition_key: Option<String> = decode_column(&rows[0], 7)?;

        let columns = rows
            .iter()
            .map(|row| -> Result<ColumnDefinition, StatementFailure> {
                let identity: Option<String> = decode_column(row, 4)?;
                let generated: Option<String> = decode_column(row, 5)?;
                let default_expression: Option<String> = decode_column(row, 3)?;
                let owns_sequence: bool = decode_column(row, 6)?;
                let is_generated = generated.as_deref() == Some("s");

                let column = ColumnDefinition {
                    name: decode_column(row, 0)?,
                    data_type: decode_column(row, 1)?,
                    nullable: !decode_column::<bool>(row, 2)?,
                    default_expression: if is_generated {
                        None
                    } else {
                        default_expression.clone()
                    },
                    identity: match identity.as_deref() {
                        Some("a") => Some(IdentityKind::Always),
                        Some("d") => Some(IdentityKind::ByDefault),
                        _ => None,
                    },
                    generated_expression: if is_generated {
                        default_expression
                    } else {
                        None
                    },
                };

                Ok(if owns_sequence {
                    as_serial_column(column)
                } else {
                    column
                })
            })
            .collect::<Result<Vec<_>, StatementFailure>>()?;

        let constraints = sqlx::query(TABLE_CONSTRAINTS_SQL)
            .bind(owner.as_str())
            .bind(table)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| statement_failure(&e))?
            .iter()
            .map(|row| -> Result<ConstraintDefinition, StatementFailure> {
                Ok(ConstraintDefinition {
                    name: decode_column(row, 0)?,
                    definition: decode_column(row, 1)?,
                })
            })
            .collect::<Result<Vec<_>, StatementFailure>>()?;

        Ok(TableDefinition {
            name: table.to_string(),
            columns,
            constraints,
            partition_key,
        })
    }

    async fn fetch_single_definition(
        &mut self,
        sql: &str,
        binds: &[&str],
        missing: impl FnOnce() -> StatementFailure,
    ) -> Result<String, StatementFailure> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }

        let row = query
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| statement_failure(&e))?;

        match row {
            Some(row) => {
                let ddl: Option<String> = decode_column(&row, 0)?;
                ddl.ok_or_else(missing)
            }
            None => Err(missing()),
        }
    }

    async fn fetch_grants(
        &mut self,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<GrantRecord>, DatabaseError> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }

        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| query_error("権限情報の取得に失敗しました", sql, &e))?;

        rows.iter()
            .map(|row| -> Result<GrantRecord, DatabaseError> {
                Ok(GrantRecord {
                    schema: decode_row(row, 0, sql)?,
                    object: decode_row(row, 1, sql)?,
                    grantee: decode_row(row, 2, sql)?,
                    privilege: decode_row(row, 3, sql)?,
                    grantable: decode_row(row, 4, sql)?,
                })
            })
            .collect()
    }

    async fn fetch_rows(
        &mut self,
        sql: &str,
        schema: &SchemaName,
        context: &str,
    ) -> Result<Vec<AnyRow>, DatabaseError> {
        debug!(schema = %schema, "{}", context);
        sqlx::query(sql)
            .bind(schema.as_str())
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| query_error(context, sql, &e))
    }
}

#[async_trait]
impl SchemaCatalog for PostgresCatalog {
    fn session_statements(&self) -> Vec<String> {
        SESSION_STATEMENTS.iter().map(|s| s.to_string()).collect()
    }

    async fn table_cardinalities(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<ObjectCardinality>, DatabaseError> {
        let sql = TABLE_CARDINALITY_SQL;
        let rows = self
            .fetch_rows(sql, schema, "テーブルのカラム数を取得しています")
            .await?;

        rows.iter()
            .map(|row| -> Result<ObjectCardinality, DatabaseError> {
                Ok(ObjectCardinality::table(
                    decode_row::<String>(row, 0, sql)?,
                    decode_row::<i64>(row, 1, sql)?,
                ))
            })
            .collect()
    }

    async fn index_cardinalities(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<ObjectCardinality>, DatabaseError> {
        let sql = INDEX_CARDINALITY_SQL;
        let rows = self
            .fetch_rows(sql, schema, "インデックスのカラム数を取得しています")
            .await?;

        rows.iter()
            .map(|row| -> Result<ObjectCardinality, DatabaseError> {
                Ok(ObjectCardinality::index(
                    decode_row::<String>(row, 0, sql)?,
                    decode_row::<String>(row, 1, sql)?,
                    decode_row::<i64>(row, 2, sql)?,
                ))
            })
            .collect()
    }

    async fn routine_cardinalities(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<ObjectCardinality>, DatabaseError> {
        let sql = ROUTINE_CARDINALITY_SQL;
        let rows = self
            .fetch_rows(sql, schema, "ルーチンの行数を取得しています")
            .await?;

        rows.iter()
            .map(|row| -> Result<ObjectCardinality, DatabaseError> {
                let kind = match decode_row::<String>(row, 1, sql)?.as_str() {
                    "PROCEDURE" => RoutineKind::Procedure,
                    _ => RoutineKind::Function,
                };
                Ok(ObjectCardinality::routine(
                    kind,
                    decode_row::<String>(row, 0, sql)?,
                    decode_row::<String>(row, 2, sql)?,
                    decode_row::<i64>(row, 3, sql)?,
                ))
            })
            .collect()
    }

    async fn extract_ddl(
        &mut self,
        row: &ComparisonRow,
        owner: &SchemaName,
        remap_to: &SchemaName,
    ) -> Result<String, StatementFailure> {
        match row.kind {
            ObjectKind::Table => {
                // テーブルはカタログ情報から作成先スキーマで直接組み立てる
                let definition = self.fetch_table_definition(owner, &row.name).await?;
                Ok(self
                    .generator
                    .generate_create_table(remap_to.as_str(), &definition))
            }
            ObjectKind::Index => {
                let name = row.name.clone();
                let schema = owner.to_string();
                self.fetch_single_definition(INDEX_DDL_SQL, &[owner.as_str(), &row.name], || {
                    StatementFailure::new(
                        UNDEFINED_OBJECT,
                        format!("index {}.{} was not found in the catalog", schema, name),
                    )
                })
                .await
            }
            ObjectKind::Routine(kind) => {
                let display = row.display_name();
                let schema = owner.to_string();
                let signature = row.signature.clone().unwrap_or_default();
                self.fetch_single_definition(
                    ROUTINE_DDL_SQL,
                    &[owner.as_str(), &row.name, &signature],
                    || {
                        StatementFailure::new(
                            UNDEFINED_OBJECT,
                            format!("{} {}.{} was not found in the catalog", kind, schema, display),
                        )
                    },
                )
                .await
            }
        }
    }

    async fn object_grants(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<GrantRecord>, DatabaseError> {
        debug!(schema = %schema, "オブジェクト権限を取得しています");
        self.fetch_grants(OBJECT_GRANTS_SQL, &[schema.as_str()]).await
    }

    async fn principal_grants(
        &mut self,
        principal: &SchemaName,
        excluded: &[&SchemaName],
    ) -> Result<Vec<GrantRecord>, DatabaseError> {
        debug!(principal = %principal, "保持権限を取得しています");
        let sql = principal_grants_sql(excluded.len());
        let mut binds = vec![principal.as_str()];
        binds.extend(excluded.iter().map(|s| s.as_str()));
        self.fetch_grants(&sql, &binds).await
    }

    async fn execute(&mut self, statement: &str) -> Result<(), StatementFailure> {
        sqlx::query(statement)
            .persistent(false)
            .execute(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(|e| statement_failure(&e))
    }

    async fn close(self) -> Result<(), DatabaseError> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection {
                message: "データベース接続のクローズに失敗しました".to_string(),
                cause: e.to_string(),
            })
    }
}

/// 所有シーケンスを既定値に持つ列をserial型の列に置き換える
///
/// 作成先では同名のシーケンスが作成先スキーマに作られるため、
/// ソースのシーケンスを参照しなくなります。
fn as_serial_column(column: ColumnDefinition) -> ColumnDefinition {
    let uses_nextval = column
        .default_expression
        .as_deref()
        .is_some_and(|default| default.starts_with("nextval("));
    if !uses_nextval || column.identity.is_some() {
        return column;
    }

    match SERIAL_TYPES
        .iter()
        .find(|(data_type, _)| *data_type == column.data_type)
    {
        Some((_, serial)) => ColumnDefinition {
            data_type: serial.to_string(),
            default_expression: None,
            ..column
        },
        None => column,
    }
}

/// 主体が保持する権限を取得するSQLを組み立てる
///
/// `$1` が主体名、`$2` 以降が除外スキーマです。
fn principal_grants_sql(excluded: usize) -> String {
    let exclusion = if excluded == 0 {
        String::new()
    } else {
        let placeholders: Vec<String> = (0..excluded).map(|i| format!("${}", i + 2)).collect();
        format!("\n  AND n.nspname NOT IN ({})", placeholders.join(", "))
    };

    format!(
        r#"
SELECT n.nspname::text AS schema_name,
       c.relname::text AS object_name,
       pg_get_userbyid(acl.grantee)::text AS grantee,
       acl.privilege_type::text AS privilege,
       acl.is_grantable AS grantable
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
CROSS JOIN LATERAL aclexplode(c.relacl) acl
WHERE acl.grantee = (SELECT r.oid FROM pg_roles r WHERE r.rolname = $1)
  AND c.relkind IN ('r', 'p', 'v', 'm')
  AND acl.grantee <> c.relowner
  AND n.nspname NOT IN ('pg_catalog', 'information_schema'){}
ORDER BY n.nspname, c.relname, privilege
"#,
        exclusion
    )
}

/// sqlxのエラーをステートメント失敗に変換
///
/// データベースが返したエラーはそのコードとメッセージを、
/// それ以外（通信断など）は "CLIENT" コードで記録します。
fn statement_failure(error: &sqlx::Error) -> StatementFailure {
    match error.as_database_error() {
        Some(db_error) => StatementFailure::new(
            db_error
                .code()
                .map(|code| code.into_owned())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            db_error.message(),
        ),
        None => StatementFailure::new("CLIENT", error.to_string()),
    }
}

fn query_error(context: &str, sql: &str, error: &sqlx::Error) -> DatabaseError {
    DatabaseError::Query {
        message: format!("{}: {}", context, error),
        sql: Some(sql.trim().to_string()),
    }
}

fn decode_row<T>(row: &AnyRow, index: usize, sql: &str) -> Result<T, DatabaseError>
where
    T: for<'r> Decode<'r, Any> + Type<Any>,
{
    row.try_get::<T, _>(index)
        .map_err(|e| query_error("カタログ行の読み取りに失敗しました", sql, &e))
}

fn decode_column<T>(row: &AnyRow, index: usize) -> Result<T, StatementFailure>
where
    T: for<'r> Decode<'r, Any> + Type<Any>,
{
    row.try_get::<T, _>(index).map_err(|e| statement_failure(&e))
}
