/// テスト用のメモリ上カタログ
///
/// `SchemaCatalog` を実装し、テーブル・インデックス・ルーチン・権限を
/// スキーマごとに保持します。実行されたDDL・GRANT文を解釈して状態を更新するため、
/// パイプラインを実データベースなしで駆動できます。
#[allow(dead_code)]
pub mod fake_catalog {
    use async_trait::async_trait;
    use regex::Regex;
    use schema_sync::adapters::schema_catalog::SchemaCatalog;
    use schema_sync::adapters::sql_quote::quote_identifier_if_needed_postgres;
    use schema_sync::core::catalog::{
        ComparisonRow, GrantRecord, ObjectCardinality, ObjectKind, RoutineKind,
    };
    use schema_sync::core::error::{DatabaseError, StatementFailure};
    use schema_sync::core::run_parameters::SchemaName;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex, MutexGuard};

    pub const SESSION_STATEMENTS: [&str; 2] = [
        "SET search_path TO pg_catalog",
        "SET check_function_bodies TO off",
    ];

    /// ルーチンの定義
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FakeRoutine {
        pub kind: RoutineKind,
        pub lines: i64,
    }

    /// カタログの状態
    #[derive(Debug, Default)]
    pub struct CatalogState {
        /// (schema, table) -> カラム名
        pub tables: BTreeMap<(String, String), Vec<String>>,
        /// (schema, index) -> (table, カラム名)
        pub indexes: BTreeMap<(String, String), (String, Vec<String>)>,
        /// (schema, name, signature) -> 定義
        pub routines: BTreeMap<(String, String, String), FakeRoutine>,
        pub grants: Vec<GrantRecord>,
        /// 実行されたステートメント（実行順）
        pub executed: Vec<String>,
        /// 部分一致したステートメントを失敗させる (pattern, SQLSTATE)
        pub failing_statements: Vec<(String, String)>,
        /// DDL抽出に失敗するオブジェクト名
        pub broken_ddl: Vec<String>,
        /// 件数照会に失敗するスキーマ
        pub broken_schema: Option<String>,
        pub closed: bool,
    }

    impl CatalogState {
        pub fn columns(&self, schema: &str, table: &str) -> Option<usize> {
            self.tables
                .get(&(schema.to_string(), table.to_string()))
                .map(Vec::len)
        }

        pub fn has_index(&self, schema: &str, index: &str) -> bool {
            self.indexes
                .contains_key(&(schema.to_string(), index.to_string()))
        }

        pub fn routine(&self, schema: &str, name: &str, signature: &str) -> Option<&FakeRoutine> {
            self.routines
                .get(&(schema.to_string(), name.to_string(), signature.to_string()))
        }

        /// セッション設定を除いた実行ステートメント
        pub fn executed_changes(&self) -> Vec<String> {
            self.executed
                .iter()
                .filter(|sql| !sql.starts_with("SET "))
                .cloned()
                .collect()
        }
    }

    /// メモリ上のカタログ
    ///
    /// 状態は `Arc<Mutex<_>>` で共有し、パイプラインに所有権を渡した後も
    /// `handle()` から検査できます。
    #[derive(Debug, Clone, Default)]
    pub struct FakeCatalog {
        state: Arc<Mutex<CatalogState>>,
    }

    impl FakeCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn handle(&self) -> Arc<Mutex<CatalogState>> {
            Arc::clone(&self.state)
        }

        pub fn state(&self) -> MutexGuard<'_, CatalogState> {
            self.state.lock().unwrap()
        }

        pub fn with_table(self, schema: &str, table: &str, columns: usize) -> Self {
            let names = (1..=columns).map(|i| format!("c{}", i)).collect();
            self.state()
                .tables
                .insert((schema.to_string(), table.to_string()), names);
            self
        }

        pub fn with_index(self, schema: &str, table: &str, index: &str, columns: usize) -> Self {
            let names = (1..=columns).map(|i| format!("c{}", i)).collect();
            self.state().indexes.insert(
                (schema.to_string(), index.to_string()),
                (table.to_string(), names),
            );
            self
        }

        pub fn with_routine(
            self,
            schema: &str,
            kind: RoutineKind,
            name: &str,
            signature: &str,
            lines: i64,
        ) -> Self {
            self.state().routines.insert(
                (schema.to_string(), name.to_string(), signature.to_string()),
                FakeRoutine { kind, lines },
            );
            self
        }

        pub fn with_grant(
            self,
            schema: &str,
            object: &str,
            grantee: &str,
            privilege: &str,
            grantable: bool,
        ) -> Self {
            self.state().grants.push(GrantRecord {
                schema: schema.to_string(),
                object: object.to_string(),
                grantee: grantee.to_string(),
                privilege: privilege.to_string(),
                grantable,
            });
            self
        }

        pub fn failing_on(self, pattern: &str, code: &str) -> Self {
            self.state()
                .failing_statements
                .push((pattern.to_string(), code.to_string()));
            self
        }

        pub fn with_broken_ddl(self, name: &str) -> Self {
            self.state().broken_ddl.push(name.to_string());
            self
        }

        pub fn with_broken_schema(self, schema: &str) -> Self {
            self.state().broken_schema = Some(schema.to_string());
            self
        }

        fn check_schema(&self, schema: &SchemaName) -> Result<(), DatabaseError> {
            match &self.state().broken_schema {
                Some(broken) if broken == schema.as_str() => Err(DatabaseError::Query {
                    message: format!("permission denied for schema {}", broken),
                    sql: None,
                }),
                _ => Ok(()),
            }
        }
    }

    /// 識別子を正規化（引用符なしは小文字に畳み込む）
    fn identifier(raw: &str) -> String {
        match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            Some(quoted) => quoted.replace("\"\"", "\""),
            None => raw.to_lowercase(),
        }
    }

    fn column_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|part| {
                part.split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
            .filter(|name| !name.is_empty())
            .collect()
    }

    const IDENT: &str = r#"("(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$]*)"#;

    fn pattern(template: &str) -> Regex {
        Regex::new(&template.replace("{ident}", IDENT)).unwrap()
    }

    impl CatalogState {
        /// ステートメントを解釈して状態に反映
        fn apply(&mut self, sql: &str) -> Result<(), StatementFailure> {
            if sql.starts_with("SET ") {
                return Ok(());
            }

            let create_table = pattern(r"(?s)^CREATE TABLE {ident}\.{ident} \((.*)\)$");
            let create_index =
                pattern(r"(?s)^CREATE (?:UNIQUE )?INDEX {ident} ON {ident}\.{ident} USING btree \((.*)\)$");
            let create_routine = pattern(
                r"(?s)^CREATE OR REPLACE (FUNCTION|PROCEDURE) {ident}\.{ident}\(([^)]*)\)",
            );
            let drop_table = pattern(r"^DROP TABLE {ident}\.{ident}$");
            let drop_index = pattern(r"^DROP INDEX {ident}\.{ident}$");
            let drop_routine = pattern(r"^DROP (FUNCTION|PROCEDURE) {ident}\.{ident}\((.*)\)$");
            let grant = pattern(
                r"^GRANT (\w+) ON {ident}\.{ident} TO {ident}( WITH GRANT OPTION)?$",
            );

            if let Some(caps) = create_table.captures(sql) {
                let key = (identifier(&caps[1]), identifier(&caps[2]));
                if self.tables.contains_key(&key) {
                    return Err(StatementFailure::new(
                        "42P07",
                        format!("relation \"{}\" already exists", key.1),
                    ));
                }
                self.tables.insert(key, column_list(&caps[3]));
                return Ok(());
            }

            if let Some(caps) = create_index.captures(sql) {
                let schema = identifier(&caps[2]);
                let table = identifier(&caps[3]);
                if !self.tables.contains_key(&(schema.clone(), table.clone())) {
                    return Err(StatementFailure::new(
                        "42P01",
                        format!("relation \"{}.{}\" does not exist", schema, table),
                    ));
                }
                self.indexes.insert(
                    (schema, identifier(&caps[1])),
                    (table, column_list(&caps[4])),
                );
                return Ok(());
            }

            if let Some(caps) = create_routine.captures(sql) {
                let kind = if &caps[1] == "FUNCTION" {
                    RoutineKind::Function
                } else {
                    RoutineKind::Procedure
                };
                let lines = sql.lines().count() as i64;
                self.routines.insert(
                    (identifier(&caps[2]), identifier(&caps[3]), caps[4].to_string()),
                    FakeRoutine { kind, lines },
                );
                return Ok(());
            }

            if let Some(caps) = drop_table.captures(sql) {
                let key = (identifier(&caps[1]), identifier(&caps[2]));
                if self.tables.remove(&key).is_none() {
                    return Err(StatementFailure::new(
                        "42P01",
                        format!("table \"{}\" does not exist", key.1),
                    ));
                }
                // 所属インデックスも削除される
                self.indexes
                    .retain(|(schema, _), (table, _)| !(schema == &key.0 && table == &key.1));
                return Ok(());
            }

            if let Some(caps) = drop_index.captures(sql) {
                let key = (identifier(&caps[1]), identifier(&caps[2]));
                if self.indexes.remove(&key).is_none() {
                    return Err(StatementFailure::new(
                        "42704",
                        format!("index \"{}\" does not exist", key.1),
                    ));
                }
                return Ok(());
            }

            if let Some(caps) = drop_routine.captures(sql) {
                let key = (identifier(&caps[2]), identifier(&caps[3]), caps[4].to_string());
                if self.routines.remove(&key).is_none() {
                    return Err(StatementFailure::new(
                        "42883",
                        format!("{} {}({}) does not exist", &caps[1], key.1, key.2),
                    ));
                }
                return Ok(());
            }

            if let Some(caps) = grant.captures(sql) {
                let grantee = if &caps[4] == "PUBLIC" {
                    "PUBLIC".to_string()
                } else {
                    identifier(&caps[4])
                };
                let record = GrantRecord {
                    schema: identifier(&caps[2]),
                    object: identifier(&caps[3]),
                    grantee,
                    privilege: caps[1].to_string(),
                    grantable: caps.get(5).is_some(),
                };
                if !self.grants.contains(&record) {
                    self.grants.push(record);
                }
                return Ok(());
            }

            Err(StatementFailure::new(
                "42601",
                format!("syntax error in statement: {}", sql),
            ))
        }
    }

    #[async_trait]
    impl SchemaCatalog for FakeCatalog {
        fn session_statements(&self) -> Vec<String> {
            SESSION_STATEMENTS.iter().map(|s| s.to_string()).collect()
        }

        async fn table_cardinalities(
            &mut self,
            schema: &SchemaName,
        ) -> Result<Vec<ObjectCardinality>, DatabaseError> {
            self.check_schema(schema)?;
            Ok(self
                .state()
                .tables
                .iter()
                .filter(|((s, _), _)| s == schema.as_str())
                .map(|((_, table), columns)| ObjectCardinality::table(table, columns.len() as i64))
                .collect())
        }

        async fn index_cardinalities(
            &mut self,
            schema: &SchemaName,
        ) -> Result<Vec<ObjectCardinality>, DatabaseError> {
            self.check_schema(schema)?;
            Ok(self
                .state()
                .indexes
                .iter()
                .filter(|((s, _), _)| s == schema.as_str())
                .map(|((_, index), (table, columns))| {
                    ObjectCardinality::index(table, index, columns.len() as i64)
                })
                .collect())
        }

        async fn routine_cardinalities(
            &mut self,
            schema: &SchemaName,
        ) -> Result<Vec<ObjectCardinality>, DatabaseError> {
            self.check_schema(schema)?;
            Ok(self
                .state()
                .routines
                .iter()
                .filter(|((s, _, _), _)| s == schema.as_str())
                .map(|((_, name, signature), routine)| {
                    ObjectCardinality::routine(routine.kind, name, signature, routine.lines)
                })
                .collect())
        }

        async fn extract_ddl(
            &mut self,
            row: &ComparisonRow,
            owner: &SchemaName,
            _remap_to: &SchemaName,
        ) -> Result<String, StatementFailure> {
            let state = self.state();
            if state.broken_ddl.contains(&row.name) {
                return Err(StatementFailure::new(
                    "XX000",
                    format!("could not extract definition of {}", row.name),
                ));
            }

            // 付け替えに対応しないカタログとして、所有者修飾のDDLを返す
            let qualifier = quote_identifier_if_needed_postgres(owner.as_str());
            let not_found = || {
                StatementFailure::new("42704", format!("{} was not found", row.display_name()))
            };

            match row.kind {
                ObjectKind::Table => {
                    let columns = state
                        .tables
                        .get(&(owner.to_string(), row.name.clone()))
                        .ok_or_else(not_found)?;
                    let body: Vec<String> = columns
                        .iter()
                        .map(|column| format!("{} integer", column))
                        .collect();
                    Ok(format!(
                        "CREATE TABLE {}.{} ({});",
                        qualifier,
                        row.name,
                        body.join(", ")
                    ))
                }
                ObjectKind::Index => {
                    let (table, columns) = state
                        .indexes
                        .get(&(owner.to_string(), row.name.clone()))
                        .ok_or_else(not_found)?;
                    Ok(format!(
                        "CREATE INDEX {} ON {}.{} USING btree ({})",
                        row.name,
                        qualifier,
                        table,
                        columns.join(", ")
                    ))
                }
                ObjectKind::Routine(kind) => {
                    let signature = row.signature.clone().unwrap_or_default();
                    let routine = state
                        .routine(owner.as_str(), &row.name, &signature)
                        .ok_or_else(not_found)?;
                    // 先頭行と末尾行を含めて routine.lines 行になるよう本体を組み立てる
                    let mut lines = vec![format!(
                        "CREATE OR REPLACE {} {}.{}({})",
                        kind.keyword(),
                        qualifier,
                        row.name,
                        signature
                    )];
                    lines.push("AS $$".to_string());
                    while (lines.len() as i64) < routine.lines - 1 {
                        lines.push(format!("  PERFORM {}.audit_log();", qualifier));
                    }
                    lines.push("$$ LANGUAGE plpgsql;".to_string());
                    Ok(lines.join("\n"))
                }
            }
        }

        async fn object_grants(
            &mut self,
            schema: &SchemaName,
        ) -> Result<Vec<GrantRecord>, DatabaseError> {
            self.check_schema(schema)?;
            Ok(self
                .state()
                .grants
                .iter()
                .filter(|grant| grant.schema == schema.as_str() && grant.grantee != grant.schema)
                .cloned()
                .collect())
        }

        async fn principal_grants(
            &mut self,
            principal: &SchemaName,
            excluded: &[&SchemaName],
        ) -> Result<Vec<GrantRecord>, DatabaseError> {
            Ok(self
                .state()
                .grants
                .iter()
                .filter(|grant| grant.grantee == principal.as_str())
                .filter(|grant| !excluded.iter().any(|s| s.as_str() == grant.schema))
                .cloned()
                .collect())
        }

        async fn execute(&mut self, statement: &str) -> Result<(), StatementFailure> {
            let mut state = self.state();
            state.executed.push(statement.to_string());

            let configured = state
                .failing_statements
                .iter()
                .find(|(pattern, _)| statement.contains(pattern.as_str()))
                .cloned();
            if let Some((pattern, code)) = configured {
                return Err(StatementFailure::new(
                    code,
                    format!("statement matching '{}' was rejected", pattern),
                ));
            }

            state.apply(statement)
        }

        async fn close(self) -> Result<(), DatabaseError> {
            self.state().closed = true;
            Ok(())
        }
    }
}
