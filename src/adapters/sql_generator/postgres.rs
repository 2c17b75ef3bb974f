// PostgreSQL用SQLジェネレーター
//
// カタログから取得した定義情報からPostgreSQL用のDDL文を生成します。

use crate::adapters::sql_generator::{
    ColumnDefinition, IdentityKind, SqlGenerator, TableDefinition,
};
use crate::adapters::sql_quote::{quote_identifier_postgres, quote_qualified_postgres};
use crate::core::catalog::{GrantRecord, RoutineKind};

/// 全ロールを表す予約済み主体名
const PUBLIC_GRANTEE: &str = "PUBLIC";

/// PostgreSQL用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct PostgresSqlGenerator {}

impl PostgresSqlGenerator {
    /// 新しいPostgresSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// カラム定義をDDL片に変換
    fn build_column_definition(&self, column: &ColumnDefinition) -> String {
        let mut parts = vec![quote_identifier_postgres(&column.name), column.data_type.clone()];

        if let Some(expression) = &column.generated_expression {
            parts.push(format!("GENERATED ALWAYS AS ({}) STORED", expression));
        } else if let Some(identity) = column.identity {
            parts.push(
                match identity {
                    IdentityKind::Always => "GENERATED ALWAYS AS IDENTITY",
                    IdentityKind::ByDefault => "GENERATED BY DEFAULT AS IDENTITY",
                }
                .to_string(),
            );
        } else if let Some(default) = &column.default_expression {
            parts.push(format!("DEFAULT {}", default));
        }

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        parts.join(" ")
    }

    /// 主体名をクォート（PUBLICは予約語のまま）
    fn quote_grantee(&self, grantee: &str) -> String {
        if grantee.eq_ignore_ascii_case(PUBLIC_GRANTEE) {
            PUBLIC_GRANTEE.to_string()
        } else {
            quote_identifier_postgres(grantee)
        }
    }
}

impl SqlGenerator for PostgresSqlGenerator {
    fn generate_drop_table(&self, schema: &str, table: &str) -> String {
        format!("DROP TABLE {}", quote_qualified_postgres(schema, table))
    }

    fn generate_drop_index(&self, schema: &str, index: &str) -> String {
        format!("DROP INDEX {}", quote_qualified_postgres(schema, index))
    }

    fn generate_drop_routine(
        &self,
        kind: RoutineKind,
        schema: &str,
        name: &str,
        signature: Option<&str>,
    ) -> String {
        let target = quote_qualified_postgres(schema, name);
        match signature {
            Some(signature) => format!("DROP {} {}({})", kind.keyword(), target, signature),
            None => format!("DROP {} {}", kind.keyword(), target),
        }
    }

    fn generate_create_table(&self, schema: &str, table: &TableDefinition) -> String {
        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|column| self.build_column_definition(column))
            .collect();

        for constraint in &table.constraints {
            elements.push(format!(
                "CONSTRAINT {} {}",
                quote_identifier_postgres(&constraint.name),
                constraint.definition
            ));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_qualified_postgres(schema, &table.name),
            elements.join(",\n    ")
        );
        if let Some(key) = &table.partition_key {
            sql.push_str(&format!(" PARTITION BY {}", key));
        }
        sql
    }

    fn generate_grant(&self, grant: &GrantRecord, schema: &str, grantee: &str) -> String {
        let mut sql = format!(
            "GRANT {} ON {} TO {}",
            grant.privilege,
            quote_qualified_postgres(schema, &grant.object),
            self.quote_grantee(grantee)
        );
        if grant.grantable {
            sql.push_str(" WITH GRANT OPTION");
        }
        sql
    }
}
