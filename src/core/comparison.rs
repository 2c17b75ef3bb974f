// カタログ比較
//
// ソースとターゲットの件数情報をオブジェクトの同一性で突き合わせ、
// 「不一致（削除対象）」と「欠落（作成対象）」を判定します。
// 除外パターンに一致する名前は、どちらの方向でも比較対象になりません。

use crate::core::catalog::{ComparisonRow, GrantRecord, ObjectCardinality, ObjectIdentity};
use crate::core::config::ExclusionConfig;
use std::collections::{BTreeMap, HashSet};

/// 名前の除外ポリシー
///
/// 大文字小文字を区別せずに判定します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPolicy {
    recycle_bin_prefix: String,
    temp_marker: String,
}

impl ExclusionPolicy {
    /// 接頭辞と目印を指定して作成
    pub fn new(recycle_bin_prefix: &str, temp_marker: &str) -> Self {
        Self {
            recycle_bin_prefix: recycle_bin_prefix.to_uppercase(),
            temp_marker: temp_marker.to_uppercase(),
        }
    }

    /// 名前が除外対象か
    pub fn is_excluded(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        upper.starts_with(&self.recycle_bin_prefix) || upper.contains(&self.temp_marker)
    }

    /// 比較行が除外対象か（所属テーブルも判定する）
    pub fn excludes_row(&self, row: &ComparisonRow) -> bool {
        self.is_excluded(&row.name)
            || row
                .parent
                .as_deref()
                .is_some_and(|parent| self.is_excluded(parent))
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::from(&ExclusionConfig::default())
    }
}

impl From<&ExclusionConfig> for ExclusionPolicy {
    fn from(config: &ExclusionConfig) -> Self {
        Self::new(&config.recycle_bin_prefix, &config.temp_marker)
    }
}

/// カタログ比較器
#[derive(Debug, Clone, Default)]
pub struct CatalogComparator {
    exclusion: ExclusionPolicy,
}

impl CatalogComparator {
    /// 除外ポリシーを指定して作成
    pub fn new(exclusion: ExclusionPolicy) -> Self {
        Self { exclusion }
    }

    /// ソースとターゲットの件数を突き合わせる
    ///
    /// 結果は（所属テーブル, 名前）順に並び、除外対象の行は含みません。
    /// 同一キーが複数ある場合は最大の件数を採用します。
    pub fn join(
        &self,
        source: &[ObjectCardinality],
        target: &[ObjectCardinality],
    ) -> Vec<ComparisonRow> {
        let mut joined: BTreeMap<ObjectIdentity, (Option<i64>, Option<i64>)> = BTreeMap::new();

        for object in source {
            let entry = joined.entry(object.identity()).or_default();
            entry.0 = Some(entry.0.map_or(object.cardinality, |c| c.max(object.cardinality)));
        }
        for object in target {
            let entry = joined.entry(object.identity()).or_default();
            entry.1 = Some(entry.1.map_or(object.cardinality, |c| c.max(object.cardinality)));
        }

        joined
            .into_iter()
            .map(|(identity, (source, target))| ComparisonRow {
                kind: identity.kind,
                name: identity.name,
                parent: identity.parent,
                signature: identity.signature,
                source,
                target,
            })
            .filter(|row| !self.exclusion.excludes_row(row))
            .collect()
    }

    /// 削除対象（両側に存在し件数が異なる）行を抽出
    pub fn mismatched(
        &self,
        source: &[ObjectCardinality],
        target: &[ObjectCardinality],
    ) -> Vec<ComparisonRow> {
        self.join(source, target)
            .into_iter()
            .filter(ComparisonRow::is_mismatched)
            .collect()
    }

    /// 作成対象（種別の欠落方針に該当する）行を抽出
    pub fn missing(
        &self,
        source: &[ObjectCardinality],
        target: &[ObjectCardinality],
    ) -> Vec<ComparisonRow> {
        self.join(source, target)
            .into_iter()
            .filter(ComparisonRow::is_missing)
            .collect()
    }

    /// 付与者方向の未反映権限を抽出
    ///
    /// ソーススキーマのオブジェクトに付いている権限のうち、
    /// ターゲットスキーマの同名オブジェクトに未付与のものを返します。
    pub fn pending_object_grants(
        &self,
        source: &[GrantRecord],
        target: &[GrantRecord],
    ) -> Vec<GrantRecord> {
        let existing: HashSet<_> = target.iter().map(GrantRecord::object_key).collect();
        self.pending(source, |grant| !existing.contains(&grant.object_key()))
    }

    /// 被付与者方向の未反映権限を抽出
    ///
    /// ソース主体が他スキーマのオブジェクトに持つ権限のうち、
    /// ターゲット主体がまだ持っていないものを返します。
    pub fn pending_holder_grants(
        &self,
        source: &[GrantRecord],
        target: &[GrantRecord],
    ) -> Vec<GrantRecord> {
        let existing: HashSet<_> = target.iter().map(GrantRecord::holder_key).collect();
        self.pending(source, |grant| !existing.contains(&grant.holder_key()))
    }

    fn pending(
        &self,
        source: &[GrantRecord],
        is_new: impl Fn(&GrantRecord) -> bool,
    ) -> Vec<GrantRecord> {
        let mut pending: Vec<GrantRecord> = source
            .iter()
            .filter(|grant| !self.exclusion.is_excluded(&grant.object))
            .filter(|grant| is_new(grant))
            .cloned()
            .collect();
        pending.sort();
        pending.dedup();
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{ObjectKind, RoutineKind};

    fn grant(schema: &str, object: &str, grantee: &str, privilege: &str) -> GrantRecord {
        GrantRecord {
            schema: schema.to_string(),
            object: object.to_string(),
            grantee: grantee.to_string(),
            privilege: privilege.to_string(),
            grantable: false,
        }
    }

    #[test]
    fn test_equal_cardinality_is_neither_mismatched_nor_missing() {
        let comparator = CatalogComparator::default();
        let source = vec![ObjectCardinality::table("ORDERS", 7)];
        let target = vec![ObjectCardinality::table("ORDERS", 7)];

        assert!(comparator.mismatched(&source, &target).is_empty());
        assert!(comparator.missing(&source, &target).is_empty());
    }

    #[test]
    fn test_missing_table_is_reported_once() {
        let comparator = CatalogComparator::default();
        let source = vec![
            ObjectCardinality::table("T1", 3),
            ObjectCardinality::table("T2", 5),
        ];
        let target = vec![ObjectCardinality::table("T2", 5)];

        let missing = comparator.missing(&source, &target);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "T1");
        assert_eq!(missing[0].source, Some(3));
        assert_eq!(missing[0].target, None);
    }

    #[test]
    fn test_column_count_mismatch_is_flagged_for_drop() {
        let comparator = CatalogComparator::default();
        let source = vec![ObjectCardinality::table("T2", 5)];
        let target = vec![ObjectCardinality::table("T2", 4)];

        let mismatched = comparator.mismatched(&source, &target);
        assert_eq!(mismatched.len(), 1);
        assert_eq!(mismatched[0].name, "T2");
        assert!(comparator.missing(&source, &target).is_empty());

        // 削除後の再比較では欠落として現れる
        let after_drop = comparator.missing(&source, &[]);
        assert_eq!(after_drop.len(), 1);
        assert_eq!(after_drop[0].name, "T2");
    }

    #[test]
    fn test_target_only_objects_are_ignored() {
        let comparator = CatalogComparator::default();
        let target = vec![ObjectCardinality::table("LEGACY", 2)];

        assert!(comparator.mismatched(&[], &target).is_empty());
        assert!(comparator.missing(&[], &target).is_empty());
    }

    #[test]
    fn test_excluded_names_never_appear() {
        let comparator = CatalogComparator::default();
        let source = vec![
            ObjectCardinality::table("BIN$abc==$0", 3),
            ObjectCardinality::table("ORDERS_TMP", 3),
            ObjectCardinality::table("tmp_orders", 2),
            ObjectCardinality::index("ORDERS_TMP", "IDX_ORDERS_TMP_ID", 1),
        ];
        let target = vec![
            ObjectCardinality::table("BIN$abc==$0", 1),
            ObjectCardinality::table("ORDERS_TMP", 9),
        ];

        assert!(comparator.join(&source, &target).is_empty());
        assert!(comparator.mismatched(&source, &target).is_empty());
        assert!(comparator.missing(&source, &target).is_empty());
    }

    #[test]
    fn test_default_prefix_keeps_ordinary_bin_names() {
        let policy = ExclusionPolicy::default();
        assert!(policy.is_excluded("BIN$abc==$0"));
        assert!(policy.is_excluded("bin$x1y2"));
        assert!(!policy.is_excluded("bindings"));
        assert!(!policy.is_excluded("binary_assets"));
    }

    #[test]
    fn test_index_excluded_by_parent_table() {
        let comparator = CatalogComparator::default();
        let source = vec![ObjectCardinality::index("TMP_LOAD", "IDX_LOAD_ID", 1)];

        assert!(comparator.missing(&source, &[]).is_empty());
    }

    #[test]
    fn test_custom_exclusion_policy() {
        let comparator = CatalogComparator::new(ExclusionPolicy::new("ARCH_", "SCRATCH"));
        let source = vec![
            ObjectCardinality::table("arch_orders", 3),
            ObjectCardinality::table("BIN_LOOKUP", 2),
        ];

        let missing = comparator.missing(&source, &[]);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "BIN_LOOKUP");
    }

    #[test]
    fn test_routine_with_identical_line_count_is_in_sync() {
        let comparator = CatalogComparator::default();
        let source = vec![ObjectCardinality::routine(
            RoutineKind::Procedure,
            "P1",
            "",
            20,
        )];
        let target = vec![ObjectCardinality::routine(
            RoutineKind::Procedure,
            "P1",
            "",
            20,
        )];

        assert!(comparator.mismatched(&source, &target).is_empty());
        assert!(comparator.missing(&source, &target).is_empty());
    }

    #[test]
    fn test_routine_line_count_difference_is_dropped_and_recreated() {
        let comparator = CatalogComparator::default();
        let source = vec![ObjectCardinality::routine(
            RoutineKind::Function,
            "F1",
            "integer",
            12,
        )];
        let target = vec![ObjectCardinality::routine(
            RoutineKind::Function,
            "F1",
            "integer",
            9,
        )];

        assert_eq!(comparator.mismatched(&source, &target).len(), 1);
        assert_eq!(comparator.missing(&source, &target).len(), 1);
    }

    #[test]
    fn test_routine_overloads_are_compared_separately() {
        let comparator = CatalogComparator::default();
        let source = vec![
            ObjectCardinality::routine(RoutineKind::Function, "F", "integer", 4),
            ObjectCardinality::routine(RoutineKind::Function, "F", "text", 4),
        ];
        let target = vec![ObjectCardinality::routine(
            RoutineKind::Function,
            "F",
            "integer",
            4,
        )];

        let missing = comparator.missing(&source, &target);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].signature.as_deref(), Some("text"));
    }

    #[test]
    fn test_join_orders_by_parent_then_name() {
        let comparator = CatalogComparator::default();
        let source = vec![
            ObjectCardinality::index("ORDERS", "IDX_B", 1),
            ObjectCardinality::index("CUSTOMERS", "IDX_Z", 1),
            ObjectCardinality::index("ORDERS", "IDX_A", 2),
        ];

        let rows = comparator.join(&source, &[]);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["IDX_Z", "IDX_A", "IDX_B"]);
        assert!(rows.iter().all(|r| r.kind == ObjectKind::Index));
    }

    #[test]
    fn test_pending_object_grants_skip_existing_and_excluded() {
        let comparator = CatalogComparator::default();
        let source = vec![
            grant("APP_08", "ORDERS", "REPORTING", "SELECT"),
            grant("APP_08", "ORDERS", "REPORTING", "INSERT"),
            grant("APP_08", "ORDERS_TMP", "REPORTING", "SELECT"),
        ];
        let target = vec![grant("APP_06", "ORDERS", "REPORTING", "SELECT")];

        let pending = comparator.pending_object_grants(&source, &target);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].privilege, "INSERT");
    }

    #[test]
    fn test_pending_holder_grants_skip_existing() {
        let comparator = CatalogComparator::default();
        let source = vec![
            grant("SHARED", "CURRENCY", "APP_08", "SELECT"),
            grant("SHARED", "COUNTRY", "APP_08", "SELECT"),
        ];
        let target = vec![grant("SHARED", "CURRENCY", "APP_06", "SELECT")];

        let pending = comparator.pending_holder_grants(&source, &target);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].object, "COUNTRY");
    }
}
