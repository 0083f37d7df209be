//! Loading generated Parquet parts into the lake one file at a time.
//!
//! Every insert becomes its own DuckLake data file, which is what the
//! compaction step later merges.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::TpchConfig;
use crate::error::{LakeError, Result};
use crate::session::{quote_literal, validate_identifier, LakeSession};

const LINEITEM_COLUMNS: &str = "l_orderkey, l_partkey, l_suppkey, l_linenumber, l_quantity, \
     l_extendedprice, l_discount, l_tax, l_returnflag, l_linestatus, l_shipdate, l_commitdate, \
     l_receiptdate, l_shipinstruct, l_shipmode, l_comment";

const ORDERS_COLUMNS: &str = "o_orderkey, o_custkey, o_orderstatus, o_totalprice, o_orderdate, \
     o_orderpriority, o_clerk, o_shippriority, o_comment";

/// How the partition columns of a lake table are derived from a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionScheme {
    /// `lineitem`: `year` of the ship date.
    ShipYear,
    /// `orders`: `year`, `month`, `day` of the order date.
    OrderDate,
    /// Any other table is loaded as-is.
    Unpartitioned,
}

impl PartitionScheme {
    pub fn for_table(table: &str) -> Self {
        match table {
            "lineitem" => PartitionScheme::ShipYear,
            "orders" => PartitionScheme::OrderDate,
            _ => PartitionScheme::Unpartitioned,
        }
    }

    /// Select list for the insert.
    fn select_list(&self) -> String {
        match self {
            PartitionScheme::ShipYear => {
                format!("{}, year(l_shipdate) AS year", LINEITEM_COLUMNS)
            }
            PartitionScheme::OrderDate => format!(
                "{}, year(o_orderdate) AS year, month(o_orderdate) AS month, day(o_orderdate) AS day",
                ORDERS_COLUMNS
            ),
            PartitionScheme::Unpartitioned => "*".to_string(),
        }
    }
}

/// `INSERT INTO <alias>.<table> SELECT ... FROM read_parquet('<file>')`.
pub fn insert_statement(qualified_table: &str, table: &str, file: &Path) -> String {
    format!(
        "INSERT INTO {} SELECT {} FROM read_parquet({});",
        qualified_table,
        PartitionScheme::for_table(table).select_list(),
        quote_literal(&file.display().to_string())
    )
}

/// Parquet files in `dir`, ordered by the numeric suffix of their stem
/// (`lineitem.10.parquet` after `lineitem.9.parquet`). Stems without a
/// numeric suffix sort first.
pub fn list_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect();

    files.sort_by_key(|path| (part_number(path), path.file_name().map(|n| n.to_os_string())));
    Ok(files)
}

fn part_number(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit('.').next())
        .and_then(|suffix| suffix.parse().ok())
        .unwrap_or(0)
}

/// Outcome of a small-file load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    pub files_loaded: usize,
}

/// Loads each Parquet part of one table as a separate insert.
pub struct SmallFileLoader<'a> {
    config: &'a TpchConfig,
}

impl<'a> SmallFileLoader<'a> {
    pub fn new(config: &'a TpchConfig) -> Self {
        Self { config }
    }

    /// Check inputs and return the ordered file list for `table`.
    pub fn plan(&self, table: &str) -> Result<Vec<PathBuf>> {
        validate_identifier(table)?;
        let data_dir = self.config.table_dir(table);

        if !data_dir.is_dir() {
            return Err(LakeError::Missing(format!(
                "Directory {} does not exist.\nPlease generate TPCH data first with: tpchlake tpch",
                data_dir.display()
            )));
        }

        let catalog = &self.config.lake.catalog_path;
        if !catalog.exists() {
            return Err(LakeError::Missing(format!(
                "DuckLake catalog not found at {}\nPlease initialize catalog first with: tpchlake catalog",
                catalog.display()
            )));
        }

        let files = list_parquet_files(&data_dir)?;
        if files.is_empty() {
            return Err(LakeError::Missing(format!(
                "No Parquet files found in {}",
                data_dir.display()
            )));
        }
        Ok(files)
    }

    /// Insert every file in `files` into `table`, writing progress to `out`.
    pub fn load<W: Write>(
        &self,
        session: &LakeSession,
        table: &str,
        files: &[PathBuf],
        out: &mut W,
    ) -> Result<LoadSummary> {
        if !session.table_exists(table) {
            return Err(LakeError::Missing(format!(
                "Table {} does not exist.\nPlease initialize catalog first with: tpchlake catalog",
                table
            )));
        }
        writeln!(out, "Inserting into existing table: {}", table)?;

        let qualified = session.qualified(table);
        let total = files.len();
        for (idx, file) in files.iter().enumerate() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            writeln!(out, "[{}/{}] Loading {}...", idx + 1, total, name)?;
            out.flush()?;

            let statement = insert_statement(&qualified, table, file);
            tracing::debug!(statement = %statement, "Inserting parquet file");
            session.connection().execute_batch(&statement)?;
        }

        tracing::info!(table = %table, files = total, "Small files loaded");
        Ok(LoadSummary {
            table: table.to_string(),
            files_loaded: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckdb::Connection;

    #[test]
    fn test_partition_scheme() {
        assert_eq!(PartitionScheme::for_table("lineitem"), PartitionScheme::ShipYear);
        assert_eq!(PartitionScheme::for_table("orders"), PartitionScheme::OrderDate);
        assert_eq!(PartitionScheme::for_table("customer"), PartitionScheme::Unpartitioned);
    }

    #[test]
    fn test_insert_statement() {
        let sql = insert_statement("lake.orders", "orders", Path::new("data/tpch/orders/orders.1.parquet"));
        assert!(sql.starts_with("INSERT INTO lake.orders SELECT o_orderkey,"));
        assert!(sql.contains("month(o_orderdate) AS month"));
        assert!(sql.ends_with("FROM read_parquet('data/tpch/orders/orders.1.parquet');"));

        let sql = insert_statement("lake.nation", "nation", Path::new("n.parquet"));
        assert_eq!(sql, "INSERT INTO lake.nation SELECT * FROM read_parquet('n.parquet');");
    }

    #[test]
    fn test_list_parquet_files_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["lineitem.10.parquet", "lineitem.2.parquet", "lineitem.1.parquet", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = list_parquet_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["lineitem.1.parquet", "lineitem.2.parquet", "lineitem.10.parquet"]);
    }

    #[test]
    fn test_plan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TpchConfig::default();
        config.output_dir = dir.path().join("tpch");

        let err = SmallFileLoader::new(&config).plan("lineitem").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_plan_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TpchConfig::default();
        config.output_dir = dir.path().to_path_buf();
        config.lake.catalog_path = dir.path().join("catalog/ducklake.ducklake");
        fs::create_dir_all(dir.path().join("lineitem")).unwrap();

        let err = SmallFileLoader::new(&config).plan("lineitem").unwrap_err();
        assert!(err.to_string().contains("DuckLake catalog not found"));
    }

    #[test]
    fn test_plan_rejects_bad_table_name() {
        let config = TpchConfig::default();
        assert!(SmallFileLoader::new(&config).plan("orders; drop").is_err());
    }

    #[test]
    fn test_load_inserts_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE nation (n_nationkey INTEGER, n_name VARCHAR);")
            .unwrap();

        let mut files = Vec::new();
        for part in 1..=3 {
            let path = dir.path().join(format!("nation.{}.parquet", part));
            conn.execute_batch(&format!(
                "COPY (SELECT {} AS n_nationkey, 'N{}' AS n_name) TO {} (FORMAT parquet);",
                part,
                part,
                quote_literal(&path.display().to_string())
            ))
            .unwrap();
            files.push(path);
        }

        let session = LakeSession::from_connection(conn, "memory");
        let config = TpchConfig::default();
        let mut out = Vec::new();
        let summary = SmallFileLoader::new(&config)
            .load(&session, "nation", &files, &mut out)
            .unwrap();
        assert_eq!(summary.files_loaded, 3);

        let count: i64 = session
            .connection()
            .query_row("SELECT COUNT(*) FROM nation", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[3/3] Loading nation.3.parquet..."));
    }

    #[test]
    fn test_load_missing_table() {
        let session = LakeSession::from_connection(Connection::open_in_memory().unwrap(), "memory");
        let config = TpchConfig::default();
        let err = SmallFileLoader::new(&config)
            .load(&session, "lineitem", &[], &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, LakeError::Missing(_)));
    }
}
