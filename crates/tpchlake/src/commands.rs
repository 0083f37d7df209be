//! One function per CLI verb.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io;

use tpchlake_tools::generator;
use tpchlake_tools::loader::SmallFileLoader;
use tpchlake_tools::preflight;
use tpchlake_tools::session::{quote_literal, validate_identifier};
use tpchlake_tools::snapshots;
use tpchlake_tools::{
    ErrorPolicy, LakeSession, ScriptExecutor, TpchConfig, Variables, VersionOverrides,
};

const BANNER_WIDTH: usize = 80;
const TIME_TRAVEL_TABLE: &str = "orders";

/// Placeholders every script can use: catalog location and data directories.
pub fn script_variables(config: &TpchConfig) -> Variables {
    Variables::new()
        .set("LAKE", &config.lake.alias)
        .set("CATALOG_PATH", config.lake.catalog_path.display())
        .set("DATA_PATH", &config.lake.data_path)
        .set("TPCH_DIR", config.output_dir.display())
}

fn run_script(config: &TpchConfig, name: &str, vars: &Variables) -> Result<()> {
    ScriptExecutor::stdout(&config.lake.alias)
        .run_file(&config.lake.scripts_dir, name, vars, None)
        .with_context(|| format!("Script {} failed", name))?;
    Ok(())
}

fn rule(ch: char) -> String {
    ch.to_string().repeat(BANNER_WIDTH)
}

pub fn setup(config: &TpchConfig) -> Result<()> {
    println!("Setting up DuckLake TPCH demo...");
    let workdir = std::env::current_dir().context("Failed to read working directory")?;
    let results = preflight::run_checks(config, &workdir);
    preflight::print_results(&mut io::stdout(), &results)?;

    if !preflight::all_passed(&results) {
        bail!("Preflight checks failed");
    }
    println!("Preflight checks passed.");
    Ok(())
}

pub fn tpch(config: &TpchConfig, part: Option<u32>) -> Result<()> {
    println!("TPCH Configuration:");
    println!("  Scale Factor: {}", config.scale);
    println!("  Parts: {}", config.parts);
    println!("  Tables: {}", config.tables.join(", "));
    println!("  Output Directory: {}", config.output_dir.display());
    println!("  Row Group Size: {} bytes", config.parquet.row_group_bytes);
    println!();

    generator::generate(config, part).context("TPC-H generation failed")?;

    println!(
        "Generated TPCH ({}) scale={} parts={} → {}",
        config.tables.join(", "),
        config.scale,
        config.parts,
        config.output_dir.display()
    );
    Ok(())
}

pub fn catalog(config: &TpchConfig) -> Result<()> {
    println!("Initializing DuckLake catalog...");
    if let Some(parent) = config.lake.catalog_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::create_dir_all(&config.lake.data_path)
        .with_context(|| format!("Failed to create {}", config.lake.data_path))?;

    println!("Creating catalog directory and tables...");
    run_script(config, "bootstrap_catalog.sql", &script_variables(config))?;
    println!("Catalog initialized successfully!");
    Ok(())
}

pub fn repartition(config: &TpchConfig) -> Result<()> {
    println!("Repartitioning orders table...");
    println!("Copying data from orders_raw to partitioned orders table...");
    run_script(config, "repartition_orders.sql", &script_variables(config))?;
    println!("Repartitioning completed successfully!");
    Ok(())
}

pub fn load_small_files(config: &TpchConfig, table: &str) -> Result<()> {
    println!("Loading small files for table: {}", table);
    println!("Reading from: {}", config.table_dir(table).display());

    let loader = SmallFileLoader::new(config);
    let files = loader.plan(table)?;
    println!("Found {} Parquet files to load", files.len());

    let session = LakeSession::open(&config.lake).context("Failed to attach DuckLake catalog")?;
    let summary = loader.load(&session, table, &files, &mut io::stdout())?;
    session.close()?;

    println!();
    println!(
        "Successfully loaded {} files into {} table",
        summary.files_loaded, summary.table
    );
    println!("Each file created a separate DuckLake file, ready for compaction!");
    println!();
    println!("Next steps:");
    println!("  1. Create a snapshot: tpchlake manifest");
    println!("  2. Compact files: tpchlake compact");
    Ok(())
}

pub fn manifest(config: &TpchConfig) -> Result<()> {
    println!("Creating DuckLake snapshot...");
    run_script(config, "make_manifest.sql", &script_variables(config))?;
    println!("Snapshot created. Query DuckLake metadata directly - no external manifest files needed!");
    Ok(())
}

pub fn time_travel(config: &TpchConfig) -> Result<()> {
    println!("Demonstrating DuckLake time travel capabilities...");
    let session = LakeSession::open(&config.lake).context("Failed to attach DuckLake catalog")?;
    let range = snapshots::resolve_range(&session, TIME_TRAVEL_TABLE, VersionOverrides::default())?;
    println!("Comparing snapshots {} and {}", range.from, range.to);

    let vars = script_variables(config)
        .set("TABLE", TIME_TRAVEL_TABLE)
        .set("FROM_VERSION", range.from)
        .set("TO_VERSION", range.to);
    ScriptExecutor::stdout(&config.lake.alias).run_file(
        &config.lake.scripts_dir,
        "time_travel.sql",
        &vars,
        Some(&session),
    )?;
    session.close()?;
    Ok(())
}

/// `col=value` as a SQL predicate; numbers stay bare, anything else is quoted.
pub fn partition_predicate(filter: Option<&str>) -> Result<String> {
    let Some(filter) = filter else {
        return Ok("TRUE".to_string());
    };
    let Some((column, value)) = filter.split_once('=') else {
        bail!("Partition filter must look like column=value, got '{}'", filter);
    };
    let column = validate_identifier(column.trim())?;
    let value = value.trim();
    if value.is_empty() {
        bail!("Partition filter '{}' has no value", filter);
    }

    if value.parse::<i64>().is_ok() {
        Ok(format!("{} = {}", column, value))
    } else {
        Ok(format!("{} = {}", column, quote_literal(value)))
    }
}

pub fn compact_variables(
    config: &TpchConfig,
    table: &str,
    partition_filter: Option<&str>,
) -> Result<Variables> {
    let table = validate_identifier(table)?;
    Ok(script_variables(config)
        .set("TABLE_NAME", table)
        .set("TABLE", table)
        .set("PARTITION_PREDICATE", partition_predicate(partition_filter)?))
}

pub fn compact(
    config: &TpchConfig,
    table: &str,
    target_size: Option<u64>,
    partition_filter: Option<&str>,
) -> Result<()> {
    println!("Compacting small files to improve query performance...");
    println!("Table: {}", table);
    let vars = compact_variables(config, table, partition_filter)?;

    let session = LakeSession::open(&config.lake).context("Failed to attach DuckLake catalog")?;
    if let Some(bytes) = target_size {
        println!("Target file size: {} bytes (saved as a catalog option)", bytes);
        session.connection().execute_batch(&format!(
            "CALL {}.set_option('target_file_size', '{}B');",
            session.alias(),
            bytes
        ))?;
    }

    println!("Executing compaction SQL...");
    ScriptExecutor::stdout(&config.lake.alias)
        .with_policy(ErrorPolicy::Lenient)
        .run_file(&config.lake.scripts_dir, "compaction.sql", &vars, Some(&session))?;
    session.close()?;

    println!("Compaction completed!");
    Ok(())
}

pub fn expire_variables(config: &TpchConfig, older_than: &str, dry_run: bool) -> Variables {
    script_variables(config)
        .set("OLDER_THAN", older_than.replace('\'', "''"))
        .set("DRY_RUN", dry_run)
}

pub fn expire_snapshots(config: &TpchConfig, older_than: &str, dry_run: bool) -> Result<()> {
    println!("{}", rule('='));
    println!("SNAPSHOT EXPIRATION");
    println!("{}", rule('='));
    println!("Retention period: {}", older_than);
    if dry_run {
        println!("Mode: DRY RUN (no snapshots will be expired)");
    } else {
        println!("Mode: LIVE (snapshots will be expired)");
    }
    println!();
    println!("PRE-STATE: Current snapshots and storage");
    println!("{}", rule('-'));
    println!();

    ScriptExecutor::stdout(&config.lake.alias)
        .with_policy(ErrorPolicy::Lenient)
        .run_file(
            &config.lake.scripts_dir,
            "expire_snapshots.sql",
            &expire_variables(config, older_than, dry_run),
            None,
        )?;

    let title = "POST-STATE: Remaining snapshots and storage";
    println!();
    println!("╔{}╗", "═".repeat(BANNER_WIDTH - 2));
    println!("║ {:<width$}║", title, width = BANNER_WIDTH - 3);
    println!("╚{}╝", "═".repeat(BANNER_WIDTH - 2));
    println!();
    println!("Expire snapshots completed!");
    println!("{}", rule('='));
    Ok(())
}

pub fn change_feed(
    config: &TpchConfig,
    table: &str,
    from_version: Option<i64>,
    to_version: Option<i64>,
) -> Result<()> {
    println!("{}", rule('='));
    println!("CHANGE FEED ANALYSIS");
    println!("{}", rule('='));
    println!("Table: {}", table);
    let table = validate_identifier(table)?;

    let session = LakeSession::open(&config.lake).context("Failed to attach DuckLake catalog")?;
    let overrides = VersionOverrides {
        from: from_version,
        to: to_version,
    };
    let range = snapshots::resolve_range(&session, table, overrides)?;

    println!();
    println!("PRE-STATE: Snapshot {}", range.from);
    println!("POST-STATE: Snapshot {}", range.to);
    println!();
    println!("Executing change feed analysis...");
    println!();

    let vars = script_variables(config)
        .set("FROM_VERSION", range.from)
        .set("TO_VERSION", range.to)
        .set("TABLE", table)
        .set("TABLE_NAME", table);
    ScriptExecutor::stdout(&config.lake.alias).run_file(
        &config.lake.scripts_dir,
        "change_feed.sql",
        &vars,
        Some(&session),
    )?;
    session.close()?;

    println!("{}", rule('='));
    println!("Change feed analysis completed!");
    println!("{}", rule('='));
    Ok(())
}

pub fn verify(config: &TpchConfig) -> Result<()> {
    println!("Verifying row counts across raw files, raw tables, and partitioned tables...");
    println!();
    run_script(config, "verify_counts.sql", &script_variables(config))?;
    println!();
    println!("Verification completed!");
    Ok(())
}

pub fn clean(config: &TpchConfig) -> Result<()> {
    println!("Removing all generated data and catalog...");
    for path in tpchlake_tools::clean::clean(config)? {
        println!("Removed: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_variables() {
        let vars = script_variables(&TpchConfig::default());
        assert_eq!(vars.get("LAKE"), Some("lake"));
        assert_eq!(vars.get("CATALOG_PATH"), Some("catalog/ducklake.ducklake"));
        assert_eq!(vars.get("DATA_PATH"), Some("data/lake/"));
        assert_eq!(vars.get("TPCH_DIR"), Some("data/tpch"));
    }

    #[test]
    fn test_partition_predicate() {
        assert_eq!(partition_predicate(None).unwrap(), "TRUE");
        assert_eq!(partition_predicate(Some("year=1992")).unwrap(), "year = 1992");
        assert_eq!(
            partition_predicate(Some(" l_shipmode = AIR ")).unwrap(),
            "l_shipmode = 'AIR'"
        );
        assert!(partition_predicate(Some("year")).is_err());
        assert!(partition_predicate(Some("year=")).is_err());
        assert!(partition_predicate(Some("1=1 OR x=1")).is_err());
    }

    #[test]
    fn test_compact_variables() {
        let vars = compact_variables(&TpchConfig::default(), "orders", Some("month=3")).unwrap();
        assert_eq!(vars.get("TABLE_NAME"), Some("orders"));
        assert_eq!(vars.get("PARTITION_PREDICATE"), Some("month = 3"));
        assert!(compact_variables(&TpchConfig::default(), "orders;", None).is_err());
    }

    #[test]
    fn test_expire_variables() {
        let vars = expire_variables(&TpchConfig::default(), "7 days", true);
        assert_eq!(vars.get("OLDER_THAN"), Some("7 days"));
        assert_eq!(vars.get("DRY_RUN"), Some("true"));

        let vars = expire_variables(&TpchConfig::default(), "1 day'; DROP", false);
        assert_eq!(vars.get("OLDER_THAN"), Some("1 day''; DROP"));
        assert_eq!(vars.get("DRY_RUN"), Some("false"));
    }

    #[test]
    fn test_bundled_scripts_use_known_placeholders() {
        let scripts_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scripts");
        let known = [
            "LAKE",
            "CATALOG_PATH",
            "DATA_PATH",
            "TPCH_DIR",
            "TABLE",
            "TABLE_NAME",
            "PARTITION_PREDICATE",
            "OLDER_THAN",
            "DRY_RUN",
            "FROM_VERSION",
            "TO_VERSION",
        ];
        for entry in fs::read_dir(&scripts_dir).unwrap() {
            let path = entry.unwrap().path();
            let sql = fs::read_to_string(&path).unwrap();
            let mut rest = sql.as_str();
            while let Some(start) = rest.find("__") {
                let after = &rest[start + 2..];
                let Some(end) = after.find("__") else { break };
                let key = &after[..end];
                if !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                    assert!(
                        known.contains(&key),
                        "{} uses unknown placeholder __{}__",
                        path.display(),
                        key
                    );
                    rest = &after[end + 2..];
                } else {
                    rest = after;
                }
            }
        }
    }
}
