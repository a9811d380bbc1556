//! Warehouse loader — append-only writes into the raw layer.
//!
//! The raw layer lives in a SQLite warehouse. Schema-qualified destinations
//! collapse to `{schema}_{destination}` table names (`raw_stock_prices_daily`
//! and friends). Loads are append-only: re-running a window duplicates rows,
//! and deduplication belongs to downstream layers, not this one.
//!
//! The connection is a scoped resource: it closes when the loader drops, on
//! every exit path.

use crate::extract::{BarRow, CompanyRow};
use crate::profile::WarehouseParams;
use crate::run::RunRecord;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::info;

/// Destination for daily stock price rows.
pub const STOCK_PRICES_DAILY: &str = "stock_prices_daily";
/// Destination for company info rows.
pub const COMPANY_INFO: &str = "company_info";
/// Destination for daily benchmark series rows.
pub const BENCHMARK_SERIES_DAILY: &str = "benchmark_series_daily";
/// State-store table holding terminal run records.
pub const INGESTION_RUNS: &str = "ingestion_runs";

/// Errors from warehouse operations. All of them surface to the orchestrator,
/// which folds them into a failed run record.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("warehouse connection failed ({path}): {source}")]
    Connect {
        path: String,
        source: rusqlite::Error,
    },

    #[error("warehouse write failed: {0}")]
    Write(rusqlite::Error),

    #[error("warehouse query failed: {0}")]
    Query(rusqlite::Error),
}

/// Result of one raw-layer load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadResult {
    pub records_loaded: u64,
}

/// Generic tabular result from [`RawLoader::execute_query`], for diagnostics
/// and smoke tests. Values are stringified; NULLs stay `None`.
#[derive(Debug, Clone)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// A row type that can be appended to a raw-layer destination.
///
/// Implementations supply the destination DDL and the insert binding, so the
/// loader stays generic over dataset shapes. Prices and benchmarks share
/// [`BarRow`] against different destinations.
pub trait RawTable {
    /// `CREATE TABLE IF NOT EXISTS` statement for a qualified table name.
    fn create_sql(table: &str) -> String;

    /// Parameterized `INSERT` statement for a qualified table name.
    fn insert_sql(table: &str) -> String;

    /// Bind this row and execute the prepared insert.
    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<usize>;
}

impl RawTable for BarRow {
    fn create_sql(table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                symbol      TEXT NOT NULL,
                date        TEXT NOT NULL,
                open        REAL,
                high        REAL,
                low         REAL,
                close       REAL NOT NULL,
                adj_close   REAL,
                volume      INTEGER NOT NULL,
                ingested_at TEXT NOT NULL
            )"
        )
    }

    fn insert_sql(table: &str) -> String {
        format!(
            "INSERT INTO {table}
             (symbol, date, open, high, low, close, adj_close, volume, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        )
    }

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.symbol,
            self.date.to_string(),
            self.open,
            self.high,
            self.low,
            self.close,
            self.adj_close,
            self.volume as i64,
            self.ingested_at.to_string(),
        ])
    }
}

impl RawTable for CompanyRow {
    fn create_sql(table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                symbol                  TEXT NOT NULL,
                company_name            TEXT,
                sector                  TEXT,
                industry                TEXT,
                market_cap              INTEGER,
                enterprise_value        INTEGER,
                pe_ratio                REAL,
                forward_pe              REAL,
                peg_ratio               REAL,
                price_to_book           REAL,
                dividend_yield          REAL,
                beta                    REAL,
                fifty_two_week_high     REAL,
                fifty_two_week_low      REAL,
                fifty_day_average       REAL,
                two_hundred_day_average REAL,
                shares_outstanding      INTEGER,
                float_shares            INTEGER,
                employees               INTEGER,
                country                 TEXT,
                city                    TEXT,
                website                 TEXT,
                business_summary        TEXT,
                error                   TEXT,
                ingested_at             TEXT NOT NULL
            )"
        )
    }

    fn insert_sql(table: &str) -> String {
        format!(
            "INSERT INTO {table}
             (symbol, company_name, sector, industry, market_cap, enterprise_value, pe_ratio,
              forward_pe, peg_ratio, price_to_book, dividend_yield, beta, fifty_two_week_high,
              fifty_two_week_low, fifty_day_average, two_hundred_day_average,
              shares_outstanding, float_shares, employees, country, city, website,
              business_summary, error, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)"
        )
    }

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.symbol,
            self.company_name,
            self.sector,
            self.industry,
            self.market_cap.map(|v| v as i64),
            self.enterprise_value,
            self.pe_ratio,
            self.forward_pe,
            self.peg_ratio,
            self.price_to_book,
            self.dividend_yield,
            self.beta,
            self.fifty_two_week_high,
            self.fifty_two_week_low,
            self.fifty_day_average,
            self.two_hundred_day_average,
            self.shares_outstanding.map(|v| v as i64),
            self.float_shares.map(|v| v as i64),
            self.employees.map(|v| v as i64),
            self.country,
            self.city,
            self.website,
            self.business_summary,
            self.error,
            self.ingested_at.to_string(),
        ])
    }
}

/// Append-only loader for the warehouse raw layer.
pub struct RawLoader {
    conn: Connection,
    schema: String,
}

impl RawLoader {
    /// Open a connection from resolved profile parameters.
    pub fn connect(params: &WarehouseParams) -> Result<Self, LoadError> {
        let conn = Connection::open(&params.database).map_err(|source| LoadError::Connect {
            path: params.database.display().to_string(),
            source,
        })?;
        info!(database = %params.database.display(), schema = params.schema.as_str(), "warehouse connected");
        Ok(Self {
            conn,
            schema: params.schema.clone(),
        })
    }

    /// In-memory warehouse, for tests and dry runs.
    pub fn open_in_memory(schema: &str) -> Result<Self, LoadError> {
        let conn = Connection::open_in_memory().map_err(|source| LoadError::Connect {
            path: ":memory:".to_string(),
            source,
        })?;
        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }

    /// Qualified table name for a raw-layer destination.
    pub fn qualify(&self, destination: &str) -> String {
        format!("{}_{}", self.schema, destination)
    }

    /// Append all rows to `destination`, creating the table if absent.
    ///
    /// One transaction per destination; there is no transactionality across
    /// destinations. Returns the number of rows written.
    pub fn load_to_raw<T: RawTable>(
        &mut self,
        rows: &[T],
        destination: &str,
        run_label: &str,
    ) -> Result<LoadResult, LoadError> {
        let table = self.qualify(destination);

        self.conn
            .execute(&T::create_sql(&table), [])
            .map_err(LoadError::Write)?;

        let tx = self.conn.transaction().map_err(LoadError::Write)?;
        {
            let mut stmt = tx.prepare(&T::insert_sql(&table)).map_err(LoadError::Write)?;
            for row in rows {
                row.insert(&mut stmt).map_err(LoadError::Write)?;
            }
        }
        tx.commit().map_err(LoadError::Write)?;

        let records_loaded = rows.len() as u64;
        info!(table = table.as_str(), run_label, records_loaded, "raw load committed");
        Ok(LoadResult { records_loaded })
    }

    /// Persist a terminal run record to the state store.
    pub fn record_run(&self, record: &RunRecord) -> Result<(), LoadError> {
        let table = self.qualify(INGESTION_RUNS);
        self.conn
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        run_id         TEXT PRIMARY KEY,
                        dataset_name   TEXT NOT NULL,
                        run_timestamp  TEXT NOT NULL,
                        status         TEXT NOT NULL,
                        records_loaded INTEGER NOT NULL,
                        error_message  TEXT
                    )"
                ),
                [],
            )
            .map_err(LoadError::Write)?;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO {table}
                     (run_id, dataset_name, run_timestamp, status, records_loaded, error_message)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                ),
                params![
                    record.run_id,
                    record.dataset_name,
                    record.run_timestamp.to_string(),
                    record.status.as_str(),
                    record.records_loaded as i64,
                    record.error_message,
                ],
            )
            .map_err(LoadError::Write)?;

        Ok(())
    }

    /// Generic diagnostic passthrough: run one SQL statement and return the
    /// result as a stringified table. Not part of the ingestion contract.
    pub fn execute_query(&self, sql: &str) -> Result<QueryTable, LoadError> {
        let mut stmt = self.conn.prepare(sql).map_err(LoadError::Query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = Vec::new();
        let mut result = stmt.query([]).map_err(LoadError::Query)?;
        while let Some(row) = result.next().map_err(LoadError::Query)? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = match row.get_ref(i).map_err(LoadError::Query)? {
                    ValueRef::Null => None,
                    ValueRef::Integer(v) => Some(v.to_string()),
                    ValueRef::Real(v) => Some(v.to_string()),
                    ValueRef::Text(v) => Some(String::from_utf8_lossy(v).into_owned()),
                    ValueRef::Blob(v) => Some(format!("<{} bytes>", v.len())),
                };
                values.push(value);
            }
            rows.push(values);
        }

        Ok(QueryTable { columns, rows })
    }

    /// Row count of a raw-layer destination, 0 when the table does not exist.
    pub fn row_count(&self, destination: &str) -> Result<u64, LoadError> {
        let table = self.qualify(destination);
        match self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table}"),
            [],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(n) => Ok(n as u64),
            Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("no such table") => {
                Ok(0)
            }
            Err(e) => Err(LoadError::Query(e)),
        }
    }
}
