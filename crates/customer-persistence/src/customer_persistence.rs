use crate::schema::customers;
use crate::schema::customers::dsl;
use customer_domain::{Customer, CustomerRepository, DomainError, IdRange};
use diesel::dsl::{max, min};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use std::sync::Arc;

#[cfg(not(feature = "pg"))]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");
#[cfg(feature = "pg")]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

#[cfg(feature = "pg")]
type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;

// SQLite no admite más de ~999 parámetros por sentencia en builds antiguos.
const INSERT_ROWS_PER_STATEMENT: usize = 500;
#[cfg(not(feature = "pg"))]
const SQLITE_BUSY_TIMEOUT_MS: u32 = 5000;

/// Aplica los PRAGMA de concurrencia a cada conexión que entrega el pool:
/// con WAL los lectores no bloquean al escritor y `busy_timeout` hace que un
/// escritor espere al otro en lugar de fallar con `database is locked`.
#[cfg(not(feature = "pg"))]
#[derive(Debug)]
struct SqlitePragmas {
  busy_timeout_ms: u32,
}

#[cfg(not(feature = "pg"))]
impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    use diesel::connection::SimpleConnection;
    conn.batch_execute(&format!("PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
                                self.busy_timeout_ms))
        .map_err(diesel::r2d2::Error::QueryError)
  }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = customers)]
struct CustomerRow {
  pub id: i64,
  pub name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = customers)]
struct NewCustomerRow<'a> {
  pub name: &'a str,
}

impl From<CustomerRow> for Customer {
  fn from(r: CustomerRow) -> Self {
    Customer::from_parts(r.id, r.name)
  }
}

fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(|e| DomainError::ExternalError(format!("db: {}", e)))
}

/// Repo Diesel que implementa `CustomerRepository`. Clonarlo comparte el pool.
#[derive(Clone)]
pub struct DieselCustomerRepository {
  pool: Arc<DbPool>,
}

impl DieselCustomerRepository {
  /// Crea el pool (`pool_size` conexiones como máximo) y aplica las
  /// migraciones pendientes.
  pub fn connect(database_url: &str, pool_size: u32) -> Result<Self, DomainError> {
    if pool_size == 0 {
      return Err(DomainError::ValidationError("pool_size debe ser mayor que 0".to_string()));
    }
    let manager = ConnectionManager::<DbConn>::new(database_url);
    let builder = Pool::<ConnectionManager<DbConn>>::builder().max_size(pool_size);
    #[cfg(not(feature = "pg"))]
    let builder = builder.connection_customizer(Box::new(SqlitePragmas { busy_timeout_ms: SQLITE_BUSY_TIMEOUT_MS }));
    let pool = builder.build(manager)
                      .map_err(|e| DomainError::ExternalError(format!("no se pudo crear el pool de conexiones: {}", e)))?;
    let repo = DieselCustomerRepository { pool: Arc::new(pool) };
    {
      let mut conn = repo.conn()?;
      let applied = conn.run_pending_migrations(MIGRATIONS)
                        .map_err(|e| DomainError::ExternalError(format!("migraciones: {}", e)))?;
      debug!("migraciones aplicadas: {}", applied.len());
    }
    info!("repositorio de clientes listo (pool={})", pool_size);
    Ok(repo)
  }

  fn conn_raw(&self) -> std::result::Result<PooledConnection<ConnectionManager<DbConn>>, r2d2::Error> {
    self.pool.get()
  }

  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.conn_raw().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))
  }
}

impl CustomerRepository for DieselCustomerRepository {
  fn count(&self) -> Result<u64, DomainError> {
    let mut conn = self.conn()?;
    let n: i64 = map_db_err(dsl::customers.count().get_result(&mut conn))?;
    Ok(n as u64)
  }

  fn count_with_name_prefix(&self, prefix: &str) -> Result<u64, DomainError> {
    let mut conn = self.conn()?;
    let pattern = format!("{}%", prefix);
    let n: i64 = map_db_err(dsl::customers.filter(dsl::name.like(pattern)).count().get_result(&mut conn))?;
    Ok(n as u64)
  }

  fn id_bounds(&self) -> Result<Option<(i64, i64)>, DomainError> {
    let mut conn = self.conn()?;
    let (lo, hi): (Option<i64>, Option<i64>) =
      map_db_err(dsl::customers.select((min(dsl::id), max(dsl::id))).first(&mut conn))?;
    Ok(lo.zip(hi))
  }

  fn insert_names(&self, names: &[String]) -> Result<usize, DomainError> {
    if names.is_empty() {
      return Ok(0);
    }
    let mut conn = self.conn()?;
    let rows: Vec<NewCustomerRow> = names.iter().map(|n| NewCustomerRow { name: n.as_str() }).collect();
    map_db_err(conn.transaction::<_, DieselError, _>(|conn| {
                     let mut inserted = 0;
                     for batch in rows.chunks(INSERT_ROWS_PER_STATEMENT) {
                       inserted += diesel::insert_into(dsl::customers).values(batch).execute(conn)?;
                     }
                     Ok(inserted)
                   }))
  }

  fn fetch_page(&self, range: &IdRange, after: Option<i64>, limit: usize) -> Result<Vec<Customer>, DomainError> {
    let lower = match after {
      Some(a) if a >= range.start => a.saturating_add(1),
      _ => range.start,
    };
    if lower >= range.end || limit == 0 {
      return Ok(Vec::new());
    }
    let mut conn = self.conn()?;
    let rows = map_db_err(dsl::customers.filter(dsl::id.ge(lower))
                                        .filter(dsl::id.lt(range.end))
                                        .order(dsl::id.asc())
                                        .limit(limit as i64)
                                        .load::<CustomerRow>(&mut conn))?;
    Ok(rows.into_iter().map(Customer::from).collect())
  }

  fn save_all(&self, items: &[Customer]) -> Result<(), DomainError> {
    if items.is_empty() {
      return Ok(());
    }
    let mut conn = self.conn()?;
    map_db_err(conn.transaction::<_, DieselError, _>(|conn| {
                     for c in items {
                       let row = CustomerRow { id: c.id(), name: c.name().to_string() };
                       diesel::insert_into(dsl::customers).values(&row)
                                                          .on_conflict(dsl::id)
                                                          .do_update()
                                                          .set(dsl::name.eq(&row.name))
                                                          .execute(conn)?;
                     }
                     Ok(())
                   }))?;
    debug!("guardados {} clientes", items.len());
    Ok(())
  }

  fn get(&self, id: i64) -> Result<Option<Customer>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(dsl::customers.find(id).first::<CustomerRow>(&mut conn).optional())?;
    Ok(row.map(Customer::from))
  }
}
