// Esquema Diesel de la tabla de clientes (igual en SQLite y Postgres).
diesel::table! {
    customers (id) {
        id -> BigInt,
        name -> Text,
    }
}
