use std::path::Path;

use tally_core::db::{RecordRepository, SqliteRecordRepository};
use tally_core::models::Producto;
use tally_core::SyncEntity;

use crate::cli::ProductoCommands;
use crate::commands::common::{format_producto_lines, normalize_codigo, open_database, resolve_producto};
use crate::error::CliError;

pub fn run_productos(command: ProductoCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        ProductoCommands::Add {
            codigo,
            descripcion,
            existencias,
            inv_minimo,
            precio_costo,
            precio_venta,
        } => {
            let mut producto = Producto::new(normalize_codigo(&codigo)?, descripcion.join(" "));
            producto.existencias = existencias;
            producto.inv_minimo = inv_minimo;
            producto.precio_costo = precio_costo;
            producto.precio_venta = precio_venta;
            let created = run_add(producto, db_path)?;
            println!("{}", created.id());
            Ok(())
        }
        ProductoCommands::List { low_stock, json } => run_list(low_stock, json, db_path),
        ProductoCommands::SetStock {
            producto,
            existencias,
        } => {
            let updated = run_set_stock(&producto, existencias, db_path)?;
            println!("{} existencias={}", updated.codigo, updated.existencias);
            Ok(())
        }
        ProductoCommands::Delete { producto } => {
            let deleted = run_delete(&producto, db_path)?;
            println!("{}", deleted.id());
            Ok(())
        }
    }
}

pub fn run_add(producto: Producto, db_path: &Path) -> Result<Producto, CliError> {
    let db = open_database(db_path)?;
    let repo = SqliteRecordRepository::new(db.connection());

    let taken = repo
        .list::<Producto>()?
        .iter()
        .any(|existing| existing.codigo == producto.codigo);
    if taken {
        return Err(CliError::DuplicateCodigo(producto.codigo));
    }

    Ok(repo.create(producto)?)
}

pub fn list_productos(low_stock: bool, db_path: &Path) -> Result<Vec<Producto>, CliError> {
    let db = open_database(db_path)?;
    let mut productos = SqliteRecordRepository::new(db.connection()).list::<Producto>()?;
    if low_stock {
        productos.retain(Producto::is_below_minimum);
    }
    productos.sort_by(|left, right| left.codigo.cmp(&right.codigo));
    Ok(productos)
}

fn run_list(low_stock: bool, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let productos = list_productos(low_stock, db_path)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&productos)?);
        return Ok(());
    }

    if productos.is_empty() {
        println!("No products.");
        return Ok(());
    }

    for line in format_producto_lines(&productos) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_set_stock(query: &str, existencias: i64, db_path: &Path) -> Result<Producto, CliError> {
    let db = open_database(db_path)?;
    let mut producto = resolve_producto(query, &db)?;
    producto.existencias = existencias;
    Ok(SqliteRecordRepository::new(db.connection()).update(producto)?)
}

pub fn run_delete(query: &str, db_path: &Path) -> Result<Producto, CliError> {
    let db = open_database(db_path)?;
    let producto = resolve_producto(query, &db)?;
    Ok(SqliteRecordRepository::new(db.connection()).delete::<Producto>(producto.id())?)
}
