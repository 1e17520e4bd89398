use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use heapdb::common::DEFAULT_BLOCK_SIZE;
use heapdb::storage::heap::tuple::unmarshal;
use heapdb::tuple::schema::{Schema, TypeId};
use heapdb::tuple::value::Value;
use heapdb::tuple::{row, Row};
use heapdb::{BlockFile, BlockStore, FileManager, Table};

#[derive(Parser)]
struct Config {
    #[arg(long, help = "Directory where data is stored")]
    data: PathBuf,

    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, help = "Size of a block in bytes")]
    block_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exercises create, insert, select, project, update, delete and drop on scratch tables
    Check,
    /// Prints how the records of a block file are spread over its blocks
    Inspect {
        name: String,

        #[arg(long, help = "Columns of the stored rows, e.g. a:INT,b:TEXT; prints every row when given")]
        schema: Option<Schema>,
    },
}

fn check_row(a: i32, b: &str) -> Row {
    row([("a", Value::Integer(a)), ("b", Value::from(b))])
}

fn check(store: &dyn BlockStore) -> Result<()> {
    let schema = Schema::from_parts(&["a", "b"], &[TypeId::Integer, TypeId::Text])?;

    let mut scratch = Table::new("_check_create_drop", schema.clone(), store);
    scratch.drop()?;
    scratch.create()?;
    println!("create ok");
    scratch.drop()?;
    println!("drop ok");

    let mut table = Table::new("_check_data", schema, store);
    table.drop()?;
    table.create_if_not_exists()?;
    println!(
        "create_if_not_exists ok {} ({})",
        table.name(),
        table.column_names().collect::<Vec<_>>().join(", ")
    );

    let hello = check_row(12, "Hello!");
    let handle = table.insert(&hello)?;
    println!("insert ok");

    let handles = table.select()?;
    ensure!(handles == vec![handle], "select returned {:?}", handles);
    println!("select ok {}", handles.len());

    let projected = table.project(handle)?;
    ensure!(projected == hello, "project returned {:?}", projected);
    println!("project ok");

    let other = table.insert(&check_row(-4, "Goodbye!"))?;
    table.update(handle, &row([("b", Value::from("Hello, world!"))]))?;
    ensure!(
        table.project(handle)? == check_row(12, "Hello, world!")
            && table.project(other)? == check_row(-4, "Goodbye!"),
        "update changed the wrong row"
    );
    println!("update ok");

    table.del(handle)?;
    let handles = table.select_where(&row([("a", Value::Integer(12))]))?;
    ensure!(handles.is_empty(), "deleted row is still selected");
    ensure!(table.select()? == vec![other], "delete removed the wrong row");
    println!("delete ok");

    table.drop()?;
    println!("drop ok");
    Ok(())
}

fn print_row(schema: &Schema, row: &Row) {
    let columns = schema
        .column_names()
        .map(|column| format!("{}={}", column, row[column]))
        .collect::<Vec<_>>();
    println!("  {}", columns.join(", "));
}

fn inspect(store: &dyn BlockStore, name: &str, schema: Option<&Schema>) -> Result<()> {
    let mut file = BlockFile::new(name, store);
    file.open()
        .with_context(|| format!("Could not open block file {}", name))?;

    for block_id in file.block_ids() {
        let page = file.get(block_id)?;
        println!(
            "block {}: {} live records, {} record ids, {} bytes free",
            block_id,
            page.ids().len(),
            page.record_count(),
            page.available()
        );
        if let Some(schema) = schema {
            for record_id in page.ids() {
                let data = page.get(record_id).unwrap_or_default();
                let row = unmarshal(schema, data)
                    .with_context(|| format!("Could not read record {} of block {}", record_id, block_id))?;
                print_row(schema, &row);
            }
        }
    }

    file.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::parse();

    let file_manager = FileManager::with_block_size(&config.data, config.block_size)
        .with_context(|| format!("Failed to open data directory {}", config.data.display()))?;

    match config.command {
        Command::Check => check(&file_manager),
        Command::Inspect { name, schema } => inspect(&file_manager, &name, schema.as_ref()),
    }
}
